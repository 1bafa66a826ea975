//! The `-p` pretty-printer: renders an AST as a bracketed S-expression,
//! the format spec.md §6 mandates for the parse-only mode.
//!
//! Printing a tree and re-parsing the printed text must reproduce a
//! structurally identical tree (spec.md §8 invariant 4); every `Display`
//! impl here therefore only ever calls the `Display` impls of its children,
//! never reaches back into interned strings by index, so the shape is
//! stable across processes.

use crate::ast::{BinOp, Class, Expr, ExprKind, Field, Formal, Method, Program, Type, UnOp};
use std::fmt;

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, class) in self.classes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{class}")?;
        }
        write!(f, "]")
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parent = self.parent.map(|s| s.to_string()).unwrap_or_else(|| "Object".to_string());
        write!(f, "[Class, {}, {}, [", self.name, parent)?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{field}")?;
        }
        write!(f, "], [")?;
        for (i, method) in self.methods.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{method}")?;
        }
        write!(f, "]]")
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.init {
            Some(init) => write!(f, "[Field, {}, {}, {}]", self.name, self.ty, init),
            None => write!(f, "[Field, {}, {}]", self.name, self.ty),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Method, {}, [", self.name)?;
        for (i, formal) in self.formals.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{formal}")?;
        }
        write!(f, "], {}, {}]", self.ret_ty, self.body)
    }
}

impl fmt::Display for Formal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.name, self.ty)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int32 => write!(f, "int32"),
            Type::Bool => write!(f, "bool"),
            Type::StringT => write!(f, "string"),
            Type::Unit => write!(f, "unit"),
            Type::Class(name) => write!(f, "{name}"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::IntLiteral(v) => write!(f, "{v}"),
            ExprKind::StringLiteral(s) => write!(f, "\"{s}\""),
            ExprKind::BoolLiteral(b) => write!(f, "{b}"),
            ExprKind::UnitLiteral => write!(f, "()"),
            ExprKind::SelfExpr => write!(f, "self"),
            ExprKind::Ident(name) => write!(f, "{name}"),
            ExprKind::Assign(name, value) => write!(f, "[Assign, {name}, {value}]"),
            ExprKind::UnOp(op, operand) => write!(f, "[{}, {operand}]", unop_name(*op)),
            ExprKind::BinOp(op, lhs, rhs) => write!(f, "[{}, {lhs}, {rhs}]", binop_name(*op)),
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(e) => write!(f, "[If, {cond}, {then_branch}, {e}]"),
                None => write!(f, "[If, {cond}, {then_branch}]"),
            },
            ExprKind::While { cond, body } => write!(f, "[While, {cond}, {body}]"),
            ExprKind::Let {
                name,
                ty,
                init,
                body,
            } => match init {
                Some(i) => write!(f, "[Let, {name}, {ty}, {i}, {body}]"),
                None => write!(f, "[Let, {name}, {ty}, {body}]"),
            },
            ExprKind::New(class) => write!(f, "[New, {class}]"),
            ExprKind::Call { method, args } => {
                write!(f, "[Call, {method}, {}]", fmt_args(args))
            }
            ExprKind::MethodCall {
                receiver,
                method,
                args,
            } => write!(f, "[MethodCall, {receiver}, {method}, {}]", fmt_args(args)),
            ExprKind::Block(exprs) => write!(f, "[{}]", fmt_args(exprs)),
        }
    }
}

fn fmt_args(args: &[Expr]) -> String {
    args.iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn unop_name(op: UnOp) -> &'static str {
    match op {
        UnOp::Neg => "UnOp-",
        UnOp::Not => "Not",
        UnOp::IsNull => "IsNull",
    }
}

fn binop_name(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "BinOp+",
        BinOp::Sub => "BinOp-",
        BinOp::Mul => "BinOp*",
        BinOp::Div => "BinOp/",
        BinOp::Pow => "BinOp^",
        BinOp::Eq => "BinOp=",
        BinOp::Lower => "BinOp<",
        BinOp::LowerEqual => "BinOp<=",
        BinOp::And => "And",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsopc_util::{Span, Symbol};

    #[test]
    fn prints_int_literal() {
        let e = Expr::new(ExprKind::IntLiteral(42), Span::DUMMY);
        assert_eq!(e.to_string(), "42");
    }

    #[test]
    fn prints_binop_as_prefix_list() {
        let lhs = Expr::new(ExprKind::IntLiteral(1), Span::DUMMY);
        let rhs = Expr::new(ExprKind::IntLiteral(2), Span::DUMMY);
        let e = Expr::new(
            ExprKind::BinOp(BinOp::Add, Box::new(lhs), Box::new(rhs)),
            Span::DUMMY,
        );
        assert_eq!(e.to_string(), "[BinOp+, 1, 2]");
    }

    #[test]
    fn prints_class_with_default_object_parent() {
        let class = Class {
            name: Symbol::intern("Main"),
            parent: None,
            fields: vec![],
            methods: vec![],
            span: Span::DUMMY,
        };
        assert_eq!(class.to_string(), "[Class, Main, Object, [], []]");
    }
}
