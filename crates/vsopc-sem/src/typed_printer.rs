//! The `-c` pretty-printer: renders the typed AST in the same bracketed
//! S-expression family as `vsopc_ast`'s `-p` printer, with every expression
//! node annotated `: T` by its resolved [`Type`] (spec.md §6, "print typed
//! AST").

use crate::typed_ast::{AssignTarget, TypedClass, TypedExpr, TypedExprKind, TypedProgram};
use std::fmt;
use vsopc_ast::{BinOp, UnOp};

impl fmt::Display for TypedProgram {
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

impl fmt::Display for TypedClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Class, {}, {}, [", self.name, self.parent)?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "[Field, {}: {}", field.name, field.ty)?;
            if let Some(init) = &field.init {
                write!(f, ", {init}")?;
            }
            write!(f, "]")?;
        }
        write!(f, "], [")?;
        for (i, method) in self.methods.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "[Method, {}, [", method.name)?;
            for (j, (name, ty)) in method.formals.iter().enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{name}: {ty}")?;
            }
            write!(f, "], {}, {}]", method.ret_ty, method.body)?;
        }
        write!(f, "]]")
    }
}

impl fmt::Display for TypedExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        match &self.kind {
            TypedExprKind::IntLiteral(n) => write!(f, "{n}")?,
            TypedExprKind::StringLiteral(s) => write!(f, "\"{s}\"")?,
            TypedExprKind::BoolLiteral(b) => write!(f, "{b}")?,
            TypedExprKind::UnitLiteral => write!(f, "()")?,
            TypedExprKind::SelfExpr => write!(f, "self")?,
            TypedExprKind::Local(name) => write!(f, "{name}")?,
            TypedExprKind::Field { class, name } => write!(f, "{class}.{name}")?,
            TypedExprKind::Assign { target, value } => match target {
                AssignTarget::Local(name) => write!(f, "{name} <- {value}")?,
                AssignTarget::Field { class, name } => write!(f, "{class}.{name} <- {value}")?,
            },
            TypedExprKind::UnOp(op, rhs) => write!(f, "{} {rhs}", unop_str(*op))?,
            TypedExprKind::BinOp(op, lhs, rhs) => write!(f, "{lhs} {} {rhs}", binop_str(*op))?,
            TypedExprKind::If { cond, then_branch, else_branch } => {
                write!(f, "if {cond} then {then_branch} else {else_branch}")?
            }
            TypedExprKind::While { cond, body } => write!(f, "while {cond} do {body}")?,
            TypedExprKind::Let { name, ty, init, body } => {
                write!(f, "let {name}: {ty} <- {init} in {body}")?
            }
            TypedExprKind::New(class) => write!(f, "new {class}")?,
            TypedExprKind::Call { class, method, args } => {
                write!(f, "{class}.{method}(")?;
                write_args(f, args)?;
                write!(f, ")")?;
            }
            TypedExprKind::MethodCall { receiver, receiver_class, method, args } => {
                write!(f, "{receiver}.{receiver_class}::{method}(")?;
                write_args(f, args)?;
                write!(f, ")")?;
            }
            TypedExprKind::Block(exprs) => {
                write!(f, "{{")?;
                for (i, e) in exprs.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, "}}")?;
            }
        }
        write!(f, ": {})", self.ty)
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[TypedExpr]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

fn unop_str(op: UnOp) -> &'static str {
    match op {
        UnOp::Neg => "-",
        UnOp::Not => "not",
        UnOp::IsNull => "isnull",
    }
}

fn binop_str(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Pow => "^",
        BinOp::Eq => "=",
        BinOp::Lower => "<",
        BinOp::LowerEqual => "<=",
        BinOp::And => "and",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsopc_ast::Parser;
    use vsopc_lex::Lexer;
    use vsopc_util::Handler;

    #[test]
    fn prints_typed_main_with_int_annotations() {
        let handler = Handler::new("test.vsop");
        let tokens = Lexer::new("class Main { main(): int32 { 0 } }", &handler).tokenize();
        let program = Parser::new(tokens, &handler).parse_program();
        let (_, typed) = crate::analyze(&program, &handler).expect("well-formed");
        let rendered = typed.to_string();
        assert!(rendered.contains("int32"));
        assert!(rendered.contains('0'));
    }
}
