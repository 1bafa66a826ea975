//! The type checker (spec.md §4.2).
//!
//! Walks every class's fields and method bodies against the resolved
//! [`ClassGraph`], threading a [`Scope`] of local bindings (formals and
//! `let`-bound names) through each expression. Every expression rule below
//! corresponds to one row of spec.md §4.2's typing table; errors are
//! accumulated on the shared [`Handler`] rather than aborting, so one
//! mistyped method doesn't hide errors in the next one.

use crate::class_graph::ClassGraph;
use crate::scope::Scope;
use crate::typed_ast::{
    AssignTarget, TypedClass, TypedExpr, TypedExprKind, TypedField, TypedMethod, TypedProgram,
};
use crate::types::{is_subtype, join, Type};
use vsopc_ast::{BinOp, Expr, ExprKind, Program, UnOp};
use vsopc_util::{Handler, Span, Symbol};

struct Checker<'a> {
    graph: &'a ClassGraph,
    handler: &'a Handler,
    current_class: Symbol,
    scope: Scope,
}

/// Type-check every class in `program` against `graph`, which must already
/// be free of structural errors (callers check `handler.has_errors()` after
/// [`crate::class_graph::resolve`] before calling this).
pub fn check(program: &Program, graph: &ClassGraph, handler: &Handler) -> TypedProgram {
    let object_sym = Symbol::intern("Object");
    let mut classes = Vec::new();
    for class in &program.classes {
        if !graph.contains(class.name) {
            // Already reported during resolution (e.g. redefinition, cycle).
            continue;
        }
        let mut checker = Checker {
            graph,
            handler,
            current_class: class.name,
            scope: Scope::new(),
        };

        let mut fields = Vec::new();
        for field in &class.fields {
            let declared = Type::from(field.ty);
            let init = field.init.as_ref().map(|e| {
                let typed = checker.check_expr(e);
                checker.expect_conforms(&typed, declared, field.span);
                typed
            });
            fields.push(TypedField {
                name: field.name,
                ty: declared,
                init,
            });
        }

        let mut methods = Vec::new();
        for method in &class.methods {
            let mut formals = Vec::new();
            for formal in &method.formals {
                let ty = Type::from(formal.ty);
                checker.scope.insert(formal.name, ty);
                formals.push((formal.name, ty));
            }
            let ret_ty = Type::from(method.ret_ty);
            let body = checker.check_expr(&method.body);
            checker.expect_conforms(&body, ret_ty, method.span);
            for (name, _) in &formals {
                checker.scope.remove(*name);
            }
            methods.push(TypedMethod {
                name: method.name,
                formals,
                ret_ty,
                body,
            });
        }

        classes.push(TypedClass {
            name: class.name,
            parent: class.parent.unwrap_or(object_sym),
            fields,
            methods,
        });
    }
    TypedProgram { classes }
}

impl<'a> Checker<'a> {
    fn expect_conforms(&self, expr: &TypedExpr, expected: Type, span: Span) {
        if !is_subtype(self.graph, expr.ty, expected) {
            self.handler.error(
                format!("expected type {expected} but found type {}", expr.ty),
                span,
            );
        }
    }

    fn check_expr(&mut self, expr: &Expr) -> TypedExpr {
        match &expr.kind {
            ExprKind::IntLiteral(v) => TypedExpr {
                kind: TypedExprKind::IntLiteral(*v),
                ty: Type::Int32,
            },
            ExprKind::StringLiteral(s) => TypedExpr {
                kind: TypedExprKind::StringLiteral(*s),
                ty: Type::String,
            },
            ExprKind::BoolLiteral(b) => TypedExpr {
                kind: TypedExprKind::BoolLiteral(*b),
                ty: Type::Bool,
            },
            ExprKind::UnitLiteral => TypedExpr {
                kind: TypedExprKind::UnitLiteral,
                ty: Type::Unit,
            },
            ExprKind::SelfExpr => TypedExpr {
                kind: TypedExprKind::SelfExpr,
                ty: Type::Class(self.current_class),
            },
            ExprKind::Ident(name) => self.check_ident(*name, expr.span),
            ExprKind::Assign(name, value) => self.check_assign(*name, value, expr.span),
            ExprKind::UnOp(op, operand) => self.check_unop(*op, operand, expr.span),
            ExprKind::BinOp(op, lhs, rhs) => self.check_binop(*op, lhs, rhs, expr.span),
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => self.check_if(cond, then_branch, else_branch.as_deref(), expr.span),
            ExprKind::While { cond, body } => self.check_while(cond, body, expr.span),
            ExprKind::Let {
                name,
                ty,
                init,
                body,
            } => self.check_let(*name, *ty, init.as_deref(), body, expr.span),
            ExprKind::New(class) => self.check_new(*class, expr.span),
            ExprKind::Call { method, args } => self.check_call(*method, args, expr.span),
            ExprKind::MethodCall {
                receiver,
                method,
                args,
            } => self.check_method_call(receiver, *method, args, expr.span),
            ExprKind::Block(exprs) => self.check_block(exprs),
        }
    }

    fn check_ident(&mut self, name: Symbol, span: Span) -> TypedExpr {
        if let Some(ty) = self.scope.look_up(name) {
            return TypedExpr {
                kind: TypedExprKind::Local(name),
                ty,
            };
        }
        if let Some(field) = self.graph.lookup_field(self.current_class, name) {
            return TypedExpr {
                kind: TypedExprKind::Field {
                    class: self.current_class,
                    name,
                },
                ty: Type::from(field.ty),
            };
        }
        self.handler
            .error(format!("undefined identifier {name}"), span);
        TypedExpr {
            kind: TypedExprKind::UnitLiteral,
            ty: Type::Unit,
        }
    }

    fn check_assign(&mut self, name: Symbol, value: &Expr, span: Span) -> TypedExpr {
        let value_typed = self.check_expr(value);
        if let Some(declared) = self.scope.look_up(name) {
            self.expect_conforms(&value_typed, declared, span);
            return TypedExpr {
                ty: value_typed.ty,
                kind: TypedExprKind::Assign {
                    target: AssignTarget::Local(name),
                    value: Box::new(value_typed),
                },
            };
        }
        if let Some(field) = self.graph.lookup_field(self.current_class, name) {
            self.expect_conforms(&value_typed, Type::from(field.ty), span);
            return TypedExpr {
                ty: value_typed.ty,
                kind: TypedExprKind::Assign {
                    target: AssignTarget::Field {
                        class: self.current_class,
                        name,
                    },
                    value: Box::new(value_typed),
                },
            };
        }
        self.handler
            .error(format!("undefined identifier {name}"), span);
        value_typed
    }

    fn check_unop(&mut self, op: UnOp, operand: &Expr, span: Span) -> TypedExpr {
        let typed = self.check_expr(operand);
        let ty = match op {
            UnOp::Neg => {
                self.expect_conforms(&typed, Type::Int32, span);
                Type::Int32
            }
            UnOp::Not => {
                self.expect_conforms(&typed, Type::Bool, span);
                Type::Bool
            }
            UnOp::IsNull => {
                if !typed.ty.is_class() {
                    self.handler.error(
                        format!("expected type Object but found type {}", typed.ty),
                        span,
                    );
                }
                Type::Bool
            }
        };
        TypedExpr {
            kind: TypedExprKind::UnOp(op, Box::new(typed)),
            ty,
        }
    }

    fn check_binop(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr, span: Span) -> TypedExpr {
        let lhs_typed = self.check_expr(lhs);
        let rhs_typed = self.check_expr(rhs);
        let ty = match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Pow => {
                self.expect_conforms(&lhs_typed, Type::Int32, span);
                self.expect_conforms(&rhs_typed, Type::Int32, span);
                Type::Int32
            }
            BinOp::Lower | BinOp::LowerEqual => {
                self.expect_conforms(&lhs_typed, Type::Int32, span);
                self.expect_conforms(&rhs_typed, Type::Int32, span);
                Type::Bool
            }
            BinOp::And => {
                self.expect_conforms(&lhs_typed, Type::Bool, span);
                self.expect_conforms(&rhs_typed, Type::Bool, span);
                Type::Bool
            }
            BinOp::Eq => {
                let comparable = lhs_typed.ty == rhs_typed.ty
                    || is_subtype(self.graph, lhs_typed.ty, rhs_typed.ty)
                    || is_subtype(self.graph, rhs_typed.ty, lhs_typed.ty);
                if !comparable {
                    self.handler.error(
                        format!(
                            "cannot compare incompatible types {} and {}",
                            lhs_typed.ty, rhs_typed.ty
                        ),
                        span,
                    );
                }
                Type::Bool
            }
        };
        TypedExpr {
            kind: TypedExprKind::BinOp(op, Box::new(lhs_typed), Box::new(rhs_typed)),
            ty,
        }
    }

    fn check_if(
        &mut self,
        cond: &Expr,
        then_branch: &Expr,
        else_branch: Option<&Expr>,
        span: Span,
    ) -> TypedExpr {
        let cond_typed = self.check_expr(cond);
        self.expect_conforms(&cond_typed, Type::Bool, span);
        let then_typed = self.check_expr(then_branch);

        match else_branch {
            Some(else_expr) => {
                let else_typed = self.check_expr(else_expr);
                let ty = join(self.graph, then_typed.ty, else_typed.ty).unwrap_or_else(|| {
                    self.handler.error(
                        format!(
                            "if branches have incompatible types {} and {}",
                            then_typed.ty, else_typed.ty
                        ),
                        span,
                    );
                    Type::Unit
                });
                TypedExpr {
                    kind: TypedExprKind::If {
                        cond: Box::new(cond_typed),
                        then_branch: Box::new(then_typed),
                        else_branch: Box::new(else_typed),
                    },
                    ty,
                }
            }
            None => {
                self.expect_conforms(&then_typed, Type::Unit, span);
                TypedExpr {
                    kind: TypedExprKind::If {
                        cond: Box::new(cond_typed),
                        then_branch: Box::new(then_typed),
                        else_branch: Box::new(TypedExpr {
                            kind: TypedExprKind::UnitLiteral,
                            ty: Type::Unit,
                        }),
                    },
                    ty: Type::Unit,
                }
            }
        }
    }

    fn check_while(&mut self, cond: &Expr, body: &Expr, span: Span) -> TypedExpr {
        let cond_typed = self.check_expr(cond);
        self.expect_conforms(&cond_typed, Type::Bool, span);
        let body_typed = self.check_expr(body);
        self.expect_conforms(&body_typed, Type::Unit, span);
        TypedExpr {
            kind: TypedExprKind::While {
                cond: Box::new(cond_typed),
                body: Box::new(body_typed),
            },
            ty: Type::Unit,
        }
    }

    fn check_let(
        &mut self,
        name: Symbol,
        ty: vsopc_ast::Type,
        init: Option<&Expr>,
        body: &Expr,
        span: Span,
    ) -> TypedExpr {
        let declared = Type::from(ty);
        let init_typed = match init {
            Some(e) => {
                let typed = self.check_expr(e);
                self.expect_conforms(&typed, declared, span);
                typed
            }
            None => TypedExpr {
                kind: TypedExprKind::UnitLiteral,
                ty: declared,
            },
        };
        self.scope.insert(name, declared);
        let body_typed = self.check_expr(body);
        self.scope.remove(name);
        TypedExpr {
            ty: body_typed.ty,
            kind: TypedExprKind::Let {
                name,
                ty: declared,
                init: Box::new(init_typed),
                body: Box::new(body_typed),
            },
        }
    }

    fn check_new(&mut self, class: Symbol, span: Span) -> TypedExpr {
        if !self.graph.contains(class) {
            self.handler
                .error(format!("undefined class {class}"), span);
        }
        TypedExpr {
            kind: TypedExprKind::New(class),
            ty: Type::Class(class),
        }
    }

    fn check_call(&mut self, method: Symbol, args: &[Expr], span: Span) -> TypedExpr {
        let Some(info) = self.graph.lookup_method(self.current_class, method) else {
            self.handler
                .error(format!("undefined method {method}"), span);
            return TypedExpr {
                kind: TypedExprKind::UnitLiteral,
                ty: Type::Unit,
            };
        };
        let ret_ty = Type::from(info.ret_ty);
        let formals = info.formals.clone();
        let args_typed = self.check_args(method, &formals, args, span);
        TypedExpr {
            kind: TypedExprKind::Call {
                class: self.current_class,
                method,
                args: args_typed,
            },
            ty: ret_ty,
        }
    }

    fn check_method_call(
        &mut self,
        receiver: &Expr,
        method: Symbol,
        args: &[Expr],
        span: Span,
    ) -> TypedExpr {
        let receiver_typed = self.check_expr(receiver);
        let Type::Class(receiver_class) = receiver_typed.ty else {
            self.handler.error(
                format!("cannot call method {method} on non-object type {}", receiver_typed.ty),
                span,
            );
            return TypedExpr {
                kind: TypedExprKind::UnitLiteral,
                ty: Type::Unit,
            };
        };
        let Some(info) = self.graph.lookup_method(receiver_class, method) else {
            self.handler
                .error(format!("undefined method {method} on class {receiver_class}"), span);
            return TypedExpr {
                kind: TypedExprKind::UnitLiteral,
                ty: Type::Unit,
            };
        };
        let ret_ty = Type::from(info.ret_ty);
        let formals = info.formals.clone();
        let args_typed = self.check_args(method, &formals, args, span);
        TypedExpr {
            kind: TypedExprKind::MethodCall {
                receiver: Box::new(receiver_typed),
                receiver_class,
                method,
                args: args_typed,
            },
            ty: ret_ty,
        }
    }

    fn check_args(
        &mut self,
        method: Symbol,
        formals: &[(Symbol, vsopc_ast::Type)],
        args: &[Expr],
        span: Span,
    ) -> Vec<TypedExpr> {
        if formals.len() != args.len() {
            self.handler.error(
                format!(
                    "method {method} expects {} argument(s) but {} were given",
                    formals.len(),
                    args.len()
                ),
                span,
            );
        }
        let mut out = Vec::new();
        for (i, arg) in args.iter().enumerate() {
            let typed = self.check_expr(arg);
            if let Some((_, expected)) = formals.get(i) {
                self.expect_conforms(&typed, Type::from(*expected), span);
            }
            out.push(typed);
        }
        out
    }

    fn check_block(&mut self, exprs: &[Expr]) -> TypedExpr {
        if exprs.is_empty() {
            return TypedExpr {
                kind: TypedExprKind::Block(Vec::new()),
                ty: Type::Unit,
            };
        }
        let mut typed = Vec::with_capacity(exprs.len());
        for e in exprs {
            typed.push(self.check_expr(e));
        }
        let ty = typed.last().unwrap().ty;
        TypedExpr {
            kind: TypedExprKind::Block(typed),
            ty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_graph::resolve;
    use vsopc_ast::Parser;
    use vsopc_lex::Lexer;

    fn check_source(source: &str) -> usize {
        let handler = Handler::new("test.vsop");
        let tokens = Lexer::new(source, &handler).tokenize();
        let program = Parser::new(tokens, &handler).parse_program();
        let graph = resolve(&program, &handler);
        let _typed = check(&program, &graph, &handler);
        handler.error_count()
    }

    #[test]
    fn well_typed_main_has_no_errors() {
        assert_eq!(check_source("class Main { main(): int32 { 0 } }"), 0);
    }

    #[test]
    fn rejects_returning_wrong_type() {
        assert!(check_source("class Main { main(): int32 { true } }") > 0);
    }

    #[test]
    fn rejects_arithmetic_on_bool() {
        assert!(check_source("class Main { main(): int32 { true + 1 } }") > 0);
    }

    #[test]
    fn accepts_field_access_through_self() {
        let errors = check_source(
            "class Main { \
                 count: int32 <- 0; \
                 main(): int32 { count } \
             }",
        );
        assert_eq!(errors, 0);
    }

    #[test]
    fn if_without_else_must_be_unit() {
        assert!(check_source("class Main { main(): int32 { if true then 1; 0 } }") > 0);
    }

    #[test]
    fn if_branches_join_to_common_ancestor() {
        let errors = check_source(
            "class Animal { } class Dog extends Animal { } class Cat extends Animal { } \
             class Main { \
                 main(): int32 { \
                     let a: Animal <- if true then new Dog else new Cat in 0 \
                 } \
             }",
        );
        assert_eq!(errors, 0);
    }

    #[test]
    fn rejects_calling_undefined_method() {
        assert!(check_source("class Main { main(): int32 { self.nope() } }") > 0);
    }

    #[test]
    fn rejects_wrong_argument_count() {
        let errors = check_source(
            "class Main { \
                 helper(x: int32): int32 { x } \
                 main(): int32 { helper(1, 2) } \
             }",
        );
        assert!(errors > 0);
    }

    #[test]
    fn let_binding_shadows_field_of_same_name() {
        let errors = check_source(
            "class Main { \
                 x: int32 <- 1; \
                 main(): int32 { let x: bool <- true in 0 } \
             }",
        );
        assert_eq!(errors, 0);
    }

    #[test]
    fn isnull_on_primitive_reports_expected_object() {
        assert!(check_source("class Main { main(): int32 { if isnull 1 then 0 else 1 } }") > 0);
    }
}
