//! The typed AST the checker produces and `vsopc-codegen` lowers.
//!
//! Mirrors `vsopc_ast`'s shape but every expression carries its resolved
//! [`Type`]. Field and method references carry the *static* class they were
//! resolved against (always `self`'s class, since VSOP only accesses fields
//! and calls methods implicitly through `self` or through an explicit
//! receiver) rather than a precomputed slot number: because a subclass only
//! ever appends fields and vtable slots to its parent's layout, looking a
//! name up positionally against that static class's layout stays correct
//! even when the object at runtime is a subclass instance. `vsopc-codegen`
//! turns `(class, name)` into an actual GEP/vtable index during lowering.

use crate::types::Type;
use vsopc_ast::{BinOp, UnOp};
use vsopc_util::Symbol;

pub struct TypedProgram {
    pub classes: Vec<TypedClass>,
}

pub struct TypedClass {
    pub name: Symbol,
    pub parent: Symbol,
    /// Fields declared directly on this class (not inherited), in
    /// declaration order, matching `ClassInfo::fields`.
    pub fields: Vec<TypedField>,
    pub methods: Vec<TypedMethod>,
}

pub struct TypedField {
    pub name: Symbol,
    pub ty: Type,
    pub init: Option<TypedExpr>,
}

pub struct TypedMethod {
    pub name: Symbol,
    pub formals: Vec<(Symbol, Type)>,
    pub ret_ty: Type,
    pub body: TypedExpr,
}

pub struct TypedExpr {
    pub kind: TypedExprKind,
    pub ty: Type,
}

pub enum TypedExprKind {
    IntLiteral(i32),
    StringLiteral(Symbol),
    BoolLiteral(bool),
    UnitLiteral,
    SelfExpr,

    /// A local variable or formal parameter.
    Local(Symbol),
    /// A field read through `self`, named by the static class it was
    /// resolved against.
    Field {
        class: Symbol,
        name: Symbol,
    },

    Assign {
        target: AssignTarget,
        value: Box<TypedExpr>,
    },
    UnOp(UnOp, Box<TypedExpr>),
    BinOp(BinOp, Box<TypedExpr>, Box<TypedExpr>),

    If {
        cond: Box<TypedExpr>,
        then_branch: Box<TypedExpr>,
        else_branch: Box<TypedExpr>,
    },
    While {
        cond: Box<TypedExpr>,
        body: Box<TypedExpr>,
    },
    Let {
        name: Symbol,
        ty: Type,
        init: Box<TypedExpr>,
        body: Box<TypedExpr>,
    },
    New(Symbol),
    /// An implicit `self.method(args)` call.
    Call {
        class: Symbol,
        method: Symbol,
        args: Vec<TypedExpr>,
    },
    MethodCall {
        receiver: Box<TypedExpr>,
        /// The static receiver class the vtable slot is read from.
        receiver_class: Symbol,
        method: Symbol,
        args: Vec<TypedExpr>,
    },
    Block(Vec<TypedExpr>),
}

pub enum AssignTarget {
    Local(Symbol),
    Field { class: Symbol, name: Symbol },
}
