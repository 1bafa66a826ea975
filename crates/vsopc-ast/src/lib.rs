//! VSOP AST types, a recursive-descent parser, and the `-p` pretty-printer.

pub mod ast;
pub mod parser;
pub mod printer;

pub use ast::{BinOp, Class, Expr, ExprKind, Field, Formal, Method, Program, Type, UnOp};
pub use parser::Parser;
