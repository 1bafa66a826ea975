//! Shared infrastructure for the VSOP compiler: interning, spans, diagnostics
//! and typed index vectors. Every other crate in the workspace depends on
//! this one.

mod diagnostic;
mod index_vec;
mod span;
mod symbol;

pub use diagnostic::{Diagnostic, Handler, Level};
pub use index_vec::{Idx, IndexVec};
pub use span::{SourceFile, Span};
pub use symbol::Symbol;
