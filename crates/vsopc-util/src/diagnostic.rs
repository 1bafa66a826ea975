//! Diagnostic reporting.
//!
//! spec.md §7 requires every semantic error to be written to stderr as
//! `<file>:<line>:<col>: semantic error: <message>` and accumulated into a
//! shared counter; no phase aborts on the first error. [`Handler`] is that
//! shared counter plus the formatting, threaded explicitly through the
//! resolver, checker and lowerer rather than kept as global state (spec.md
//! §9's "Global state" design note).

use crate::Span;
use std::cell::RefCell;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "semantic error"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
            span,
        }
    }

    /// Format as `<file>:<line>:<col>: semantic error: <message>`.
    pub fn render(&self, file: &Path) -> String {
        format!(
            "{}:{}:{}: {}: {}",
            file.display(),
            self.span.line,
            self.span.column,
            self.level,
            self.message
        )
    }
}

/// Accumulates diagnostics for one compilation and exposes the error count
/// every phase boundary checks before proceeding (spec.md §2, §7).
pub struct Handler {
    file: PathBuf,
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl Handler {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            diagnostics: RefCell::new(Vec::new()),
        }
    }

    pub fn error(&self, message: impl Into<String>, span: Span) {
        self.diagnostics
            .borrow_mut()
            .push(Diagnostic::error(message, span));
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.borrow().len()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Print every accumulated diagnostic to stderr, in report order.
    pub fn emit_to_stderr(&self) {
        for diag in self.diagnostics.borrow().iter() {
            eprintln!("{}", diag.render(&self.file));
        }
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_in_spec_mandated_format() {
        let diag = Diagnostic::error("undefined identifier x", Span::new(0, 1, 3, 5));
        let rendered = diag.render(Path::new("foo.vsop"));
        assert_eq!(
            rendered,
            "foo.vsop:3:5: semantic error: undefined identifier x"
        );
    }

    #[test]
    fn handler_accumulates_without_aborting() {
        let handler = Handler::new("foo.vsop");
        handler.error("first", Span::DUMMY);
        handler.error("second", Span::DUMMY);
        assert_eq!(handler.error_count(), 2);
        assert!(handler.has_errors());
    }

    #[test]
    fn fresh_handler_has_no_errors() {
        let handler = Handler::new("foo.vsop");
        assert!(!handler.has_errors());
        assert_eq!(handler.error_count(), 0);
    }
}
