//! Source location tracking.
//!
//! Every AST node and token carries a [`Span`] so that diagnostics can be
//! reported in the exact `file:line:col` format spec.md §6 mandates.

use std::path::{Path, PathBuf};

/// A source position: 1-based line and column, plus byte offset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub const DUMMY: Span = Span {
        start: 0,
        end: 0,
        line: 1,
        column: 1,
    };

    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    pub fn point(line: u32, column: u32) -> Self {
        Self {
            start: 0,
            end: 0,
            line,
            column,
        }
    }

    /// Merge two spans into one covering both (used when combining tokens
    /// into a larger AST node's span).
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: self.line,
            column: self.column,
        }
    }
}

/// The single source file a compilation session operates on.
///
/// VSOP compiles one file per invocation (spec.md §6: `vsopc [mode]
/// <source-file>`), so this is simpler than a multi-file `SourceMap`: it
/// just pairs a path with its contents for error formatting.
pub struct SourceFile {
    pub path: PathBuf,
    pub contents: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, contents: String) -> Self {
        Self {
            path: path.into(),
            contents,
        }
    }

    /// The display name used in diagnostics, e.g. `foo.vsop`.
    pub fn display_name(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dummy_span_is_line_one_column_one() {
        assert_eq!(Span::DUMMY.line, 1);
        assert_eq!(Span::DUMMY.column, 1);
    }

    #[test]
    fn to_spans_the_union() {
        let a = Span::new(0, 3, 1, 1);
        let b = Span::new(10, 15, 1, 11);
        let merged = a.to(b);
        assert_eq!(merged.start, 0);
        assert_eq!(merged.end, 15);
    }
}
