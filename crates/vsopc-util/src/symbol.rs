//! String interning for identifiers and class names.
//!
//! VSOP source files are small and the compiler is single-threaded
//! end to end (spec §5), so the interner here is a plain `RefCell`-backed
//! table rather than the lock-free concurrent map a multi-threaded front
//! end would need. Interned strings are leaked to get a `'static` string
//! slice; the compiler's lifetime is one source file, so this never grows
//! unbounded.

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;

/// A compact, interned handle to a name (identifier, class name, keyword).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

thread_local! {
    static INTERNER: RefCell<Interner> = RefCell::new(Interner::new());
}

struct Interner {
    strings: Vec<&'static str>,
    lookup: FxHashMap<&'static str, Symbol>,
}

impl Interner {
    fn new() -> Self {
        Self {
            strings: Vec::new(),
            lookup: FxHashMap::default(),
        }
    }

    fn intern(&mut self, s: &str) -> Symbol {
        if let Some(&sym) = self.lookup.get(s) {
            return sym;
        }
        let leaked: &'static str = Box::leak(s.to_string().into_boxed_str());
        let sym = Symbol(self.strings.len() as u32);
        self.strings.push(leaked);
        self.lookup.insert(leaked, sym);
        sym
    }

    fn resolve(&self, sym: Symbol) -> &'static str {
        self.strings[sym.0 as usize]
    }
}

impl Symbol {
    pub fn intern(s: &str) -> Self {
        INTERNER.with(|i| i.borrow_mut().intern(s))
    }

    pub fn as_str(self) -> &'static str {
        INTERNER.with(|i| i.borrow().resolve(self))
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::intern(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Symbol::intern(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_string_interns_to_same_symbol() {
        let a = Symbol::intern("Object");
        let b = Symbol::intern("Object");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_strings_get_distinct_symbols() {
        let a = Symbol::intern("Main");
        let b = Symbol::intern("main");
        assert_ne!(a, b);
    }

    #[test]
    fn as_str_round_trips() {
        let s = Symbol::intern("printInt32");
        assert_eq!(s.as_str(), "printInt32");
    }

    #[test]
    fn display_matches_source_text() {
        let s = Symbol::intern("x");
        assert_eq!(format!("{s}"), "x");
    }
}
