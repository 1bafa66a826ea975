//! Lexical scope for the type checker.
//!
//! spec.md's Design Note requires a flat name-to-binding-stack map rather
//! than a tree of nested scopes: `insert` pushes a new binding for a name,
//! `remove` pops it back off when the binding's block exits, and `look_up`
//! only ever sees the innermost still-live binding. This mirrors the
//! reference compiler's `SymbolTable`, which is exactly
//! `unordered_map<string, vector<string>>` plus `insert`/`remove`/`look_up`.

use std::collections::HashMap;
use vsopc_util::Symbol;

use crate::types::Type;

pub struct Scope {
    bindings: HashMap<Symbol, Vec<Type>>,
}

impl Scope {
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Push a new binding for `name`, shadowing any binding already in
    /// scope. Call [`Scope::remove`] with the same name when the
    /// enclosing block/let/formal list goes out of scope.
    pub fn insert(&mut self, name: Symbol, ty: Type) {
        self.bindings.entry(name).or_default().push(ty);
    }

    /// Pop the innermost binding for `name`.
    pub fn remove(&mut self, name: Symbol) {
        if let Some(stack) = self.bindings.get_mut(&name) {
            stack.pop();
            if stack.is_empty() {
                self.bindings.remove(&name);
            }
        }
    }

    pub fn look_up(&self, name: Symbol) -> Option<Type> {
        self.bindings.get(&name).and_then(|stack| stack.last()).copied()
    }

    pub fn contains(&self, name: Symbol) -> bool {
        self.bindings.contains_key(&name)
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_up_returns_the_innermost_binding() {
        let mut scope = Scope::new();
        let x = Symbol::intern("x");
        scope.insert(x, Type::Int32);
        scope.insert(x, Type::Bool);
        assert_eq!(scope.look_up(x), Some(Type::Bool));
    }

    #[test]
    fn remove_restores_the_outer_binding() {
        let mut scope = Scope::new();
        let x = Symbol::intern("x");
        scope.insert(x, Type::Int32);
        scope.insert(x, Type::Bool);
        scope.remove(x);
        assert_eq!(scope.look_up(x), Some(Type::Int32));
        scope.remove(x);
        assert_eq!(scope.look_up(x), None);
        assert!(!scope.contains(x));
    }

    #[test]
    fn unbound_name_resolves_to_none() {
        let scope = Scope::new();
        assert_eq!(scope.look_up(Symbol::intern("y")), None);
    }
}
