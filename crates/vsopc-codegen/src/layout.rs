//! Object and vtable layout (spec.md §4.3).
//!
//! Every VSOP object is lowered to an LLVM struct `{ CVtable*, field... }`:
//! a pointer to the class's vtable followed by every field visible on the
//! class, inherited fields first so a subclass's struct is always a valid
//! prefix-compatible extension of its parent's. The vtable itself is
//! `{ fnptr, fnptr, ... }`, one slot per distinct method name visible on
//! the class; an override reuses its parent's slot so a call through a
//! statically-typed pointer to the ancestor still reaches the override.

use vsopc_ast::Type as AstType;
use vsopc_sem::{ClassGraph, MethodInfo};
use vsopc_util::Symbol;

pub struct FieldLayout {
    pub name: Symbol,
    pub ty: AstType,
}

/// All fields visible on `class`, inherited-first; index into this vector
/// is the struct GEP index (offset by one for the leading vtable pointer).
/// `unit`-typed fields carry no runtime value (spec.md §4.1) and are left
/// out entirely rather than occupying a zero-size slot.
pub fn field_layout(graph: &ClassGraph, class: Symbol) -> Vec<FieldLayout> {
    graph
        .all_fields(class)
        .into_iter()
        .filter(|f| f.ty != AstType::Unit)
        .map(|f| FieldLayout { name: f.name, ty: f.ty })
        .collect()
}

pub fn field_index(graph: &ClassGraph, class: Symbol, name: Symbol) -> Option<usize> {
    field_layout(graph, class).iter().position(|f| f.name == name)
}

pub struct VtableSlot<'a> {
    pub name: Symbol,
    /// The method actually invoked when dispatching through `class`'s
    /// vtable: the most-derived override visible from `class`.
    pub info: &'a MethodInfo,
}

/// The full vtable for `class`, built by walking `Object` down to `class`
/// and appending each newly-introduced method name; an override of an
/// already-seen name keeps its original slot.
pub fn vtable_layout(graph: &ClassGraph, class: Symbol) -> Vec<VtableSlot<'_>> {
    let mut chain = graph.ancestors(class);
    chain.reverse(); // Object first, `class` last.

    let mut order: Vec<Symbol> = Vec::new();
    for ancestor in &chain {
        if let Some(info) = graph.get(*ancestor) {
            for method in info.methods.iter() {
                if !order.contains(&method.name) {
                    order.push(method.name);
                }
            }
        }
    }

    order
        .into_iter()
        .map(|name| VtableSlot {
            name,
            info: graph
                .lookup_method(class, name)
                .expect("method visible in ancestor chain must resolve from the class itself"),
        })
        .collect()
}

pub fn vtable_index(graph: &ClassGraph, class: Symbol, name: Symbol) -> Option<usize> {
    vtable_layout(graph, class).iter().position(|s| s.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsopc_ast::Parser;
    use vsopc_lex::Lexer;
    use vsopc_sem::class_graph::resolve;
    use vsopc_util::Handler;

    fn graph_of(source: &str) -> ClassGraph {
        let handler = Handler::new("test.vsop");
        let tokens = Lexer::new(source, &handler).tokenize();
        let program = Parser::new(tokens, &handler).parse_program();
        resolve(&program, &handler)
    }

    #[test]
    fn subclass_fields_follow_parent_fields() {
        let graph = graph_of(
            "class Base { a: int32; } class Derived extends Base { b: int32; } \
             class Main { main(): int32 { 0 } }",
        );
        let layout = field_layout(&graph, Symbol::intern("Derived"));
        assert_eq!(layout[0].name.as_str(), "a");
        assert_eq!(layout[1].name.as_str(), "b");
    }

    #[test]
    fn override_reuses_parent_slot() {
        let graph = graph_of(
            "class Base { speak(): int32 { 0 } greet(): int32 { 1 } } \
             class Derived extends Base { speak(): int32 { 2 } } \
             class Main { main(): int32 { 0 } }",
        );
        let base_slot = vtable_index(&graph, Symbol::intern("Base"), Symbol::intern("speak"));
        let derived_slot =
            vtable_index(&graph, Symbol::intern("Derived"), Symbol::intern("speak"));
        assert_eq!(base_slot, derived_slot);
    }

    #[test]
    fn vtable_dispatches_to_most_derived_implementation() {
        let graph = graph_of(
            "class Base { speak(): int32 { 0 } } \
             class Derived extends Base { speak(): int32 { 1 } } \
             class Main { main(): int32 { 0 } }",
        );
        let layout = vtable_layout(&graph, Symbol::intern("Derived"));
        let slot = layout.iter().find(|s| s.name.as_str() == "speak").unwrap();
        assert_eq!(slot.info.declared_in.as_str(), "Derived");
    }
}
