//! The VSOP type system (spec.md §4.2): four primitives plus class types,
//! subtyping over the class graph, and the join (least common ancestor)
//! operation `if`/`while` bodies and method overrides rely on.

use crate::class_graph::ClassGraph;
use std::fmt;
use vsopc_ast::Type as AstType;
use vsopc_util::Symbol;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Int32,
    Bool,
    String,
    Unit,
    Class(Symbol),
}

impl From<AstType> for Type {
    fn from(ty: AstType) -> Self {
        match ty {
            AstType::Int32 => Type::Int32,
            AstType::Bool => Type::Bool,
            AstType::StringT => Type::String,
            AstType::Unit => Type::Unit,
            AstType::Class(name) => Type::Class(name),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int32 => write!(f, "int32"),
            Type::Bool => write!(f, "bool"),
            Type::String => write!(f, "string"),
            Type::Unit => write!(f, "unit"),
            Type::Class(name) => write!(f, "{name}"),
        }
    }
}

impl Type {
    pub fn object(graph: &ClassGraph) -> Type {
        let _ = graph;
        Type::Class(Symbol::intern("Object"))
    }

    pub fn is_class(self) -> bool {
        matches!(self, Type::Class(_))
    }
}

/// `sub <: sup`. Primitives are only reflexively related to themselves and
/// to nothing else; `unit` is isolated (spec.md's Design Note); every class
/// type is a subtype of every class on its ancestor chain, and therefore
/// (transitively) of `Object`.
pub fn is_subtype(graph: &ClassGraph, sub: Type, sup: Type) -> bool {
    match (sub, sup) {
        (Type::Int32, Type::Int32) => true,
        (Type::Bool, Type::Bool) => true,
        (Type::String, Type::String) => true,
        (Type::Unit, Type::Unit) => true,
        (Type::Class(a), Type::Class(b)) => graph.ancestors(a).contains(&b),
        _ => false,
    }
}

/// The join (least upper bound) of two types, used to type `if`/`else`
/// branches and merge points in general. Two different class types join to
/// their nearest common ancestor, which always exists because every class
/// eventually reaches `Object`. Primitives only join with themselves;
/// joining a primitive with a class type (or with a different primitive)
/// has no result.
pub fn join(graph: &ClassGraph, a: Type, b: Type) -> Option<Type> {
    match (a, b) {
        (Type::Int32, Type::Int32) => Some(Type::Int32),
        (Type::Bool, Type::Bool) => Some(Type::Bool),
        (Type::String, Type::String) => Some(Type::String),
        (Type::Unit, Type::Unit) => Some(Type::Unit),
        (Type::Class(x), Type::Class(y)) => {
            let ancestors_x = graph.ancestors(x);
            let ancestors_y = graph.ancestors(y);
            ancestors_x
                .into_iter()
                .find(|c| ancestors_y.contains(c))
                .map(Type::Class)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_graph::resolve;
    use vsopc_ast::Parser;
    use vsopc_lex::Lexer;
    use vsopc_util::Handler;

    fn graph_of(source: &str) -> ClassGraph {
        let handler = Handler::new("test.vsop");
        let tokens = Lexer::new(source, &handler).tokenize();
        let program = Parser::new(tokens, &handler).parse_program();
        resolve(&program, &handler)
    }

    #[test]
    fn primitives_are_only_subtypes_of_themselves() {
        let graph = graph_of("class Main { main(): int32 { 0 } }");
        assert!(is_subtype(&graph, Type::Int32, Type::Int32));
        assert!(!is_subtype(&graph, Type::Int32, Type::Bool));
        assert!(!is_subtype(&graph, Type::Unit, Type::Int32));
    }

    #[test]
    fn every_class_is_a_subtype_of_object() {
        let graph = graph_of(
            "class Animal { } class Dog extends Animal { } \
             class Main { main(): int32 { 0 } }",
        );
        let dog = Type::Class(Symbol::intern("Dog"));
        let object = Type::object(&graph);
        assert!(is_subtype(&graph, dog, object));
    }

    #[test]
    fn join_of_siblings_is_their_common_parent() {
        let graph = graph_of(
            "class Animal { } class Dog extends Animal { } class Cat extends Animal { } \
             class Main { main(): int32 { 0 } }",
        );
        let dog = Type::Class(Symbol::intern("Dog"));
        let cat = Type::Class(Symbol::intern("Cat"));
        let joined = join(&graph, dog, cat).unwrap();
        assert_eq!(joined, Type::Class(Symbol::intern("Animal")));
    }

    #[test]
    fn join_of_primitive_and_class_is_none() {
        let graph = graph_of("class Main { main(): int32 { 0 } }");
        assert!(join(&graph, Type::Int32, Type::object(&graph)).is_none());
    }
}
