//! Class-graph resolution (spec.md §4.1).
//!
//! Builds the full inheritance graph from a parsed [`Program`]: injects the
//! built-in `Object` root, registers every class, assigns dense field and
//! method indices (the vtable layout `vsopc-codegen` later reads back
//! through these same indices), and validates the structural invariants
//! spec.md requires before type checking ever runs: no redefinition, no
//! inheritance cycle, no unknown parent, no field shadowing an ancestor
//! field, method overrides must be signature-compatible, and `Main.main`
//! must exist with the right shape.

use std::collections::HashMap;
use vsopc_ast::{Class, Formal, Method, Program, Type as AstType};
use vsopc_util::{define_index, Handler, Idx, IndexVec, Span, Symbol};

define_index!(FieldIndex);
define_index!(MethodIndex);

#[derive(Clone, Debug)]
pub struct FieldInfo {
    pub name: Symbol,
    pub ty: AstType,
    pub declared_in: Symbol,
    pub index: FieldIndex,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub struct MethodInfo {
    pub name: Symbol,
    pub formals: Vec<(Symbol, AstType)>,
    pub ret_ty: AstType,
    pub declared_in: Symbol,
    /// Slot in the class's vtable; identical across an override chain.
    pub index: MethodIndex,
    pub span: Span,
}

pub struct ClassInfo {
    pub name: Symbol,
    pub parent: Option<Symbol>,
    pub fields: IndexVec<FieldIndex, FieldInfo>,
    pub methods: IndexVec<MethodIndex, MethodInfo>,
    field_by_name: HashMap<Symbol, FieldIndex>,
    method_by_name: HashMap<Symbol, MethodIndex>,
    pub span: Span,
}

impl ClassInfo {
    pub fn field(&self, name: Symbol) -> Option<&FieldInfo> {
        self.field_by_name.get(&name).map(|&i| &self.fields[i])
    }

    pub fn method(&self, name: Symbol) -> Option<&MethodInfo> {
        self.method_by_name.get(&name).map(|&i| &self.methods[i])
    }
}

pub struct ClassGraph {
    classes: HashMap<Symbol, ClassInfo>,
}

impl ClassGraph {
    pub fn get(&self, name: Symbol) -> Option<&ClassInfo> {
        self.classes.get(&name)
    }

    pub fn contains(&self, name: Symbol) -> bool {
        self.classes.contains_key(&name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.values()
    }

    /// Walk `name`'s ancestor chain (inclusive), from itself up to `Object`.
    pub fn ancestors(&self, name: Symbol) -> Vec<Symbol> {
        let mut chain = Vec::new();
        let mut current = Some(name);
        while let Some(c) = current {
            chain.push(c);
            current = self.classes.get(&c).and_then(|info| info.parent);
        }
        chain
    }

    /// Every field visible on `name`, declared-in-ancestor-first so indices
    /// match the vtable/object layout a subclass inherits.
    pub fn all_fields(&self, name: Symbol) -> Vec<&FieldInfo> {
        let mut chain = self.ancestors(name);
        chain.reverse();
        let mut out = Vec::new();
        for class in chain {
            if let Some(info) = self.classes.get(&class) {
                out.extend(info.fields.iter());
            }
        }
        out
    }

    /// Resolve `name`'s most-derived method (the one a virtual call to
    /// `name.method` dispatches through), searching from `name` up to
    /// `Object`.
    pub fn lookup_method(&self, name: Symbol, method: Symbol) -> Option<&MethodInfo> {
        for class in self.ancestors(name) {
            if let Some(info) = self.classes.get(&class) {
                if let Some(m) = info.method(method) {
                    return Some(m);
                }
            }
        }
        None
    }

    pub fn lookup_field(&self, name: Symbol, field: Symbol) -> Option<&FieldInfo> {
        for class in self.ancestors(name) {
            if let Some(info) = self.classes.get(&class) {
                if let Some(f) = info.field(field) {
                    return Some(f);
                }
            }
        }
        None
    }
}

const OBJECT: &str = "Object";

/// `Object`'s six built-in methods (spec.md §4.1): no body, resolved at link
/// time against the hand-written runtime object file.
fn object_class_info() -> ClassInfo {
    let object_sym = Symbol::intern(OBJECT);
    let builtins: &[(&str, &[(&str, AstType)], AstType)] = &[
        ("print", &[("s", AstType::StringT)], AstType::Class(object_sym)),
        ("printBool", &[("b", AstType::Bool)], AstType::Class(object_sym)),
        ("printInt32", &[("i", AstType::Int32)], AstType::Class(object_sym)),
        ("inputLine", &[], AstType::StringT),
        ("inputBool", &[], AstType::Bool),
        ("inputInt32", &[], AstType::Int32),
    ];

    let mut methods = IndexVec::new();
    let mut method_by_name = HashMap::new();
    for (name, formals, ret_ty) in builtins {
        let name = Symbol::intern(name);
        let index = methods.push(MethodInfo {
            name,
            formals: formals.iter().map(|(n, t)| (Symbol::intern(n), *t)).collect(),
            ret_ty: *ret_ty,
            declared_in: object_sym,
            index: MethodIndex::from_usize(0),
            span: Span::DUMMY,
        });
        methods[index].index = index;
        method_by_name.insert(name, index);
    }

    ClassInfo {
        name: object_sym,
        parent: None,
        fields: IndexVec::new(),
        methods,
        field_by_name: HashMap::new(),
        method_by_name,
        span: Span::DUMMY,
    }
}

/// Build the class graph and validate every structural invariant spec.md
/// §4.1 requires. Errors are accumulated on `handler`; callers should check
/// `handler.has_errors()` before proceeding to type checking (spec.md §4.2
/// only makes sense over a well-formed graph).
pub fn resolve(program: &Program, handler: &Handler) -> ClassGraph {
    let object_sym = Symbol::intern(OBJECT);
    let mut by_name: HashMap<Symbol, &Class> = HashMap::new();

    for class in &program.classes {
        if class.name == object_sym {
            handler.error("class Object is reserved and cannot be redefined", class.span);
            continue;
        }
        if by_name.insert(class.name, class).is_some() {
            handler.error(format!("class {} is already defined", class.name), class.span);
        }
    }

    for class in by_name.values() {
        if let Some(parent) = class.parent {
            if parent != object_sym && !by_name.contains_key(&parent) {
                handler.error(
                    format!("class {} cannot extend class {}", class.name, parent),
                    class.span,
                );
            }
        }
    }

    for class in by_name.values() {
        if has_cycle(class.name, &by_name, object_sym) {
            // `class.parent` is always `Some` here: a cycle requires at
            // least one `extends` edge to walk.
            let parent = class.parent.expect("cyclic class must have a parent");
            handler.error(
                format!("class {} cannot extend class {}", class.name, parent),
                class.span,
            );
        }
    }

    let mut classes = HashMap::new();
    classes.insert(object_sym, object_class_info());

    for class in &program.classes {
        if class.name == object_sym {
            continue;
        }
        if has_cycle(class.name, &by_name, object_sym) {
            // Already reported; skip building this class's members to avoid
            // infinite ancestor walks later.
            continue;
        }
        let info = build_class_info(class, handler);
        classes.insert(class.name, info);
    }

    let mut graph = ClassGraph { classes };
    check_field_shadowing(program, &mut graph, handler, object_sym);
    check_overrides(program, &graph, handler, object_sym);
    check_main(&graph, handler, object_sym);
    graph
}

/// spec.md §4.1 override-validation clause (i): a class may not introduce a
/// field whose name already exists anywhere in its ancestor chain. Reported
/// fields are dropped from the class so `vsopc-codegen::layout` never sees
/// two fields of the same name (one of them resolving to the parent's
/// slot) when it flattens the object layout.
fn check_field_shadowing(program: &Program, graph: &mut ClassGraph, handler: &Handler, object_sym: Symbol) {
    for class in &program.classes {
        if class.name == object_sym || !graph.contains(class.name) {
            continue;
        }
        let Some(parent) = class.parent.filter(|p| *p != object_sym) else {
            continue;
        };
        if !graph.contains(parent) {
            continue;
        }
        let mut shadowed = std::collections::HashSet::new();
        for field in &class.fields {
            if let Some(ancestor_field) = graph.lookup_field(parent, field.name) {
                handler.error(
                    format!(
                        "field {} hides an ancestor field already declared in class {}",
                        field.name, ancestor_field.declared_in
                    ),
                    field.span,
                );
                shadowed.insert(field.name);
            }
        }
        if !shadowed.is_empty() {
            if let Some(info) = graph.classes.get_mut(&class.name) {
                let kept: Vec<FieldInfo> =
                    info.fields.iter().filter(|f| !shadowed.contains(&f.name)).cloned().collect();
                let mut fields = IndexVec::new();
                let mut field_by_name = HashMap::new();
                for field in kept {
                    let index = fields.push(FieldInfo { index: FieldIndex::from_usize(0), ..field });
                    fields[index].index = index;
                    field_by_name.insert(fields[index].name, index);
                }
                info.fields = fields;
                info.field_by_name = field_by_name;
            }
        }
    }
}

fn has_cycle(start: Symbol, by_name: &HashMap<Symbol, &Class>, object_sym: Symbol) -> bool {
    let mut seen = vec![start];
    let mut current = start;
    loop {
        let Some(class) = by_name.get(&current) else {
            return false;
        };
        match class.parent {
            None => return false,
            Some(p) if p == object_sym => return false,
            Some(p) => {
                if seen.contains(&p) {
                    return true;
                }
                seen.push(p);
                current = p;
            }
        }
    }
}

fn build_class_info(class: &Class, handler: &Handler) -> ClassInfo {
    let mut fields = IndexVec::new();
    let mut field_by_name = HashMap::new();
    for field in &class.fields {
        if field_by_name.contains_key(&field.name) {
            handler.error(
                format!("field {} is already defined in class {}", field.name, class.name),
                field.span,
            );
            continue;
        }
        let index = fields.push(FieldInfo {
            name: field.name,
            ty: field.ty,
            declared_in: class.name,
            index: FieldIndex::from_usize(0),
            span: field.span,
        });
        fields[index].index = index;
        field_by_name.insert(field.name, index);
    }

    let mut methods = IndexVec::new();
    let mut method_by_name = HashMap::new();
    for method in &class.methods {
        if method_by_name.contains_key(&method.name) {
            handler.error(
                format!("method {} is already defined in class {}", method.name, class.name),
                method.span,
            );
            continue;
        }
        let index = methods.push(method_info(method, class.name, MethodIndex::from_usize(0)));
        methods[index].index = index;
        method_by_name.insert(method.name, index);
    }

    ClassInfo {
        name: class.name,
        parent: class.parent,
        fields,
        methods,
        field_by_name,
        method_by_name,
        span: class.span,
    }
}

fn method_info(method: &Method, declared_in: Symbol, index: MethodIndex) -> MethodInfo {
    MethodInfo {
        name: method.name,
        formals: method.formals.iter().map(|f: &Formal| (f.name, f.ty)).collect(),
        ret_ty: method.ret_ty,
        declared_in,
        index,
        span: method.span,
    }
}

fn check_overrides(program: &Program, graph: &ClassGraph, handler: &Handler, object_sym: Symbol) {
    for class in &program.classes {
        if class.name == object_sym || !graph.contains(class.name) {
            continue;
        }
        let Some(parent) = class.parent.filter(|p| *p != object_sym) else {
            continue;
        };
        if !graph.contains(parent) {
            continue;
        }
        for method in &class.methods {
            if let Some(parent_method) = graph.lookup_method(parent, method.name) {
                if parent_method.formals.len() != method.formals.len() {
                    handler.error(
                        format!("overriding method {} with different number of formals", method.name),
                        method.span,
                    );
                    continue;
                }
                let same_formal_types = parent_method
                    .formals
                    .iter()
                    .zip(method.formals.iter())
                    .all(|((_, pt), f)| types_equal(*pt, f.ty));
                if !same_formal_types {
                    handler.error(
                        format!("overriding method {} with different formal types", method.name),
                        method.span,
                    );
                    continue;
                }
                if !types_equal(parent_method.ret_ty, method.ret_ty) {
                    handler.error(
                        format!("overriding method {} with different return type", method.name),
                        method.span,
                    );
                }
            }
        }
    }
}

fn types_equal(a: AstType, b: AstType) -> bool {
    match (a, b) {
        (AstType::Int32, AstType::Int32) => true,
        (AstType::Bool, AstType::Bool) => true,
        (AstType::StringT, AstType::StringT) => true,
        (AstType::Unit, AstType::Unit) => true,
        (AstType::Class(x), AstType::Class(y)) => x == y,
        _ => false,
    }
}

fn check_main(graph: &ClassGraph, handler: &Handler, object_sym: Symbol) {
    let main_sym = Symbol::intern("Main");
    let Some(main_class) = graph.get(main_sym) else {
        handler.error("class Main is undefined", Span::DUMMY);
        return;
    };
    let Some(main_method) = main_class.method(Symbol::intern("main")) else {
        handler.error("main method of class Main is undefined", main_class.span);
        return;
    };
    if !main_method.formals.is_empty() || !types_equal(main_method.ret_ty, AstType::Int32) {
        handler.error(
            "main method must take no arguments and have return type int32",
            main_method.span,
        );
    }
    let _ = object_sym;
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsopc_ast::Parser;
    use vsopc_lex::Lexer;

    fn resolve_source(source: &str) -> (ClassGraph, usize) {
        let handler = Handler::new("test.vsop");
        let tokens = Lexer::new(source, &handler).tokenize();
        let program = Parser::new(tokens, &handler).parse_program();
        let graph = resolve(&program, &handler);
        (graph, handler.error_count())
    }

    #[test]
    fn object_is_always_present() {
        let (graph, _) = resolve_source("class Main { main(): int32 { 0 } }");
        assert!(graph.contains(Symbol::intern("Object")));
    }

    #[test]
    fn object_exposes_builtin_print_methods() {
        let (graph, _) = resolve_source("class Main { main(): int32 { 0 } }");
        let object = graph.get(Symbol::intern("Object")).unwrap();
        assert!(object.method(Symbol::intern("print")).is_some());
        assert!(object.method(Symbol::intern("inputInt32")).is_some());
    }

    #[test]
    fn rejects_redefined_class() {
        let (_graph, errors) = resolve_source(
            "class Main { main(): int32 { 0 } } class Main { main(): int32 { 1 } }",
        );
        assert!(errors > 0);
    }

    #[test]
    fn rejects_unknown_parent() {
        let (_graph, errors) =
            resolve_source("class Main extends Ghost { main(): int32 { 0 } }");
        assert!(errors > 0);
    }

    #[test]
    fn rejects_inheritance_cycle() {
        let (_graph, errors) = resolve_source(
            "class A extends B { } class B extends A { } \
             class Main { main(): int32 { 0 } }",
        );
        assert!(errors > 0);
    }

    #[test]
    fn rejects_missing_main_method() {
        let (_graph, errors) = resolve_source("class Main { }");
        assert!(errors > 0);
    }

    #[test]
    fn rejects_main_with_arguments() {
        let (_graph, errors) =
            resolve_source("class Main { main(x: int32): int32 { 0 } }");
        assert!(errors > 0);
    }

    #[test]
    fn inherited_fields_come_before_subclass_fields() {
        let (graph, errors) = resolve_source(
            "class Base { a: int32; } \
             class Derived extends Base { b: int32; } \
             class Main { main(): int32 { 0 } }",
        );
        assert_eq!(errors, 0);
        let fields = graph.all_fields(Symbol::intern("Derived"));
        assert_eq!(fields[0].name.as_str(), "a");
        assert_eq!(fields[1].name.as_str(), "b");
    }

    #[test]
    fn rejects_incompatible_override() {
        let (_graph, errors) = resolve_source(
            "class Base { speak(): int32 { 0 } } \
             class Derived extends Base { speak(): bool { true } } \
             class Main { main(): int32 { 0 } }",
        );
        assert!(errors > 0);
    }

    fn diagnostics_for(source: &str) -> Vec<String> {
        let handler = Handler::new("test.vsop");
        let tokens = Lexer::new(source, &handler).tokenize();
        let program = Parser::new(tokens, &handler).parse_program();
        let _ = resolve(&program, &handler);
        handler.diagnostics().into_iter().map(|d| d.message).collect()
    }

    #[test]
    fn inheritance_cycle_reports_cannot_extend_both_ways() {
        let messages = diagnostics_for("class A extends B {} class B extends A {}");
        assert!(messages.contains(&"class A cannot extend class B".to_string()));
        assert!(messages.contains(&"class B cannot extend class A".to_string()));
    }

    #[test]
    fn unknown_parent_reports_cannot_extend() {
        let messages =
            diagnostics_for("class Main extends Ghost { main(): int32 { 0 } }");
        assert!(messages.contains(&"class Main cannot extend class Ghost".to_string()));
    }

    #[test]
    fn override_arity_mismatch_reports_exact_wording() {
        let messages = diagnostics_for(
            "class P { f(x: int32): int32 { 0 } } \
             class C extends P { f(): int32 { 0 } } \
             class Main { main(): int32 { 0 } }",
        );
        assert!(messages.contains(&"overriding method f with different number of formals".to_string()));
    }

    #[test]
    fn field_shadowing_ancestor_is_rejected_and_dropped() {
        let (graph, errors) = resolve_source(
            "class A { x: int32; } \
             class B extends A { x: bool; } \
             class Main { main(): int32 { 0 } }",
        );
        assert!(errors > 0);
        let b = graph.get(Symbol::intern("B")).unwrap();
        assert!(b.field(Symbol::intern("x")).is_none());
        let fields = graph.all_fields(Symbol::intern("B"));
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].declared_in, Symbol::intern("A"));
    }
}
