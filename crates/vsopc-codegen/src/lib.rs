//! LLVM IR generation and native-toolchain invocation (spec.md §4.3, §6).

pub mod error;
pub mod layout;
pub mod llvm;
pub mod pipeline;
mod types;

pub use error::{CodeGenError, Result};
pub use llvm::Lowerer;
pub use pipeline::{compile, run_clang, run_llc, write_ir, ToolchainConfig};

use inkwell::context::Context;
use vsopc_sem::{ClassGraph, TypedProgram};

/// Lower a fully type-checked program to a textual LLVM IR module, matching
/// the `-i` mode and the first stage of a full compile.
pub fn lower_to_ir(module_name: &str, graph: &ClassGraph, program: &TypedProgram) -> Result<String> {
    let context = Context::create();
    let mut lowerer = Lowerer::new(&context, module_name, graph);
    lowerer.lower_program(program)?;
    Ok(lowerer.print_ir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsopc_ast::Parser;
    use vsopc_lex::Lexer;
    use vsopc_sem::analyze;
    use vsopc_util::Handler;

    fn lower_source(source: &str) -> String {
        let handler = Handler::new("test.vsop");
        let tokens = Lexer::new(source, &handler).tokenize();
        let program = Parser::new(tokens, &handler).parse_program();
        let (graph, typed) = analyze(&program, &handler).expect("program must be well-formed");
        lower_to_ir("test", &graph, &typed).expect("lowering must succeed")
    }

    #[test]
    fn lowers_trivial_main_to_a_verified_module() {
        let ir = lower_source("class Main { main(): int32 { 0 } }");
        assert!(ir.contains("define i32 @main"));
        assert!(ir.contains("struct.Main"));
    }

    #[test]
    fn lowers_field_access_and_arithmetic() {
        let ir = lower_source(
            "class Counter { value: int32 <- 0; \
             bump(): int32 { value <- value + 1 } } \
             class Main { main(): int32 { 0 } }",
        );
        assert!(ir.contains("Counter.bump"));
    }

    #[test]
    fn lowers_virtual_dispatch_through_vtable() {
        let ir = lower_source(
            "class Shape { area(): int32 { 0 } } \
             class Square extends Shape { side: int32 <- 2; \
             area(): int32 { side * side } } \
             class Main { main(): int32 { 0 } }",
        );
        assert!(ir.contains("Shape.VTable"));
        assert!(ir.contains("Square.VTable"));
        assert!(ir.contains("Square.area"));
    }

    #[test]
    fn lowers_if_while_and_string_equality() {
        let ir = lower_source(
            "class Main { \
                 main(): int32 { \
                     let x: int32 <- 0 in { \
                         while x < 10 do x <- x + 1; \
                         if \"a\" = \"a\" then x <- x + 1 else x <- x; \
                         0 \
                     } \
                 } \
             }",
        );
        assert!(ir.contains("@strcmp"));
        assert!(ir.contains("while.cond"));
    }
}
