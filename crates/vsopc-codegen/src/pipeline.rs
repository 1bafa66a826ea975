//! Shelling out to `llc` and `clang` (spec.md §6, the "(none)" full-compile
//! mode): write the generated module as textual LLVM IR, hand it to `llc`
//! for optimized native assembly, then let `clang` assemble and link it
//! against the hand-written runtime object file.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{CodeGenError, Result};

pub struct ToolchainConfig {
    pub llc_path: PathBuf,
    pub clang_path: PathBuf,
    pub runtime_object: PathBuf,
}

/// Write `ir` to `<basename>.ll`, returning the path written.
pub fn write_ir(ir: &str, basename: &Path) -> Result<PathBuf> {
    let ll_path = basename.with_extension("ll");
    std::fs::write(&ll_path, ir).map_err(|e| CodeGenError::WriteIrFailed {
        path: ll_path.display().to_string(),
        source: e,
    })?;
    Ok(ll_path)
}

/// Run `llc -O2` over `ll_path`, producing a native assembly file next to it.
pub fn run_llc(config: &ToolchainConfig, ll_path: &Path) -> Result<PathBuf> {
    let asm_path = ll_path.with_extension("s");
    run_tool(
        "llc",
        Command::new(&config.llc_path)
            .arg("-O2")
            .arg(ll_path)
            .arg("-o")
            .arg(&asm_path),
    )?;
    Ok(asm_path)
}

/// Run `clang` to assemble and link `asm_path` with the runtime object file
/// into the final executable `exe_path`.
pub fn run_clang(config: &ToolchainConfig, asm_path: &Path, exe_path: &Path) -> Result<()> {
    run_tool(
        "clang",
        Command::new(&config.clang_path)
            .arg(asm_path)
            .arg(&config.runtime_object)
            .arg("-lm")
            .arg("-o")
            .arg(exe_path),
    )
}

fn run_tool(tool: &'static str, command: &mut Command) -> Result<()> {
    let program = command.get_program().to_string_lossy().into_owned();
    let output = command
        .output()
        .map_err(|e| CodeGenError::ToolLaunchFailed { tool, path: program, source: e })?;
    if !output.status.success() {
        return Err(CodeGenError::ToolFailed {
            tool,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(())
}

/// Run the full `.ll` -> `.s` -> executable pipeline for a source file whose
/// stem gives the output basename, e.g. `foo.vsop` produces `foo`.
pub fn compile(config: &ToolchainConfig, ir: &str, source_path: &Path) -> Result<PathBuf> {
    let basename = source_path.with_extension("");
    let ll_path = write_ir(ir, &basename)?;
    let asm_path = run_llc(config, &ll_path)?;
    let exe_path = basename;
    run_clang(config, &asm_path, &exe_path)?;
    Ok(exe_path)
}
