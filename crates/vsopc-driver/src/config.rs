//! Resolves the external tool paths spec.md §6 leaves to the environment:
//! `llc`, `clang`, and the hand-written runtime object file linked into
//! every compiled program.
//!
//! Resolution order (highest priority first): CLI override, then
//! `VSOPC_LLC`/`VSOPC_CLANG`/`VSOPC_RUNTIME_OBJECT` environment variables,
//! then an optional `vsopc.toml` in the working directory, then built-in
//! defaults. A single-location layered config, in the same load-then-layer
//! shape as other config loaders in this workspace, scoped down to one
//! search location since this tool has no per-user config directory to
//! consult.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use vsopc_codegen::ToolchainConfig;

const CONFIG_FILE_NAME: &str = "vsopc.toml";

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    llc: Option<String>,
    clang: Option<String>,
    runtime_object: Option<String>,
}

/// CLI-supplied overrides, all optional; `None` falls through to the next
/// layer. No flag currently surfaces these (spec.md §6's grammar is exact
/// and leaves no room for extra flags) but the layering exists so a future
/// `vsopc --llc=... ` need not restructure this module.
#[derive(Debug, Default)]
pub struct ConfigOverrides {
    pub llc: Option<String>,
    pub clang: Option<String>,
    pub runtime_object: Option<String>,
}

pub fn resolve(overrides: ConfigOverrides) -> Result<ToolchainConfig> {
    let file = load_file_config()?;
    let llc = overrides
        .llc
        .or_else(|| std::env::var("VSOPC_LLC").ok())
        .or(file.llc)
        .unwrap_or_else(|| "llc".to_string());
    let clang = overrides
        .clang
        .or_else(|| std::env::var("VSOPC_CLANG").ok())
        .or(file.clang)
        .unwrap_or_else(|| "clang".to_string());
    let runtime_object = overrides
        .runtime_object
        .or_else(|| std::env::var("VSOPC_RUNTIME_OBJECT").ok())
        .or(file.runtime_object)
        .unwrap_or_else(|| "./object.o".to_string());

    Ok(ToolchainConfig {
        llc_path: PathBuf::from(llc),
        clang_path: PathBuf::from(clang),
        runtime_object: PathBuf::from(runtime_object),
    })
}

fn load_file_config() -> Result<FileConfig> {
    load_file_config_from(Path::new(CONFIG_FILE_NAME))
}

fn load_file_config_from(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_config_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = load_file_config_from(&dir.path().join("absent.toml")).unwrap();
        assert!(cfg.llc.is_none());
    }

    #[test]
    fn reads_overrides_from_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vsopc.toml");
        std::fs::write(&path, "llc = \"llc-18\"\nclang = \"clang-18\"\n").unwrap();
        let cfg = load_file_config_from(&path).unwrap();
        assert_eq!(cfg.llc.as_deref(), Some("llc-18"));
        assert_eq!(cfg.clang.as_deref(), Some("clang-18"));
    }

    #[test]
    fn cli_override_wins_over_everything() {
        let overrides = ConfigOverrides {
            llc: Some("/opt/llvm/bin/llc".to_string()),
            clang: None,
            runtime_object: None,
        };
        let resolved = resolve(overrides).unwrap();
        assert_eq!(resolved.llc_path, PathBuf::from("/opt/llvm/bin/llc"));
    }
}
