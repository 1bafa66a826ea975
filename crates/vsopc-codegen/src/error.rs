//! Codegen and native-toolchain errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodeGenError {
    #[error("class {0} not found while lowering")]
    UnknownClass(String),
    #[error("method {0} not found while lowering")]
    UnknownMethod(String),
    #[error("field {0} not found while lowering")]
    UnknownField(String),
    #[error("LLVM operation failed: {0}")]
    LlvmOperationFailed(String),
    #[error("failed to create target machine for triple {0}")]
    TargetMachineCreationFailed(String),
    #[error("failed to write LLVM IR to {path}: {source}")]
    WriteIrFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to invoke {tool} ({path}): {source}")]
    ToolLaunchFailed {
        tool: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} exited with status {status}: {stderr}")]
    ToolFailed {
        tool: &'static str,
        status: String,
        stderr: String,
    },
}

pub type Result<T> = std::result::Result<T, CodeGenError>;
