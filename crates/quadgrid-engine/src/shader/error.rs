use std::fmt;

use super::stage::StageKind;

/// A shader compile or link failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderError {
    /// A stage failed to compile; `log` is the compiler diagnostic.
    Compile { stage: StageKind, log: String },
    /// The stages could not be linked into a program.
    Link { log: String },
}

impl ShaderError {
    /// Diagnostic text reported by the compiler or linker.
    pub fn log(&self) -> &str {
        match self {
            ShaderError::Compile { log, .. } | ShaderError::Link { log } => log,
        }
    }
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::Compile { stage, log } => {
                write!(f, "{stage} shader compilation failed:\n{log}")
            }
            ShaderError::Link { log } => write!(f, "shader program link failed:\n{log}"),
        }
    }
}

impl std::error::Error for ShaderError {}
