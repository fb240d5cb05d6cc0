use std::fmt;

use naga::front::glsl;
use naga::valid::{Capabilities, ValidationFlags, Validator};

/// Pipeline stage a source is compiled for.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StageKind {
    Vertex,
    Fragment,
}

impl StageKind {
    pub(crate) fn to_naga(self) -> naga::ShaderStage {
        match self {
            StageKind::Vertex => naga::ShaderStage::Vertex,
            StageKind::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Vertex => f.write_str("vertex"),
            StageKind::Fragment => f.write_str("fragment"),
        }
    }
}

/// Result of compiling one stage.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileStatus {
    Compiled,
    /// Compilation failed with the given (non-empty) diagnostic.
    Failed(String),
}

/// One compiled shader stage.
///
/// Compilation never aborts: a failing source produces a stage whose status is
/// [`CompileStatus::Failed`]. Linking is where a failed stage becomes an error.
#[derive(Debug, Clone)]
pub struct CompiledStage {
    kind: StageKind,
    status: CompileStatus,
    module: Option<naga::Module>,
}

impl CompiledStage {
    /// Compiles GLSL `source` for `kind` and validates the result.
    pub fn compile(source: &str, kind: StageKind) -> Self {
        match compile_glsl(source, kind) {
            Ok(module) => {
                let entries = module.entry_points.len();
                log::debug!("{kind} shader compiled ({entries} entry point(s))");
                Self {
                    kind,
                    status: CompileStatus::Compiled,
                    module: Some(module),
                }
            }
            Err(diagnostic) => {
                log::error!("{kind} shader compilation failed:\n{diagnostic}");
                Self {
                    kind,
                    status: CompileStatus::Failed(diagnostic),
                    module: None,
                }
            }
        }
    }

    #[inline]
    pub fn kind(&self) -> StageKind {
        self.kind
    }

    #[inline]
    pub fn status(&self) -> &CompileStatus {
        &self.status
    }

    #[inline]
    pub fn is_compiled(&self) -> bool {
        self.status == CompileStatus::Compiled
    }

    /// Compiler diagnostic, if compilation failed.
    pub fn info_log(&self) -> Option<&str> {
        match &self.status {
            CompileStatus::Compiled => None,
            CompileStatus::Failed(log) => Some(log),
        }
    }

    pub(crate) fn into_module(self) -> Option<naga::Module> {
        self.module
    }
}

fn compile_glsl(source: &str, kind: StageKind) -> Result<naga::Module, String> {
    let mut frontend = glsl::Frontend::default();
    let module = frontend
        .parse(&glsl::Options::from(kind.to_naga()), source)
        .map_err(|errors| non_empty(errors.emit_to_string(source), &errors))?;

    Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .map_err(|err| non_empty(err.emit_to_string(source), &err))?;

    Ok(module)
}

fn non_empty(rendered: String, err: &dyn fmt::Debug) -> String {
    if rendered.trim().is_empty() {
        format!("{err:?}")
    } else {
        rendered
    }
}
