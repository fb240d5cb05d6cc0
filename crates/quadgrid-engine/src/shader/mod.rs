//! Shader compilation and linking.
//!
//! GLSL stages are compiled to naga IR and validated on the CPU, so compile and
//! link status are known before any GPU object exists. A linked
//! [`ShaderProgram`] hands validated modules to wgpu when a pipeline is built.

mod error;
pub mod layout;
mod program;
mod sources;
mod stage;

pub use error::ShaderError;
pub use program::ShaderProgram;
pub use sources::{ShaderSources, DEFAULT_FRAGMENT_SOURCE, DEFAULT_VERTEX_SOURCE};
pub use stage::{CompileStatus, CompiledStage, StageKind};
