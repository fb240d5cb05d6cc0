//! GPU rendering subsystem.
//!
//! Renderers own their GPU resources (pipelines, buffers) and record into the
//! frame's encoder through a [`RenderTarget`].
//!
//! Convention:
//! - CPU geometry is in world units (see `geometry`).
//! - The vertex shader applies projection · view · model from uniforms.

mod ctx;
mod grid;

pub use ctx::{RenderCtx, RenderTarget};
pub use grid::{GridFrame, GridRenderer};
