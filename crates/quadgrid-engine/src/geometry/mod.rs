//! CPU-side geometry for the demos.
//!
//! Canonical world space:
//! - +X right, +Y up, +Z towards the viewer
//! - one grid cell is `GRID_SPACING` world units wide
//!
//! Everything here is pure; GPU upload lives in `render`.

mod grid;
mod quad;

pub use grid::{grid_positions, replicate, GridGeometry, MeshUpload, GRID_SPACING};
pub use quad::{Vertex, QUAD_VERTICES, QUAD_VERTEX_COUNT};
