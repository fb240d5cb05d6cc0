//! Quadgrid engine crate.
//!
//! Window, GPU and shader plumbing plus the scene that draws one quad or a grid
//! of quads.

pub mod camera;
pub mod core;
pub mod device;
pub mod geometry;
pub mod input;
pub mod logging;
pub mod render;
pub mod scene;
pub mod shader;
pub mod window;
