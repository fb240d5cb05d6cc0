//! wgpu device, surface and depth target for one window.

mod gpu;
mod init;
mod surface;

pub use gpu::{Gpu, GpuFrame};
pub use init::GpuInit;
pub use surface::{SurfaceErrorAction, DEPTH_FORMAT};
