/// Settings for [`Gpu::new`](super::Gpu::new).
///
/// The defaults ask for a vsynced sRGB surface on any backend that can
/// satisfy downlevel limits, which includes OpenGL/GLES.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Backends the adapter may come from. `WGPU_BACKEND` overrides the default.
    pub backends: wgpu::Backends,
    pub prefer_srgb: bool,
    pub present_mode: wgpu::PresentMode,
    /// Ignored when the surface does not support it.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,
    pub required_features: wgpu::Features,
    pub required_limits: wgpu::Limits,
    /// Hint only.
    pub desired_maximum_frame_latency: u32,
}

impl GpuInit {
    /// Restricts adapter selection to the OpenGL/GLES backend.
    pub fn gl() -> Self {
        Self {
            backends: wgpu::Backends::GL,
            ..Self::default()
        }
    }
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::from_env().unwrap_or(wgpu::Backends::all()),
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults(),
            desired_maximum_frame_latency: 2,
        }
    }
}
