use crate::device::Gpu;

/// Device handles a renderer needs to create and update its resources.
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    /// Pipelines are keyed on this; a change forces a rebuild.
    pub surface_format: wgpu::TextureFormat,
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn from_gpu(gpu: &'a Gpu<'_>) -> Self {
        Self {
            device: gpu.device(),
            queue: gpu.queue(),
            surface_format: gpu.surface_format(),
        }
    }
}

/// Attachments of the frame being recorded.
///
/// Color and depth are already cleared when a renderer sees them.
pub struct RenderTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
    pub depth_view: &'a wgpu::TextureView,
}
