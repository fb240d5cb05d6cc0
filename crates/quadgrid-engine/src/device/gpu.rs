use anyhow::{Context, Result};
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::surface::{self, SurfaceErrorAction};
use super::GpuInit;

/// One acquired surface texture plus the encoder recording into it.
///
/// Holding a frame blocks acquisition of the next one; hand it to
/// [`Gpu::submit`] promptly.
pub struct GpuFrame {
    pub(crate) surface_texture: wgpu::SurfaceTexture,
    pub(crate) color_view: wgpu::TextureView,
    pub(crate) depth_view: wgpu::TextureView,
    pub(crate) encoder: wgpu::CommandEncoder,
}

/// Device, queue and configured surface for one window.
///
/// The depth target always matches the configured surface size.
pub struct Gpu<'w> {
    surface: wgpu::Surface<'w>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,
    /// Last size reported by the window; may be zero while minimized.
    size: PhysicalSize<u32>,
}

impl<'w> Gpu<'w> {
    /// Binds a surface to `window` and opens a device able to present to it.
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(surface::has_area(size), "window has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: init.backends,
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .with_context(|| format!("no GPU adapter for backends {:?}", init.backends))?;

        let info = adapter.get_info();
        log::info!("adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("quadgrid device"),
                required_features: init.required_features,
                required_limits: init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to open wgpu device")?;

        let config = surface::surface_config(&surface.get_capabilities(&adapter), size, &init)
            .context("surface reports no supported formats")?;
        surface.configure(&device, &config);
        let depth_view = surface::create_depth_view(&device, size);

        log::debug!(
            "surface {}x{} {:?}, {:?}",
            config.width,
            config.height,
            config.format,
            config.present_mode
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth_view,
            size,
        })
    }

    #[inline]
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Drawable size in physical pixels.
    #[inline]
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    #[inline]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[inline]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Tracks the new window size. The surface and depth target are rebuilt
    /// only for a non-zero size.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.size = new_size;
        if !surface::has_area(new_size) {
            return;
        }

        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = surface::create_depth_view(&self.device, new_size);
        log::debug!("resized to {}x{}", new_size.width, new_size.height);
    }

    /// Acquires the next surface texture and opens an encoder for it.
    pub fn begin_frame(&self) -> std::result::Result<GpuFrame, SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let color_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("quadgrid frame encoder"),
            });

        Ok(GpuFrame {
            surface_texture,
            color_view,
            depth_view: self.depth_view.clone(),
            encoder,
        })
    }

    /// Submits the frame's commands and presents its texture.
    pub fn submit(&self, frame: GpuFrame) {
        let GpuFrame {
            surface_texture,
            encoder,
            ..
        } = frame;
        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
    }

    /// Decides how to continue after `begin_frame` failed, reconfiguring a
    /// lost or outdated surface.
    pub fn handle_surface_error(&mut self, err: SurfaceError) -> SurfaceErrorAction {
        let action = SurfaceErrorAction::for_error(&err);
        if action == SurfaceErrorAction::Reconfigured && surface::has_area(self.size) {
            self.surface.configure(&self.device, &self.config);
        }
        action
    }
}
