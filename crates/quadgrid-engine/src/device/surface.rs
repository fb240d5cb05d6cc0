use winit::dpi::PhysicalSize;

use super::GpuInit;

/// Format of the depth target kept next to the surface.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// What the frame loop should do after failing to acquire a surface texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// The surface was configured again; the next frame can proceed.
    Reconfigured,
    SkipFrame,
    /// Out of memory. Stop rendering.
    Fatal,
}

impl SurfaceErrorAction {
    #[inline]
    pub fn is_fatal(self) -> bool {
        self == SurfaceErrorAction::Fatal
    }

    pub(crate) fn for_error(err: &wgpu::SurfaceError) -> Self {
        match err {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => Self::Reconfigured,
            wgpu::SurfaceError::OutOfMemory => Self::Fatal,
            wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => Self::SkipFrame,
        }
    }
}

/// Builds the swapchain configuration for `size` from the surface's
/// capabilities. `None` when the surface reports no formats.
pub(crate) fn surface_config(
    caps: &wgpu::SurfaceCapabilities,
    size: PhysicalSize<u32>,
    init: &GpuInit,
) -> Option<wgpu::SurfaceConfiguration> {
    let srgb = [
        wgpu::TextureFormat::Bgra8UnormSrgb,
        wgpu::TextureFormat::Rgba8UnormSrgb,
    ];
    let format = srgb
        .into_iter()
        .filter(|_| init.prefer_srgb)
        .find(|f| caps.formats.contains(f))
        .or_else(|| caps.formats.first().copied())?;

    let alpha_mode = init
        .alpha_mode
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto);

    Some(wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: init.present_mode,
        alpha_mode,
        view_formats: vec![],
        desired_maximum_frame_latency: init.desired_maximum_frame_latency,
    })
}

pub(crate) fn create_depth_view(
    device: &wgpu::Device,
    size: PhysicalSize<u32>,
) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("quadgrid depth target"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

#[inline]
pub(crate) fn has_area(size: PhysicalSize<u32>) -> bool {
    size.width > 0 && size.height > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(formats: &[wgpu::TextureFormat]) -> wgpu::SurfaceCapabilities {
        wgpu::SurfaceCapabilities {
            formats: formats.to_vec(),
            present_modes: vec![wgpu::PresentMode::Fifo],
            alpha_modes: vec![wgpu::CompositeAlphaMode::Opaque],
            usages: wgpu::TextureUsages::RENDER_ATTACHMENT,
        }
    }

    #[test]
    fn srgb_format_preferred_when_available() {
        let caps = caps(&[
            wgpu::TextureFormat::Bgra8Unorm,
            wgpu::TextureFormat::Bgra8UnormSrgb,
        ]);
        let size = PhysicalSize::new(800, 600);
        let config = surface_config(&caps, size, &GpuInit::default()).unwrap();
        assert_eq!(config.format, wgpu::TextureFormat::Bgra8UnormSrgb);
        assert_eq!((config.width, config.height), (800, 600));
    }

    #[test]
    fn first_format_used_without_srgb_preference() {
        let caps = caps(&[
            wgpu::TextureFormat::Bgra8Unorm,
            wgpu::TextureFormat::Bgra8UnormSrgb,
        ]);
        let init = GpuInit {
            prefer_srgb: false,
            ..GpuInit::default()
        };
        let config = surface_config(&caps, PhysicalSize::new(1, 1), &init).unwrap();
        assert_eq!(config.format, wgpu::TextureFormat::Bgra8Unorm);
    }

    #[test]
    fn unsupported_alpha_mode_falls_back() {
        let caps = caps(&[wgpu::TextureFormat::Rgba8Unorm]);
        let init = GpuInit {
            alpha_mode: Some(wgpu::CompositeAlphaMode::PreMultiplied),
            ..GpuInit::default()
        };
        let config = surface_config(&caps, PhysicalSize::new(4, 4), &init).unwrap();
        assert_eq!(config.alpha_mode, wgpu::CompositeAlphaMode::Opaque);
    }

    #[test]
    fn no_formats_no_config() {
        assert!(surface_config(&caps(&[]), PhysicalSize::new(4, 4), &GpuInit::default()).is_none());
    }

    #[test]
    fn error_actions() {
        assert_eq!(
            SurfaceErrorAction::for_error(&wgpu::SurfaceError::Outdated),
            SurfaceErrorAction::Reconfigured
        );
        assert!(SurfaceErrorAction::for_error(&wgpu::SurfaceError::OutOfMemory).is_fatal());
        assert_eq!(
            SurfaceErrorAction::for_error(&wgpu::SurfaceError::Timeout),
            SurfaceErrorAction::SkipFrame
        );
    }
}
