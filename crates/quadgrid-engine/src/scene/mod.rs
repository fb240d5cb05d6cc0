//! The quad and quad-grid scenes.
//!
//! A scene ties the pieces together: it links the shader program, generates the
//! grid once, computes the projection once, and drives [`GridRenderer`] from the
//! runtime's frame callback until Escape or a close request.

use anyhow::Result;
use glam::Mat4;
use winit::event::WindowEvent;

use crate::camera::{Projection, View};
use crate::core::{App, AppControl, FrameCtx, LoopState};
use crate::device::Gpu;
use crate::geometry::{GridGeometry, MeshUpload, QUAD_VERTICES};
use crate::input::{InputFrame, Key};
use crate::render::{GridFrame, GridRenderer, RenderCtx};
use crate::shader::{ShaderError, ShaderProgram, ShaderSources};

/// Everything a scene needs, passed by value at construction.
#[derive(Debug, Clone)]
pub struct SceneConfig {
    /// Grid side count; the scene draws `side²` quads.
    pub side: u32,
    /// Scale applied to the quad before it is moved to its grid position.
    pub instance_scale: f32,
    pub upload: MeshUpload,
    pub view: View,
    pub projection: Projection,
    pub clear_color: wgpu::Color,
    pub shaders: ShaderSources,
}

impl SceneConfig {
    /// Ten by ten grid of small quads seen through a perspective camera.
    pub fn grid() -> Self {
        Self {
            side: 10,
            instance_scale: 0.2,
            upload: MeshUpload::Shared,
            view: View::default(),
            projection: Projection::default(),
            clear_color: wgpu::Color {
                r: 0.2,
                g: 0.3,
                b: 0.3,
                a: 1.0,
            },
            shaders: ShaderSources::default(),
        }
    }

    /// One quad in clip space: identity projection, view and model.
    pub fn single_quad() -> Self {
        Self {
            side: 1,
            instance_scale: 1.0,
            view: View::Identity,
            projection: Projection::Identity,
            ..Self::grid()
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::grid()
    }
}

/// Scene rendering a grid of quads.
pub struct GridScene {
    geometry: GridGeometry,
    renderer: GridRenderer,
    projection: Mat4,
    view: View,
    instance_scale: f32,
    clear_color: wgpu::Color,
    state: LoopState,
    frames: u64,
}

impl GridScene {
    /// Links the shader program and generates the grid.
    ///
    /// Stage compile failures are logged as they happen; the returned error is
    /// the link result.
    pub fn new(config: SceneConfig) -> Result<Self, ShaderError> {
        let program = ShaderProgram::build(&config.shaders)?;
        let geometry = GridGeometry::generate(config.side, &QUAD_VERTICES);

        log::info!(
            "scene: {0}x{0} grid, {1} draw(s) per frame, {2:?} mesh upload",
            config.side,
            geometry.positions().len(),
            config.upload,
        );

        Ok(Self {
            geometry,
            renderer: GridRenderer::new(program, config.upload),
            projection: config.projection.matrix(),
            view: config.view,
            instance_scale: config.instance_scale,
            clear_color: config.clear_color,
            state: LoopState::Running,
            frames: 0,
        })
    }

    #[inline]
    pub fn state(&self) -> LoopState {
        self.state
    }

    #[inline]
    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    #[inline]
    pub fn projection(&self) -> Mat4 {
        self.projection
    }
}

impl App for GridScene {
    fn on_start(&mut self, gpu: &Gpu<'_>) -> Result<()> {
        let ctx = RenderCtx::from_gpu(gpu);
        self.renderer.prepare(&ctx, &self.geometry)
    }

    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let close_requested = matches!(event, WindowEvent::CloseRequested);
        self.state = self.state.advance(false, close_requested);
        self.state.control()
    }

    fn on_input(&mut self, input: &InputFrame) -> AppControl {
        let escape = input.pressed(Key::Escape);
        let next = self.state.advance(escape, false);
        if next != self.state {
            log::info!("escape pressed, closing");
        }
        self.state = next;
        self.state.control()
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if self.state == LoopState::Closing {
            return AppControl::Exit;
        }

        let frame = GridFrame {
            projection: self.projection,
            view: self.view.matrix(),
            geometry: &self.geometry,
            instance_scale: self.instance_scale,
        };

        let renderer = &mut self.renderer;
        let control = ctx.render(self.clear_color, |rctx, target| {
            let draws = renderer.render(rctx, target, &frame);
            debug_assert_eq!(draws, frame.geometry.positions().len());
        });

        self.frames += 1;
        control
    }
}

impl Drop for GridScene {
    fn drop(&mut self) {
        log::debug!("scene dropped after {} frame(s)", self.frames);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn grid_preset_builds() {
        let scene = GridScene::new(SceneConfig::grid()).unwrap();
        assert_eq!(scene.geometry().positions().len(), 100);
        assert_eq!(scene.state(), LoopState::Running);
        assert_eq!(scene.projection(), Projection::default().matrix());
    }

    #[test]
    fn single_quad_preset_is_identity() {
        let scene = GridScene::new(SceneConfig::single_quad()).unwrap();
        assert_eq!(scene.geometry().positions(), &[Vec3::ZERO]);
        assert_eq!(scene.projection(), Mat4::IDENTITY);
    }

    #[test]
    fn bad_shader_fails_construction() {
        let mut config = SceneConfig::grid();
        config.shaders.vertex = "#version 450\nvoid main() {".to_string();
        assert!(GridScene::new(config).is_err());
    }

    #[test]
    fn close_request_moves_to_closing() {
        let mut scene = GridScene::new(SceneConfig::single_quad()).unwrap();
        assert_eq!(scene.on_window_event(&WindowEvent::CloseRequested), AppControl::Exit);
        assert_eq!(scene.state(), LoopState::Closing);
    }

    #[test]
    fn escape_edge_closes_without_a_frame() {
        let mut scene = GridScene::new(SceneConfig::single_quad()).unwrap();
        let mut input = InputFrame::default();
        input.pressed.push(Key::Escape);

        assert_eq!(scene.on_input(&input), AppControl::Exit);
        assert_eq!(scene.state(), LoopState::Closing);
    }

    #[test]
    fn other_keys_keep_running() {
        let mut scene = GridScene::new(SceneConfig::single_quad()).unwrap();
        let mut input = InputFrame::default();
        input.pressed.push(Key::Other(42));

        assert_eq!(scene.on_input(&input), AppControl::Continue);
        assert_eq!(scene.state(), LoopState::Running);
    }

    #[test]
    fn other_window_events_keep_running() {
        let mut scene = GridScene::new(SceneConfig::single_quad()).unwrap();
        assert_eq!(scene.on_window_event(&WindowEvent::Focused(true)), AppControl::Continue);
        assert_eq!(scene.state(), LoopState::Running);
    }
}
