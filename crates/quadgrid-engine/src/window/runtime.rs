use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App, AppControl, FrameCtx, WindowCtx};
use crate::device::{Gpu, GpuInit};
use crate::input::{platform, InputFrame, InputState};

/// Title and size of the one window the runtime opens.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub resizable: bool,
}

impl RuntimeConfig {
    pub fn new(title: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            title: title.into(),
            initial_size: LogicalSize::new(width, height),
            resizable: true,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new("quadgrid", 1024.0, 768.0)
    }
}

/// Drives one window and one [`App`] on the winit event loop.
pub struct Runtime;

impl Runtime {
    /// Opens the window, runs `app` until it exits, then releases the window and
    /// every GPU resource.
    ///
    /// Fails when the event loop, the window, the GPU context or
    /// [`App::on_start`] fails.
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: App + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create event loop")?;
        let mut driver = Driver {
            config,
            gpu_init,
            app,
            surfaced: None,
            started: false,
            exiting: false,
            failure: None,
        };

        event_loop
            .run_app(&mut driver)
            .context("event loop terminated with error")?;

        if let Some(err) = driver.failure.take() {
            return Err(err);
        }
        log::info!("shut down cleanly");
        Ok(())
    }
}

/// Window plus everything that borrows it.
#[self_referencing]
struct Surfaced {
    input_state: InputState,
    input_frame: InputFrame,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct Driver<A: App + 'static> {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,

    /// Dropping this releases the surface, device and depth target.
    surfaced: Option<Surfaced>,
    started: bool,
    exiting: bool,
    failure: Option<anyhow::Error>,
}

impl<A: App + 'static> Driver<A> {
    fn open(&self, event_loop: &ActiveEventLoop) -> Result<Surfaced> {
        let window = event_loop
            .create_window(
                Window::default_attributes()
                    .with_title(self.config.title.clone())
                    .with_inner_size(self.config.initial_size)
                    .with_resizable(self.config.resizable),
            )
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        SurfacedTryBuilder {
            input_state: InputState::default(),
            input_frame: InputFrame::default(),
            window,
            gpu_builder: |w| {
                pollster::block_on(Gpu::new(w, gpu_init)).context("GPU initialization failed")
            },
        }
        .try_build()
    }

    fn close(&mut self, event_loop: &ActiveEventLoop) {
        if self.surfaced.take().is_some() {
            log::debug!("window closed, GPU resources released");
        }
        self.exiting = true;
        event_loop.exit();
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.failure = Some(err);
        self.close(event_loop);
    }

    /// Runs one frame of the app. Input edges are consumed either way; the app
    /// has already seen them through `on_input`.
    fn redraw(&mut self) -> AppControl {
        let app = &mut self.app;
        let Some(surfaced) = self.surfaced.as_mut() else {
            return AppControl::Continue;
        };

        surfaced.with_mut(|fields| {
            let size = fields.gpu.size();
            let control = if size.width == 0 || size.height == 0 {
                // Minimized.
                AppControl::Continue
            } else {
                let mut ctx = FrameCtx {
                    window: WindowCtx {
                        window: fields.window,
                    },
                    gpu: fields.gpu,
                    input: fields.input_state,
                    input_frame: fields.input_frame,
                };
                app.on_frame(&mut ctx)
            };
            fields.input_frame.clear();
            control
        })
    }
}

impl<A: App + 'static> ApplicationHandler for Driver<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.surfaced.is_some() || self.exiting {
            return;
        }

        let surfaced = match self.open(event_loop) {
            Ok(s) => s,
            Err(err) => return self.fail(event_loop, err),
        };

        if !self.started {
            if let Err(err) = surfaced.with_gpu(|gpu| self.app.on_start(gpu)) {
                return self.fail(event_loop, err.context("scene failed to start"));
            }
            self.started = true;
        }

        surfaced.with_window(|w| w.request_redraw());
        self.surfaced = Some(surfaced);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exiting {
            event_loop.exit();
            return;
        }
        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw: one frame per loop iteration.
        if let Some(surfaced) = &self.surfaced {
            surfaced.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if self.exiting {
            event_loop.exit();
            return;
        }
        let Some(surfaced) = self.surfaced.as_mut() else {
            return;
        };

        if let Some(ev) = platform::translate_window_event(&event) {
            surfaced.with_mut(|fields| fields.input_state.apply_event(fields.input_frame, ev));
            if surfaced.with_input_frame(|frame| self.app.on_input(frame)) == AppControl::Exit {
                self.close(event_loop);
                return;
            }
        }

        match &event {
            WindowEvent::Resized(size) => {
                surfaced.with_gpu_mut(|gpu| gpu.resize(*size));
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                let size = surfaced.with_window(|w| w.inner_size());
                surfaced.with_gpu_mut(|gpu| gpu.resize(size));
            }
            _ => {}
        }

        let control = match &event {
            WindowEvent::RedrawRequested => self.redraw(),
            WindowEvent::CloseRequested => {
                self.app.on_window_event(&event);
                AppControl::Exit
            }
            other => self.app.on_window_event(other),
        };

        if control == AppControl::Exit {
            self.close(event_loop);
        }
    }
}
