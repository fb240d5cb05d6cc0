use winit::event::WindowEvent;

use crate::device::Gpu;
use crate::input::InputFrame;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Render loop state.
///
/// `Closing` is terminal: once entered, no further frame is rendered.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum LoopState {
    #[default]
    Running,
    Closing,
}

impl LoopState {
    /// Next state given this iteration's escape press and close request.
    pub fn advance(self, escape_pressed: bool, close_requested: bool) -> Self {
        match self {
            LoopState::Running if escape_pressed || close_requested => LoopState::Closing,
            state => state,
        }
    }

    #[inline]
    pub fn control(self) -> AppControl {
        match self {
            LoopState::Running => AppControl::Continue,
            LoopState::Closing => AppControl::Exit,
        }
    }
}

/// Application contract implemented by scenes.
pub trait App {
    /// Called once after the window and GPU context exist, before the first frame.
    ///
    /// An error here aborts the runtime.
    fn on_start(&mut self, gpu: &Gpu<'_>) -> anyhow::Result<()> {
        let _ = gpu;
        Ok(())
    }

    /// Called for window events.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Called after every keyboard or focus event with the edges gathered since
    /// the last rendered frame. Runs even while no frame is rendered.
    fn on_input(&mut self, input: &InputFrame) -> AppControl {
        let _ = input;
        AppControl::Continue
    }

    /// Called once per rendered frame.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;
}
