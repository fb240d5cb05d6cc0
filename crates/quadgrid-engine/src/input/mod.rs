//! Keyboard and focus input, free of winit types.
//!
//! The runtime translates window events through `platform` and folds them
//! into [`InputState`]; scenes read edges from [`InputFrame`].

mod frame;
pub(crate) mod platform;
mod state;
mod types;

pub use frame::InputFrame;
pub use state::InputState;
pub use types::{InputEvent, Key, KeyState};
