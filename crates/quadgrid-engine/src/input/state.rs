use std::collections::HashSet;

use super::frame::InputFrame;
use super::types::{InputEvent, Key, KeyState};

/// Held keys and focus for the window.
#[derive(Debug, Default)]
pub struct InputState {
    pub focused: bool,
    held: HashSet<Key>,
}

impl InputState {
    /// Folds `ev` into the held set, recording press/release edges in `frame`.
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match ev {
            InputEvent::Focused(focused) => {
                self.focused = focused;
                // Releases are not delivered while unfocused.
                if !focused {
                    self.held.clear();
                }
            }
            InputEvent::Key { key, state, repeat } => {
                let edge = match state {
                    KeyState::Pressed => self.held.insert(key),
                    KeyState::Released => self.held.remove(&key),
                };
                if edge && !repeat {
                    frame.record(key, state == KeyState::Pressed);
                }
            }
        }
    }

    #[inline]
    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(key: Key, state: KeyState, repeat: bool) -> InputEvent {
        InputEvent::Key { key, state, repeat }
    }

    #[test]
    fn escape_press_is_one_edge() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, key(Key::Escape, KeyState::Pressed, false));
        state.apply_event(&mut frame, key(Key::Escape, KeyState::Pressed, true));

        assert!(state.is_held(Key::Escape));
        assert!(frame.pressed(Key::Escape));
        assert_eq!(frame.pressed, vec![Key::Escape]);
    }

    #[test]
    fn release_of_unheld_key_is_ignored() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, key(Key::Other(7), KeyState::Released, false));

        assert!(frame.is_empty());
    }

    #[test]
    fn press_then_release_in_one_frame() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, key(Key::Escape, KeyState::Pressed, false));
        state.apply_event(&mut frame, key(Key::Escape, KeyState::Released, false));

        assert!(frame.pressed(Key::Escape));
        assert!(frame.released(Key::Escape));
        assert!(!state.is_held(Key::Escape));
    }

    #[test]
    fn focus_loss_drops_held_keys() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, InputEvent::Focused(true));
        state.apply_event(&mut frame, key(Key::Other(1), KeyState::Pressed, false));
        state.apply_event(&mut frame, InputEvent::Focused(false));

        assert!(!state.focused);
        assert!(!state.is_held(Key::Other(1)));
    }

    #[test]
    fn clear_forgets_edges_not_held_keys() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, key(Key::Escape, KeyState::Pressed, false));
        frame.clear();

        assert!(!frame.pressed(Key::Escape));
        assert!(state.is_held(Key::Escape));
    }
}
