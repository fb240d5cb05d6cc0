use ::winit::event::{ElementState, WindowEvent};
use ::winit::keyboard::{KeyCode, PhysicalKey};

use crate::input::{InputEvent, Key, KeyState};

/// Translates a winit `WindowEvent` into an engine `InputEvent`.
///
/// Returns `None` for events not represented by the input subsystem.
pub(crate) fn translate_window_event(event: &WindowEvent) -> Option<InputEvent> {
    match event {
        WindowEvent::Focused(f) => Some(InputEvent::Focused(*f)),

        WindowEvent::KeyboardInput { event, .. } => {
            let state = match event.state {
                ElementState::Pressed => KeyState::Pressed,
                ElementState::Released => KeyState::Released,
            };

            Some(InputEvent::Key {
                key: map_key(event.physical_key),
                state,
                repeat: event.repeat,
            })
        }

        _ => None,
    }
}

fn map_key(pk: PhysicalKey) -> Key {
    match pk {
        PhysicalKey::Code(code) => match code {
            KeyCode::Escape => Key::Escape,
            other => Key::Other(other as u32),
        },
        // No stable numeric form for native codes.
        PhysicalKey::Unidentified(_) => Key::Other(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_maps_to_named_key() {
        assert_eq!(map_key(PhysicalKey::Code(KeyCode::Escape)), Key::Escape);
    }

    #[test]
    fn unnamed_keys_keep_their_code() {
        let k = map_key(PhysicalKey::Code(KeyCode::KeyQ));
        assert_eq!(k, Key::Other(KeyCode::KeyQ as u32));
    }

    #[test]
    fn focus_events_translate() {
        assert_eq!(
            translate_window_event(&WindowEvent::Focused(false)),
            Some(InputEvent::Focused(false))
        );
        assert_eq!(translate_window_event(&WindowEvent::CloseRequested), None);
    }
}
