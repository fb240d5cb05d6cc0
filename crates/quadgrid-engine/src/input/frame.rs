use super::types::Key;

/// Key transitions seen since the last rendered frame.
///
/// A key appears at most once per list; auto-repeat never adds an entry.
#[derive(Debug, Default)]
pub struct InputFrame {
    pub pressed: Vec<Key>,
    pub released: Vec<Key>,
}

impl InputFrame {
    pub fn clear(&mut self) {
        self.pressed.clear();
        self.released.clear();
    }

    #[inline]
    pub fn pressed(&self, key: Key) -> bool {
        self.pressed.contains(&key)
    }

    #[inline]
    pub fn released(&self, key: Key) -> bool {
        self.released.contains(&key)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pressed.is_empty() && self.released.is_empty()
    }

    pub(crate) fn record(&mut self, key: Key, down: bool) {
        let list = if down { &mut self.pressed } else { &mut self.released };
        if !list.contains(&key) {
            list.push(key);
        }
    }
}
