use std::collections::HashSet;

use super::types::{InputEvent, Key, MouseButton};

/// Per-frame input deltas.
///
/// `InputState` provides the current state (held keys/buttons, pointer position).
/// `InputFrame` provides events and transition sets for the current frame.
#[derive(Debug, Default)]
pub struct InputFrame {
    /// Raw events in arrival order.
    pub events: Vec<InputEvent>,

    /// Keys that went down this frame.
    pub keys_pressed: HashSet<Key>,

    /// Keys that produced an OS key-repeat this frame while held.
    pub keys_repeated: HashSet<Key>,

    /// Keys released this frame.
    pub keys_released: HashSet<Key>,

    /// Mouse buttons pressed this frame.
    pub buttons_pressed: HashSet<MouseButton>,

    /// Mouse buttons released this frame.
    pub buttons_released: HashSet<MouseButton>,

    /// Sum of pointer movement this frame in logical pixels.
    ///
    /// Only movement between two known positions counts; entering the window
    /// does not produce a jump.
    pub pointer_delta: (f32, f32),
}

impl InputFrame {
    pub fn clear(&mut self) {
        self.events.clear();
        self.keys_pressed.clear();
        self.keys_repeated.clear();
        self.keys_released.clear();
        self.buttons_pressed.clear();
        self.buttons_released.clear();
        self.pointer_delta = (0.0, 0.0);
    }

    pub fn push_event(&mut self, ev: InputEvent) {
        self.events.push(ev);
    }

    /// Pressed or repeated this frame (movement-style keys).
    pub fn key_triggered(&self, key: Key) -> bool {
        self.keys_pressed.contains(&key) || self.keys_repeated.contains(&key)
    }
}
