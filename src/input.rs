use std::collections::HashSet;

use crate::camera::CameraMovement;
use crate::state::ProgramState;

/// Frame time is scaled by this factor before it drives camera translation.
pub const INPUT_TIME_SCALE: f32 = 2.0;
/// Look-direction nudge applied per frame while an arrow key is held.
pub const ARROW_LOOK_STEP: f32 = 3.0;

/// Keys the scene reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Space,
    LeftCtrl,
    Up,
    Down,
    Left,
    Right,
    Escape,
    F1,
}

/// One-shot reactions to a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Quit,
    ToggleOverlay,
}

impl Key {
    pub fn command(self) -> Option<KeyCommand> {
        match self {
            Key::Escape => Some(KeyCommand::Quit),
            Key::F1 => Some(KeyCommand::ToggleOverlay),
            _ => None,
        }
    }
}

/// Set of keys currently held down.
#[derive(Debug, Default, Clone)]
pub struct KeyboardState {
    held: HashSet<Key>,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key_down(&mut self, key: Key) {
        self.held.insert(key);
    }

    pub fn set_key_up(&mut self, key: Key) {
        self.held.remove(&key);
    }

    pub fn is_key_down(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn release_all(&mut self) {
        self.held.clear();
    }
}

const MOVEMENT_KEYS: [(Key, CameraMovement); 6] = [
    (Key::W, CameraMovement::Forward),
    (Key::S, CameraMovement::Backward),
    (Key::A, CameraMovement::Left),
    (Key::D, CameraMovement::Right),
    (Key::Space, CameraMovement::Up),
    (Key::LeftCtrl, CameraMovement::Down),
];

const LOOK_KEYS: [(Key, f32, f32); 4] = [
    (Key::Right, ARROW_LOOK_STEP, 0.0),
    (Key::Left, -ARROW_LOOK_STEP, 0.0),
    (Key::Up, 0.0, ARROW_LOOK_STEP),
    (Key::Down, 0.0, -ARROW_LOOK_STEP),
];

/// Applies held keys to the camera for one frame of `delta_time` seconds.
pub fn process_input(state: &mut ProgramState, keys: &KeyboardState, delta_time: f32) {
    let delta_time = delta_time * INPUT_TIME_SCALE;
    for (key, movement) in MOVEMENT_KEYS {
        if keys.is_key_down(key) {
            state.camera.process_keyboard(movement, delta_time);
        }
    }
    if state.camera_mouse_update_enabled {
        for (key, x_offset, y_offset) in LOOK_KEYS {
            if keys.is_key_down(key) {
                state.camera.process_mouse_movement(x_offset, y_offset);
            }
        }
    }
}

/// Applies relative pointer motion; `dy` grows downwards as on screen.
pub fn process_mouse_motion(state: &mut ProgramState, dx: f32, dy: f32) {
    if state.camera_mouse_update_enabled {
        state.camera.process_mouse_movement(dx, -dy);
    }
}

pub fn process_scroll(state: &mut ProgramState, lines: f32) {
    state.camera.process_mouse_scroll(lines);
}

/// Flips the overlay. Opening it frees the pointer for widgets; closing it
/// hands the pointer back to the camera. Returns the new visibility.
pub fn toggle_overlay(state: &mut ProgramState) -> bool {
    state.overlay_enabled = !state.overlay_enabled;
    state.camera_mouse_update_enabled = !state.overlay_enabled;
    state.overlay_enabled
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn movement_uses_doubled_delta_time() {
        let mut state = ProgramState::default();
        let start = state.camera.position;
        let mut keys = KeyboardState::new();
        keys.set_key_down(Key::W);
        process_input(&mut state, &keys, 0.1);
        let travelled = (state.camera.position - start).length();
        let expected = state.camera.movement_speed * 0.1 * INPUT_TIME_SCALE;
        assert!((travelled - expected).abs() < 1e-5);
    }

    #[test]
    fn arrow_keys_respect_mouse_update_flag() {
        let mut state = ProgramState::default();
        let mut keys = KeyboardState::new();
        keys.set_key_down(Key::Right);
        state.camera_mouse_update_enabled = false;
        process_input(&mut state, &keys, 0.016);
        assert_eq!(state.camera.yaw(), crate::camera::DEFAULT_YAW);

        state.camera_mouse_update_enabled = true;
        process_input(&mut state, &keys, 0.016);
        let expected =
            crate::camera::DEFAULT_YAW + ARROW_LOOK_STEP * state.camera.mouse_sensitivity;
        assert!((state.camera.yaw() - expected).abs() < 1e-5);
    }

    #[test]
    fn released_keys_stop_moving_the_camera() {
        let mut state = ProgramState::default();
        let mut keys = KeyboardState::new();
        keys.set_key_down(Key::Space);
        keys.set_key_up(Key::Space);
        process_input(&mut state, &keys, 1.0);
        assert_eq!(state.camera.position, Vec3::new(0.0, 0.0, 3.0));
    }

    #[test]
    fn mouse_motion_inverts_vertical_axis() {
        let mut state = ProgramState::default();
        process_mouse_motion(&mut state, 0.0, 10.0);
        assert!(state.camera.pitch() < 0.0);
    }

    #[test]
    fn toggling_overlay_swaps_pointer_ownership() {
        let mut state = ProgramState::default();
        assert!(toggle_overlay(&mut state));
        assert!(!state.camera_mouse_update_enabled);
        assert!(!toggle_overlay(&mut state));
        assert!(state.camera_mouse_update_enabled);
    }

    #[test]
    fn only_escape_and_f1_are_commands() {
        assert_eq!(Key::Escape.command(), Some(KeyCommand::Quit));
        assert_eq!(Key::F1.command(), Some(KeyCommand::ToggleOverlay));
        assert_eq!(Key::W.command(), None);
    }
}
