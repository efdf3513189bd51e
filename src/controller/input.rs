/// Platform-agnostic input handling
use std::collections::HashSet;

/// Platform-independent input events. Keys are `KeyboardEvent.code` names
/// (`"KeyW"`, `"ShiftLeft"`, ...) on every platform.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyDown(String),
    KeyUp(String),

    MouseMove { dx: f32, dy: f32 },
    MouseButton { button: MouseButton, is_down: bool },
    MouseWheel { delta_y: f32 },

    FocusLost,
    VisibilityChanged { visible: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn from_web_button(button: i16) -> Self {
        match button {
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            _ => MouseButton::Left,
        }
    }
}

/// Held keys plus the mouse motion accumulated since the last frame
#[derive(Debug, Default)]
pub struct InputState {
    pub pressed_keys: HashSet<String>,
    pub dragging: bool,
    pub drag_delta: (f32, f32),
    pub wheel_delta: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_event(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyDown(code) => {
                self.pressed_keys.insert(code.clone());
            }
            InputEvent::KeyUp(code) => {
                self.pressed_keys.remove(code.as_str());
            }
            InputEvent::MouseMove { dx, dy } => {
                if self.dragging {
                    self.drag_delta.0 += dx;
                    self.drag_delta.1 += dy;
                }
            }
            InputEvent::MouseButton { button: MouseButton::Left, is_down } => {
                self.dragging = *is_down;
            }
            InputEvent::MouseButton { .. } => {}
            InputEvent::MouseWheel { delta_y } => {
                self.wheel_delta += delta_y;
            }
            InputEvent::FocusLost | InputEvent::VisibilityChanged { .. } => {
                self.clear_keys();
                self.dragging = false;
            }
        }
    }

    pub fn is_key_pressed(&self, code: &str) -> bool {
        self.pressed_keys.contains(code)
    }

    pub fn clear_keys(&mut self) {
        self.pressed_keys.clear();
    }

    pub fn consume_drag(&mut self) -> (f32, f32) {
        std::mem::take(&mut self.drag_delta)
    }

    pub fn consume_wheel(&mut self) -> f32 {
        std::mem::take(&mut self.wheel_delta)
    }
}

/// Key mapping configuration
#[derive(Clone, Debug)]
pub struct KeyBindings {
    pub forward: String,
    pub backward: String,
    pub left: String,
    pub right: String,
    pub run: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: "KeyW".to_string(),
            backward: "KeyS".to_string(),
            left: "KeyA".to_string(),
            right: "KeyD".to_string(),
            run: "ShiftLeft".to_string(),
        }
    }
}

/// Answers high-level questions about the held keys
#[derive(Clone, Debug, Default)]
pub struct InputProcessor {
    bindings: KeyBindings,
}

impl InputProcessor {
    pub fn new(bindings: KeyBindings) -> Self {
        Self { bindings }
    }

    pub fn is_moving_forward(&self, input: &InputState) -> bool {
        input.is_key_pressed(&self.bindings.forward)
    }

    pub fn is_moving_backward(&self, input: &InputState) -> bool {
        input.is_key_pressed(&self.bindings.backward)
    }

    pub fn is_moving_left(&self, input: &InputState) -> bool {
        input.is_key_pressed(&self.bindings.left)
    }

    pub fn is_moving_right(&self, input: &InputState) -> bool {
        input.is_key_pressed(&self.bindings.right)
    }

    pub fn is_running(&self, input: &InputState) -> bool {
        input.is_key_pressed(&self.bindings.run)
    }

    /// Any directional key held
    pub fn any_movement(&self, input: &InputState) -> bool {
        self.is_moving_forward(input)
            || self.is_moving_backward(input)
            || self.is_moving_left(input)
            || self.is_moving_right(input)
    }

    /// Keys whose browser default (scrolling) should be suppressed
    pub fn is_bound(&self, code: &str) -> bool {
        let b = &self.bindings;
        [&b.forward, &b.backward, &b.left, &b.right, &b.run]
            .iter()
            .any(|k| k.as_str() == code)
    }
}

#[cfg(target_arch = "wasm32")]
pub mod wasm {
    use super::*;
    use web_sys::{KeyboardEvent, MouseEvent, WheelEvent};

    pub fn keyboard_event_to_input(e: &KeyboardEvent, is_down: bool) -> InputEvent {
        let code = e.code();
        if is_down {
            InputEvent::KeyDown(code)
        } else {
            InputEvent::KeyUp(code)
        }
    }

    pub fn mouse_move_to_input(e: &MouseEvent) -> InputEvent {
        InputEvent::MouseMove {
            dx: e.movement_x() as f32,
            dy: e.movement_y() as f32,
        }
    }

    pub fn mouse_button_to_input(e: &MouseEvent, is_down: bool) -> InputEvent {
        InputEvent::MouseButton {
            button: MouseButton::from_web_button(e.button()),
            is_down,
        }
    }

    pub fn wheel_to_input(e: &WheelEvent) -> InputEvent {
        InputEvent::MouseWheel {
            delta_y: e.delta_y() as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_down(code: &str) -> InputEvent {
        InputEvent::KeyDown(code.to_string())
    }

    #[test]
    fn test_keys_are_held_until_released() {
        let mut input = InputState::new();
        input.process_event(&key_down("KeyW"));
        input.process_event(&key_down("ShiftLeft"));
        assert!(input.is_key_pressed("KeyW"));

        input.process_event(&InputEvent::KeyUp("KeyW".to_string()));
        assert!(!input.is_key_pressed("KeyW"));
        assert!(input.is_key_pressed("ShiftLeft"));
    }

    #[test]
    fn test_focus_loss_clears_keys() {
        let mut input = InputState::new();
        input.process_event(&key_down("KeyA"));
        input.process_event(&InputEvent::FocusLost);
        assert!(input.pressed_keys.is_empty());
    }

    #[test]
    fn test_drag_only_accumulates_while_button_down() {
        let mut input = InputState::new();
        input.process_event(&InputEvent::MouseMove { dx: 5.0, dy: 5.0 });
        assert_eq!(input.consume_drag(), (0.0, 0.0));

        input.process_event(&InputEvent::MouseButton {
            button: MouseButton::Left,
            is_down: true,
        });
        input.process_event(&InputEvent::MouseMove { dx: 3.0, dy: -1.0 });
        input.process_event(&InputEvent::MouseMove { dx: 2.0, dy: -1.0 });
        assert_eq!(input.consume_drag(), (5.0, -2.0));
        assert_eq!(input.consume_drag(), (0.0, 0.0), "drag is consumed once");
    }

    #[test]
    fn test_processor_uses_codes() {
        let processor = InputProcessor::default();
        let mut input = InputState::new();
        assert!(!processor.any_movement(&input));

        input.process_event(&key_down("KeyD"));
        assert!(processor.is_moving_right(&input));
        assert!(processor.any_movement(&input));

        input.process_event(&key_down("ShiftRight"));
        assert!(!processor.is_running(&input), "only the left shift runs");
        assert!(processor.is_bound("ShiftLeft"));
        assert!(!processor.is_bound("KeyQ"));
    }
}
