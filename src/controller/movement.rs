use glam::Vec3;

use crate::config::MovementConfig;
use crate::controller::input::{InputProcessor, InputState};

/// Moves the character along the world axes at walk or run speed
#[derive(Clone, Copy, Debug)]
pub struct CharacterController {
    pub walk_speed: f32,
    pub run_speed: f32,
}

impl CharacterController {
    pub fn from_config(config: &MovementConfig) -> Self {
        Self {
            walk_speed: config.walk_speed,
            run_speed: config.run_speed,
        }
    }

    pub fn speed(&self, input: &InputState, processor: &InputProcessor) -> f32 {
        if processor.is_running(input) {
            self.run_speed
        } else {
            self.walk_speed
        }
    }

    /// Each held key moves its own axis; opposite keys cancel
    pub fn apply(&self, position: &mut Vec3, input: &InputState, processor: &InputProcessor, dt: f32) {
        let distance = self.speed(input, processor) * dt;
        if processor.is_moving_forward(input) {
            position.z -= distance;
        }
        if processor.is_moving_backward(input) {
            position.z += distance;
        }
        if processor.is_moving_left(input) {
            position.x -= distance;
        }
        if processor.is_moving_right(input) {
            position.x += distance;
        }
    }
}

impl Default for CharacterController {
    fn default() -> Self {
        Self::from_config(&MovementConfig::default())
    }
}
