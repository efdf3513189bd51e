use glam::Vec3;

use crate::config::CameraConfig;
use crate::controller::input::InputState;
use crate::model::Camera;

/// Keeps the polar angle this far from the poles
const POLE_MARGIN: f32 = 0.01;

/// Orbits the camera around its target: drag rotates, wheel zooms
#[derive(Clone, Copy, Debug)]
pub struct OrbitController {
    pub target: Vec3,
    pub radius: f32,
    /// Angle around the Y axis, measured from +Z
    pub azimuth: f32,
    /// Angle down from +Y
    pub polar: f32,
    pub rotate_sensitivity: f32,
    pub zoom_step: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl OrbitController {
    pub fn from_camera(camera: &Camera, config: &CameraConfig) -> Self {
        let offset = camera.eye - camera.target;
        let radius = offset.length().max(f32::EPSILON);
        Self {
            target: camera.target,
            radius,
            azimuth: offset.x.atan2(offset.z),
            polar: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            rotate_sensitivity: config.rotate_sensitivity,
            zoom_step: config.zoom_step,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
        }
    }

    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.azimuth -= dx * self.rotate_sensitivity;
        self.polar = (self.polar - dy * self.rotate_sensitivity)
            .clamp(POLE_MARGIN, std::f32::consts::PI - POLE_MARGIN);
    }

    /// Positive wheel deltas move away from the target
    pub fn zoom(&mut self, delta_y: f32) {
        let factor = 1.0 + self.zoom_step;
        if delta_y > 0.0 {
            self.radius *= factor;
        } else if delta_y < 0.0 {
            self.radius /= factor;
        }
        self.radius = self.radius.clamp(self.min_distance, self.max_distance);
    }

    pub fn eye(&self) -> Vec3 {
        let (sin_polar, cos_polar) = self.polar.sin_cos();
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        self.target + self.radius * Vec3::new(sin_polar * sin_az, cos_polar, sin_polar * cos_az)
    }

    pub fn apply(&self, camera: &mut Camera) {
        camera.target = self.target;
        camera.eye = self.eye();
    }

    /// Consume this frame's drag and wheel input and move the camera
    pub fn update(&mut self, input: &mut InputState, camera: &mut Camera) {
        let (dx, dy) = input.consume_drag();
        let wheel = input.consume_wheel();
        if dx == 0.0 && dy == 0.0 && wheel == 0.0 {
            return;
        }
        self.rotate(dx, dy);
        self.zoom(wheel);
        self.apply(camera);
    }
}
