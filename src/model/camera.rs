use glam::{Mat4, Vec3};

use crate::config::CameraConfig;

pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_config(&CameraConfig::default(), width, height)
    }

    pub fn from_config(config: &CameraConfig, width: u32, height: u32) -> Self {
        let mut camera = Self {
            eye: config.eye,
            target: config.target,
            up: Vec3::Y,
            fov_y: config.fov_y_degrees.to_radians(),
            aspect: 1.0,
            z_near: config.z_near,
            z_far: config.z_far,
        };
        camera.set_aspect(width, height);
        camera
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye).normalize_or_zero()
    }

    /// Aspect is exactly `width / height`; a zero height keeps the old value
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.projection() * self.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_tracks_viewport() {
        let mut camera = Camera::new(800, 600);
        assert_eq!(camera.aspect, 800.0 / 600.0);
        camera.set_aspect(1920, 1080);
        assert_eq!(camera.aspect, 1920.0 / 1080.0);
        camera.set_aspect(1920, 0);
        assert_eq!(camera.aspect, 1920.0 / 1080.0, "zero height must be ignored");
    }

    #[test]
    fn test_target_projects_to_screen_centre() {
        let camera = Camera::new(800, 600);
        let clip = camera.view_proj() * camera.target.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
