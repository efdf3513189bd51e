use crate::config::{ContactPolicyKind, PhysicsConfig};
use crate::model::BodyState;

/// Decides whether any body counts as touching the ground this step
pub trait ContactPolicy {
    fn touching_ground(&self, bodies: &[BodyState]) -> bool;

    fn name(&self) -> &'static str;
}

/// A dynamic body is touching when it rests on the ground: its lowest point
/// is within `epsilon` of the ground (or below it), it moves no faster than
/// `rest_speed`, and the engine's own contact report agrees when it has one.
#[derive(Clone, Copy, Debug)]
pub struct RestingContact {
    pub ground_height: f32,
    pub epsilon: f32,
    pub rest_speed: f32,
}

impl RestingContact {
    pub fn is_resting(&self, body: &BodyState) -> bool {
        if body.is_static {
            return false;
        }
        let Some(lowest) = body.lowest_point() else {
            return false;
        };
        if lowest - self.ground_height > self.epsilon {
            return false;
        }
        // Bodies bouncing through the contact band are still fast
        if body.linear_velocity.length() > self.rest_speed {
            return false;
        }
        body.ground_contact.unwrap_or(true)
    }
}

impl ContactPolicy for RestingContact {
    fn touching_ground(&self, bodies: &[BodyState]) -> bool {
        bodies.iter().any(|b| self.is_resting(b))
    }

    fn name(&self) -> &'static str {
        ContactPolicyKind::Resting.label()
    }
}

/// Never reports contact, so gravity keeps pointing down
#[derive(Clone, Copy, Debug, Default)]
pub struct FrozenGravity;

impl ContactPolicy for FrozenGravity {
    fn touching_ground(&self, _bodies: &[BodyState]) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        ContactPolicyKind::Frozen.label()
    }
}

pub fn policy_from_config(config: &PhysicsConfig, ground_height: f32) -> Box<dyn ContactPolicy> {
    match config.contact_policy {
        ContactPolicyKind::Resting => Box::new(RestingContact {
            ground_height,
            epsilon: config.contact_epsilon,
            rest_speed: config.rest_speed,
        }),
        ContactPolicyKind::Frozen => Box::new(FrozenGravity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BodyId, BodyShape, Pose};
    use glam::Vec3;

    fn sphere(y: f32, velocity: Vec3, ground_contact: Option<bool>) -> BodyState {
        BodyState {
            id: BodyId(1),
            shape: BodyShape::Sphere { radius: 25.0 },
            pose: Pose::from_position(Vec3::new(0.0, y, 0.0)),
            linear_velocity: velocity,
            is_static: false,
            ground_contact,
        }
    }

    fn ground() -> BodyState {
        BodyState {
            id: BodyId(0),
            shape: BodyShape::Plane,
            pose: Pose::IDENTITY,
            linear_velocity: Vec3::ZERO,
            is_static: true,
            ground_contact: None,
        }
    }

    fn policy() -> RestingContact {
        RestingContact {
            ground_height: 0.0,
            epsilon: 0.5,
            rest_speed: 1.0,
        }
    }

    #[test]
    fn test_resting_body_touches() {
        let bodies = [ground(), sphere(25.2, Vec3::ZERO, Some(true))];
        assert!(policy().touching_ground(&bodies));
    }

    #[test]
    fn test_penetrating_body_touches() {
        let bodies = [sphere(24.9, Vec3::new(0.0, 0.1, 0.0), None)];
        assert!(policy().touching_ground(&bodies));
    }

    #[test]
    fn test_bodies_above_epsilon_do_not_touch() {
        let bodies = [ground(), sphere(25.6, Vec3::ZERO, Some(false)), sphere(300.0, Vec3::ZERO, None)];
        assert!(!policy().touching_ground(&bodies));
    }

    #[test]
    fn test_bouncing_body_does_not_touch() {
        let bodies = [sphere(25.1, Vec3::new(0.0, -12.0, 0.0), Some(true))];
        assert!(!policy().touching_ground(&bodies), "fast bodies are passing through, not resting");
    }

    #[test]
    fn test_engine_report_is_respected() {
        let bodies = [sphere(25.1, Vec3::ZERO, Some(false))];
        assert!(!policy().touching_ground(&bodies));
    }

    #[test]
    fn test_static_and_empty_sets() {
        assert!(!policy().touching_ground(&[]));
        assert!(!policy().touching_ground(&[ground()]));
    }

    #[test]
    fn test_frozen_never_touches() {
        let bodies = [sphere(25.0, Vec3::ZERO, Some(true))];
        assert!(!FrozenGravity.touching_ground(&bodies));
    }

    #[test]
    fn test_policy_from_config() {
        let mut config = PhysicsConfig::default();
        assert_eq!(policy_from_config(&config, 0.0).name(), "resting");
        config.contact_policy = ContactPolicyKind::Frozen;
        assert_eq!(policy_from_config(&config, 0.0).name(), "frozen");
    }
}
