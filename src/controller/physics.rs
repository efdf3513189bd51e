use glam::Vec3;

use crate::config::PhysicsConfig;
use crate::controller::contact::{policy_from_config, ContactPolicy};
use crate::controller::transform_sync::sync_transforms;
use crate::error::PhysicsError;
use crate::model::{Binding, BodyId, BodyState, Pose, VisualProxy, World};

pub const FIXED_TIMESTEP: f32 = 1.0 / 60.0;
pub const MAX_SUB_STEPS: u32 = 3;

/// What the step driver needs from a physics engine
pub trait Simulation {
    /// Advance `elapsed` seconds in steps of `fixed_dt`, at most `max_sub_steps`
    /// of them. Returns the number of steps taken.
    fn step(&mut self, fixed_dt: f32, elapsed: f32, max_sub_steps: u32) -> u32;

    fn body_pose(&self, body: BodyId) -> Result<Pose, PhysicsError>;

    fn bodies(&self) -> Vec<BodyState>;

    fn gravity(&self) -> Vec3;

    fn set_gravity(&mut self, gravity: Vec3);
}

impl Simulation for World {
    fn step(&mut self, fixed_dt: f32, elapsed: f32, max_sub_steps: u32) -> u32 {
        World::step(self, fixed_dt, elapsed, max_sub_steps)
    }

    fn body_pose(&self, body: BodyId) -> Result<Pose, PhysicsError> {
        self.pose(body).ok_or(PhysicsError::UnknownBody(body))
    }

    fn bodies(&self) -> Vec<BodyState> {
        self.body_states()
    }

    fn gravity(&self) -> Vec3 {
        World::gravity(self)
    }

    fn set_gravity(&mut self, gravity: Vec3) {
        World::set_gravity(self, gravity)
    }
}

/// Outcome of one driver update
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepReport {
    pub steps: u32,
    pub contact: bool,
    pub gravity: Vec3,
}

/// Steps the world once per frame and points gravity up while the contact
/// policy reports a body on the ground, down otherwise
pub struct PhysicsStepDriver {
    policy: Box<dyn ContactPolicy>,
    fixed_timestep: f32,
    max_sub_steps: u32,
    gravity_magnitude: f32,
    last_contact: Option<bool>,
}

impl PhysicsStepDriver {
    pub fn new(policy: Box<dyn ContactPolicy>, gravity_magnitude: f32) -> Self {
        Self {
            policy,
            fixed_timestep: FIXED_TIMESTEP,
            max_sub_steps: MAX_SUB_STEPS,
            gravity_magnitude,
            last_contact: None,
        }
    }

    pub fn from_config(config: &PhysicsConfig, ground_height: f32) -> Self {
        Self {
            fixed_timestep: config.fixed_timestep,
            max_sub_steps: config.max_sub_steps,
            ..Self::new(policy_from_config(config, ground_height), config.gravity_magnitude)
        }
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    pub fn gravity_for(&self, contact: bool) -> Vec3 {
        if contact {
            Vec3::new(0.0, self.gravity_magnitude, 0.0)
        } else {
            Vec3::new(0.0, -self.gravity_magnitude, 0.0)
        }
    }

    /// Step, mirror poses into the proxies, then pick gravity for the next step
    pub fn update<S: Simulation + ?Sized>(
        &mut self,
        sim: &mut S,
        bindings: &[Binding],
        proxies: &mut [VisualProxy],
        dt: f32,
    ) -> Result<StepReport, PhysicsError> {
        let steps = sim.step(self.fixed_timestep, dt, self.max_sub_steps);
        sync_transforms(bindings, &*sim, proxies)?;

        let contact = self.policy.touching_ground(&sim.bodies());
        if self.last_contact != Some(contact) {
            tracing::debug!(contact, policy = self.policy.name(), "gravity direction changed");
            self.last_contact = Some(contact);
        }
        let gravity = self.gravity_for(contact);
        sim.set_gravity(gravity);

        Ok(StepReport { steps, contact, gravity })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::controller::contact::FrozenGravity;
    use crate::model::BodyShape;

    /// Records every call the driver makes
    #[derive(Default)]
    pub(crate) struct RecordingSimulation {
        pub steps: Vec<(f32, f32, u32)>,
        pub bodies: Vec<BodyState>,
        pub gravity: Vec3,
    }

    impl Simulation for RecordingSimulation {
        fn step(&mut self, fixed_dt: f32, elapsed: f32, max_sub_steps: u32) -> u32 {
            self.steps.push((fixed_dt, elapsed, max_sub_steps));
            1
        }

        fn body_pose(&self, body: BodyId) -> Result<Pose, PhysicsError> {
            self.bodies
                .iter()
                .find(|b| b.id == body)
                .map(|b| b.pose)
                .ok_or(PhysicsError::UnknownBody(body))
        }

        fn bodies(&self) -> Vec<BodyState> {
            self.bodies.clone()
        }

        fn gravity(&self) -> Vec3 {
            self.gravity
        }

        fn set_gravity(&mut self, gravity: Vec3) {
            self.gravity = gravity;
        }
    }

    fn resting_star() -> BodyState {
        BodyState {
            id: BodyId(0),
            shape: BodyShape::Sphere { radius: 25.0 },
            pose: Pose::from_position(Vec3::new(0.0, 25.0, 0.0)),
            linear_velocity: Vec3::ZERO,
            is_static: false,
            ground_contact: Some(true),
        }
    }

    #[test]
    fn test_step_arguments_are_fixed() {
        let mut sim = RecordingSimulation::default();
        let mut driver = PhysicsStepDriver::from_config(&PhysicsConfig::default(), 0.0);

        let deltas = [0.0, 0.001, 1.0 / 60.0, 0.05, 0.5, 10.0, 1000.0];
        for d in deltas {
            driver.update(&mut sim, &[], &mut [], d).unwrap();
        }

        assert_eq!(sim.steps.len(), deltas.len());
        for (call, d) in sim.steps.iter().zip(deltas) {
            assert_eq!(*call, (1.0 / 60.0, d, 3));
        }
    }

    #[test]
    fn test_gravity_flips_on_contact() {
        let mut sim = RecordingSimulation::default();
        let mut driver = PhysicsStepDriver::from_config(&PhysicsConfig::default(), 0.0);

        let report = driver.update(&mut sim, &[], &mut [], 0.016).unwrap();
        assert!(!report.contact);
        assert_eq!(sim.gravity, Vec3::new(0.0, -20.0, 0.0));

        sim.bodies.push(resting_star());
        let report = driver.update(&mut sim, &[], &mut [], 0.016).unwrap();
        assert!(report.contact);
        assert_eq!(sim.gravity, Vec3::new(0.0, 20.0, 0.0));
    }

    #[test]
    fn test_frozen_policy_keeps_gravity_down() {
        let mut sim = RecordingSimulation {
            bodies: vec![resting_star()],
            ..Default::default()
        };
        let mut driver = PhysicsStepDriver::new(Box::new(FrozenGravity), 20.0);
        driver.update(&mut sim, &[], &mut [], 0.016).unwrap();
        assert_eq!(sim.gravity, Vec3::new(0.0, -20.0, 0.0));
    }

    #[test]
    fn test_unknown_body_fails_the_update() {
        let mut sim = RecordingSimulation::default();
        let mut driver = PhysicsStepDriver::from_config(&PhysicsConfig::default(), 0.0);
        let bindings = [Binding {
            proxy: crate::model::ProxyId(0),
            body: BodyId(7),
        }];
        let mut proxies = [VisualProxy {
            pose: Pose::IDENTITY,
            radius: 1.0,
            color: [1.0; 4],
        }];
        let err = driver.update(&mut sim, &bindings, &mut proxies, 0.016).unwrap_err();
        assert_eq!(err, PhysicsError::UnknownBody(BodyId(7)));
    }
}
