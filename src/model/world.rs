use glam::{Quat, Vec3};
use rapier3d::prelude::*;

use super::body::{BodyId, BodyShape, BodyState, Pose};
use super::materials::{MaterialId, MaterialTable};

/// Description of a body to add to the world
#[derive(Clone, Debug)]
pub struct BodyDesc {
    pub shape: BodyShape,
    /// Zero mass makes the body static
    pub mass: f32,
    pub position: Vec3,
    pub material: MaterialId,
}

struct BodyEntry {
    handle: RigidBodyHandle,
    collider: ColliderHandle,
    shape: BodyShape,
}

/// Rigid-body world backed by rapier.
///
/// Bodies are addressed by [`BodyId`] in insertion order. Stepping follows a
/// fixed-timestep accumulator: elapsed time is banked and consumed in whole
/// fixed steps, at most `max_sub_steps` per call, and whatever exceeds that
/// is dropped.
pub struct World {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,

    materials: MaterialTable,
    bodies: Vec<BodyEntry>,
    ground: Option<(ColliderHandle, MaterialId)>,
    ground_height: f32,
    accumulator: f32,
    steps_taken: u64,
}

fn to_vec3(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn to_quat(r: &Rotation<Real>) -> Quat {
    Quat::from_xyzw(r.i, r.j, r.k, r.w)
}

impl World {
    pub fn new(gravity: Vec3, materials: MaterialTable) -> Self {
        Self {
            gravity: vector![gravity.x, gravity.y, gravity.z],
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            materials,
            bodies: Vec::new(),
            ground: None,
            ground_height: 0.0,
            accumulator: 0.0,
            steps_taken: 0,
        }
    }

    pub fn materials(&self) -> &MaterialTable {
        &self.materials
    }

    /// Add a body; the first plane added becomes the ground.
    ///
    /// Dynamic colliders carry the coefficients of their material's rule
    /// against the ground, the ground itself carries zeros combined with
    /// `Max`, so every ground contact uses exactly the pair rule.
    pub fn add_body(&mut self, desc: BodyDesc) -> BodyId {
        let translation = vector![desc.position.x, desc.position.y, desc.position.z];
        let is_static = desc.mass <= 0.0 || matches!(desc.shape, BodyShape::Plane);

        let body = if is_static {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic()
        }
        .translation(translation)
        .build();
        let handle = self.rigid_body_set.insert(body);

        let collider = match desc.shape {
            BodyShape::Plane => ColliderBuilder::halfspace(Vector::y_axis())
                .friction(0.0)
                .restitution(0.0)
                .friction_combine_rule(CoefficientCombineRule::Max)
                .restitution_combine_rule(CoefficientCombineRule::Max)
                .build(),
            BodyShape::Sphere { radius } => {
                let ground_material = self
                    .ground
                    .as_ref()
                    .map(|(_, m)| m.clone())
                    .unwrap_or_else(MaterialId::ground);
                let rule = self.materials.resolve(&desc.material, &ground_material);
                let builder = ColliderBuilder::ball(radius)
                    .friction(rule.friction)
                    .restitution(rule.restitution);
                if is_static {
                    builder.build()
                } else {
                    builder.mass(desc.mass).build()
                }
            }
        };
        let collider = self
            .collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);

        if matches!(desc.shape, BodyShape::Plane) && self.ground.is_none() {
            self.ground = Some((collider, desc.material.clone()));
            self.ground_height = desc.position.y;
        }

        let id = BodyId(self.bodies.len() as u32);
        self.bodies.push(BodyEntry {
            handle,
            collider,
            shape: desc.shape,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Height of the ground plane, zero when there is none
    pub fn ground_height(&self) -> f32 {
        self.ground_height
    }

    pub fn gravity(&self) -> Vec3 {
        to_vec3(&self.gravity)
    }

    /// Replace gravity; sleeping bodies are woken when it changes so they
    /// react to the new direction
    pub fn set_gravity(&mut self, gravity: Vec3) {
        if self.gravity() == gravity {
            return;
        }
        self.gravity = vector![gravity.x, gravity.y, gravity.z];
        for (_, body) in self.rigid_body_set.iter_mut() {
            if body.is_dynamic() {
                body.wake_up(true);
            }
        }
    }

    /// Total fixed steps simulated since creation
    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    /// Banked time not yet consumed by a fixed step
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Advance by `elapsed` seconds in fixed steps of `fixed_dt`, taking at
    /// most `max_sub_steps` steps. Returns the number of steps taken.
    pub fn step(&mut self, fixed_dt: f32, elapsed: f32, max_sub_steps: u32) -> u32 {
        if fixed_dt <= 0.0 {
            return 0;
        }
        self.integration_parameters.dt = fixed_dt;
        self.accumulator += elapsed.max(0.0);

        let mut taken = 0;
        while self.accumulator >= fixed_dt && taken < max_sub_steps {
            self.internal_step();
            self.accumulator -= fixed_dt;
            taken += 1;
        }
        self.accumulator %= fixed_dt;
        self.steps_taken += taken as u64;
        taken
    }

    fn internal_step(&mut self) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    pub fn pose(&self, id: BodyId) -> Option<Pose> {
        let entry = self.bodies.get(id.0 as usize)?;
        let body = self.rigid_body_set.get(entry.handle)?;
        Some(Pose {
            position: to_vec3(body.translation()),
            orientation: to_quat(body.rotation()),
        })
    }

    /// Overwrite a body's linear velocity (dynamic bodies only)
    pub fn set_linear_velocity(&mut self, id: BodyId, velocity: Vec3) {
        let Some(entry) = self.bodies.get(id.0 as usize) else {
            return;
        };
        if let Some(body) = self.rigid_body_set.get_mut(entry.handle) {
            if body.is_dynamic() {
                body.set_linvel(vector![velocity.x, velocity.y, velocity.z], true);
            }
        }
    }

    fn touches_ground(&self, entry: &BodyEntry) -> Option<bool> {
        let (ground, _) = self.ground.as_ref()?;
        if *ground == entry.collider {
            return None;
        }
        let touching = self
            .narrow_phase
            .contact_pair(*ground, entry.collider)
            .map(|pair| pair.has_any_active_contact)
            .unwrap_or(false);
        Some(touching)
    }

    pub fn body_state(&self, id: BodyId) -> Option<BodyState> {
        let entry = self.bodies.get(id.0 as usize)?;
        let body = self.rigid_body_set.get(entry.handle)?;
        Some(BodyState {
            id,
            shape: entry.shape,
            pose: Pose {
                position: to_vec3(body.translation()),
                orientation: to_quat(body.rotation()),
            },
            linear_velocity: to_vec3(body.linvel()),
            is_static: !body.is_dynamic(),
            ground_contact: self.touches_ground(entry),
        })
    }

    pub fn body_states(&self) -> Vec<BodyState> {
        (0..self.bodies.len() as u32)
            .filter_map(|i| self.body_state(BodyId(i)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::materials::ContactMaterial;

    fn world_with_ground(restitution: f32) -> (World, BodyId) {
        let mut materials = MaterialTable::new();
        materials.add(
            &MaterialId::ground(),
            &MaterialId::star(),
            ContactMaterial { friction: 0.4, restitution },
        );
        let mut world = World::new(Vec3::new(0.0, -20.0, 0.0), materials);
        let ground = world.add_body(BodyDesc {
            shape: BodyShape::Plane,
            mass: 0.0,
            position: Vec3::ZERO,
            material: MaterialId::ground(),
        });
        (world, ground)
    }

    fn add_star(world: &mut World, y: f32) -> BodyId {
        world.add_body(BodyDesc {
            shape: BodyShape::Sphere { radius: 1.0 },
            mass: 1.0,
            position: Vec3::new(0.0, y, 0.0),
            material: MaterialId::star(),
        })
    }

    #[test]
    fn test_step_clamps_large_deltas() {
        let (mut world, _) = world_with_ground(0.9);
        let dt = 1.0 / 60.0;

        let taken = world.step(dt, 10.0, 3);
        assert_eq!(taken, 3, "at most max_sub_steps steps per call");
        assert!(world.accumulator() < dt, "excess time must be dropped");

        let taken = world.step(dt, 0.0, 3);
        assert_eq!(taken, 0, "no banked time after a clamped call");
        assert_eq!(world.steps_taken(), 3);
    }

    #[test]
    fn test_step_banks_partial_time() {
        let (mut world, _) = world_with_ground(0.9);
        let dt = 0.25;

        assert_eq!(world.step(dt, 0.125, 3), 0);
        assert_eq!(world.accumulator(), 0.125);
        assert_eq!(world.step(dt, 0.125, 3), 1);
        assert_eq!(world.accumulator(), 0.0);
    }

    #[test]
    fn test_falling_body_accelerates_downwards() {
        let (mut world, _) = world_with_ground(0.9);
        let star = add_star(&mut world, 100.0);
        for _ in 0..30 {
            world.step(1.0 / 60.0, 1.0 / 60.0, 3);
        }
        let state = world.body_state(star).unwrap();
        assert!(state.pose.position.y < 100.0);
        assert!(state.linear_velocity.y < 0.0);
        assert_eq!(state.ground_contact, Some(false));
    }

    #[test]
    fn test_resting_body_reports_ground_contact() {
        let (mut world, ground) = world_with_ground(0.0);
        let star = add_star(&mut world, 1.05);
        for _ in 0..180 {
            world.step(1.0 / 60.0, 1.0 / 60.0, 3);
        }
        let state = world.body_state(star).unwrap();
        assert_eq!(state.ground_contact, Some(true));
        assert!((state.lowest_point().unwrap() - world.ground_height()).abs() < 0.1);
        assert!(state.linear_velocity.length() < 0.5);

        let ground_state = world.body_state(ground).unwrap();
        assert!(ground_state.is_static);
        assert_eq!(ground_state.ground_contact, None);
    }

    #[test]
    fn test_unknown_body_has_no_pose() {
        let (world, _) = world_with_ground(0.9);
        assert!(world.pose(BodyId(42)).is_none());
        assert!(world.body_state(BodyId(42)).is_none());
    }
}
