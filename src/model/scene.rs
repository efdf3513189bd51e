use glam::Vec3;

use crate::config::DemoConfig;
use crate::error::PhysicsError;
use crate::model::body::{Binding, BodyId, BodyShape, Pose, ProxyId, VisualProxy};
use crate::model::materials::{ContactMaterial, MaterialId, MaterialTable};
use crate::model::terrain::TerrainGenerator;
use crate::model::world::{BodyDesc, World};
use crate::utils::Mesh;

/// Render-side scene: static meshes plus the proxies mirrored from physics
pub struct Scene {
    pub proxies: Vec<VisualProxy>,
    pub bindings: Vec<Binding>,

    pub floor: Mesh,
    pub particles: Mesh,
    pub grid: Mesh,
    pub star_color: [f32; 4],
    pub ground: Option<BodyId>,
}

impl Scene {
    pub fn empty() -> Self {
        Self {
            proxies: Vec::new(),
            bindings: Vec::new(),
            floor: Mesh::empty(),
            particles: Mesh::empty(),
            grid: Mesh::empty(),
            star_color: [1.0; 4],
            ground: None,
        }
    }

    /// Build the physics world and the matching scene from the config
    pub fn build(config: &DemoConfig) -> (Self, World) {
        let mut materials = MaterialTable::new();
        materials.add(
            &MaterialId::ground(),
            &MaterialId::star(),
            ContactMaterial {
                friction: config.physics.ground_friction,
                restitution: config.physics.ground_restitution,
            },
        );
        let mut world = World::new(config.physics.initial_gravity, materials);
        let mut scene = Scene::empty();

        scene.ground = Some(world.add_body(BodyDesc {
            shape: BodyShape::Plane,
            mass: 0.0,
            position: Vec3::ZERO,
            material: MaterialId::ground(),
        }));

        let mut generator = TerrainGenerator::new(config.scene);
        scene.floor = generator.floor();
        scene.star_color = generator.star_color();
        for position in generator.star_positions() {
            scene.add_star(&mut world, position, config.scene.star_radius, config.scene.star_mass);
        }
        scene.particles = generator.particles();
        scene.grid = generator.grid();

        tracing::info!(
            stars = scene.proxies.len(),
            bodies = world.len(),
            floor_vertices = scene.floor.vertices.len(),
            "scene built"
        );
        (scene, world)
    }

    pub fn add_proxy(&mut self, proxy: VisualProxy) -> ProxyId {
        let id = ProxyId(self.proxies.len() as u32);
        self.proxies.push(proxy);
        id
    }

    pub fn bind(&mut self, proxy: ProxyId, body: BodyId) {
        self.bindings.push(Binding { proxy, body });
    }

    /// Add a sphere body, its proxy, and the binding between them
    pub fn add_star(&mut self, world: &mut World, position: Vec3, radius: f32, mass: f32) -> Binding {
        let proxy = self.add_proxy(VisualProxy {
            pose: Pose::from_position(position),
            radius,
            color: self.star_color,
        });
        let body = world.add_body(BodyDesc {
            shape: BodyShape::Sphere { radius },
            mass,
            position,
            material: MaterialId::star(),
        });
        self.bind(proxy, body);
        Binding { proxy, body }
    }

    pub fn proxy(&self, id: ProxyId) -> Result<&VisualProxy, PhysicsError> {
        self.proxies.get(id.0 as usize).ok_or(PhysicsError::UnknownProxy(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_binds_every_star() {
        let mut config = DemoConfig::default();
        config.scene.star_count = 12;
        config.scene.floor_segments = 2;
        config.scene.particle_count = 10;

        let (scene, world) = Scene::build(&config);
        assert_eq!(scene.proxies.len(), 12);
        assert_eq!(scene.bindings.len(), 12);
        assert_eq!(world.len(), 13, "stars plus the ground plane");
        assert!(scene.ground.is_some());

        for binding in &scene.bindings {
            let proxy = scene.proxy(binding.proxy).unwrap();
            let pose = world.pose(binding.body).unwrap();
            assert_eq!(proxy.pose.position, pose.position);
        }
    }
}
