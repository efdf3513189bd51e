use crate::controller::physics::Simulation;
use crate::error::PhysicsError;
use crate::model::{Binding, VisualProxy};

/// Copy every bound body's pose into its proxy, verbatim
pub fn sync_transforms<S: Simulation + ?Sized>(
    bindings: &[Binding],
    sim: &S,
    proxies: &mut [VisualProxy],
) -> Result<(), PhysicsError> {
    for binding in bindings {
        let pose = sim.body_pose(binding.body)?;
        let proxy = proxies
            .get_mut(binding.proxy.0 as usize)
            .ok_or(PhysicsError::UnknownProxy(binding.proxy))?;
        proxy.pose = pose;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DemoConfig;
    use crate::model::{ProxyId, Scene};

    fn small_scene() -> (Scene, crate::model::World) {
        let mut config = DemoConfig::default();
        config.scene.star_count = 8;
        config.scene.floor_segments = 2;
        config.scene.particle_count = 4;
        Scene::build(&config)
    }

    #[test]
    fn test_proxies_match_bodies_after_steps() {
        let (mut scene, mut world) = small_scene();
        let start: Vec<_> = scene.proxies.iter().map(|p| p.pose.position).collect();
        for _ in 0..30 {
            Simulation::step(&mut world, 1.0 / 60.0, 1.0 / 60.0, 3);
            sync_transforms(&scene.bindings, &world, &mut scene.proxies).unwrap();
        }

        for binding in &scene.bindings {
            let body = world.pose(binding.body).unwrap();
            let proxy = scene.proxy(binding.proxy).unwrap();
            assert_eq!(proxy.pose.position, body.position);
            assert_eq!(proxy.pose.orientation, body.orientation);
        }
        let moved = scene.proxies.iter().zip(&start).any(|(p, s)| p.pose.position != *s);
        assert!(moved, "proxies must follow the simulation");
    }

    #[test]
    fn test_missing_proxy_is_reported() {
        let (scene, world) = small_scene();
        let bindings = [Binding {
            proxy: ProxyId(99),
            body: scene.bindings[0].body,
        }];
        let mut proxies = scene.proxies.clone();
        assert_eq!(
            sync_transforms(&bindings, &world, &mut proxies),
            Err(PhysicsError::UnknownProxy(ProxyId(99)))
        );
    }
}
