// config.rs - Tunable parameters for the demo
//
// Every constant the scene, physics and controls depend on lives here so the
// wasm and native front-ends build the exact same world.
//
// Usage:
//   // Use default configuration
//   let config = DemoConfig::default();
//
//   // Or customize:
//   let mut config = DemoConfig::default();
//   config.scene.star_count = 50;             // Fewer stars
//   config.physics.gravity_magnitude = 9.82;  // Earth-like flips
//
// Natively, `DemoConfig::from_env()` applies environment overrides on top of
// the defaults.

use glam::Vec3;

/// Which ground contact policy drives the gravity flip
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContactPolicyKind {
    /// Flip gravity upwards while any star rests on the ground
    Resting,
    /// Never report contact: gravity stays pointing down
    Frozen,
}

impl ContactPolicyKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "resting" => Some(ContactPolicyKind::Resting),
            "frozen" => Some(ContactPolicyKind::Frozen),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContactPolicyKind::Resting => "resting",
            ContactPolicyKind::Frozen => "frozen",
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PhysicsConfig {
    /// Fixed simulation timestep in seconds
    pub fixed_timestep: f32,
    /// Upper bound of fixed steps taken for a single frame
    pub max_sub_steps: u32,
    /// Magnitude of the gravity vector chosen by the contact policy
    pub gravity_magnitude: f32,
    /// Gravity before the first driver update
    pub initial_gravity: Vec3,
    pub contact_policy: ContactPolicyKind,
    /// Max gap between a body's lowest point and the ground counted as contact
    pub contact_epsilon: f32,
    /// Max speed at which a body in contact counts as resting
    pub rest_speed: f32,
    pub ground_friction: f32,
    pub ground_restitution: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 60.0,
            max_sub_steps: 3,
            gravity_magnitude: 20.0,
            initial_gravity: Vec3::new(0.0, -9.82, 0.0),
            contact_policy: ContactPolicyKind::Resting,
            contact_epsilon: 0.5,
            rest_speed: 1.0,
            ground_friction: 0.4,
            ground_restitution: 0.9,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct MovementConfig {
    pub walk_speed: f32,
    pub run_speed: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            walk_speed: 100.0,
            run_speed: 300.0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SceneConfig {
    pub seed: u64,

    // Floor
    pub floor_size: f32,
    pub floor_segments: u32,
    pub floor_jitter: f32,

    // Stars
    pub star_count: u32,
    pub star_radius: f32,
    pub star_mass: f32,
    pub star_spread: f32,
    pub star_min_height: f32,
    pub star_height_range: f32,

    // Particles
    pub particle_count: u32,
    pub particle_spread: f32,

    // Grid helper
    pub grid_size: f32,
    pub grid_divisions: u32,
    pub grid_opacity: f32,

    // Fog (linear, from camera eye)
    pub fog_near: f32,
    pub fog_far: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed_57a2,

            floor_size: 3000.0,
            floor_segments: 100,
            floor_jitter: 1.0,

            star_count: 500,
            star_radius: 25.0,
            star_mass: 1.0,
            star_spread: 3000.0,
            star_min_height: 10.0,
            star_height_range: 1000.0,

            particle_count: 10_000,
            particle_spread: 2000.0,

            grid_size: 2000.0,
            grid_divisions: 20,
            grid_opacity: 0.2,

            fog_near: 200.0,
            fog_far: 1500.0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CameraConfig {
    pub fov_y_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub eye: Vec3,
    pub target: Vec3,
    pub rotate_sensitivity: f32,
    pub zoom_step: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 45.0,
            z_near: 1.0,
            z_far: 2000.0,
            eye: Vec3::new(200.0, 400.0, 800.0),
            target: Vec3::new(0.0, 100.0, 0.0),
            rotate_sensitivity: 0.005,
            zoom_step: 0.1,
            min_distance: 50.0,
            max_distance: 1900.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AssetConfig {
    /// Directory (native) or URL prefix (wasm) holding `glb/<clip>.glb`
    pub root: String,
    pub clips: Vec<String>,
    pub default_clip: String,
}

impl AssetConfig {
    /// Location of a clip's binary glTF below the asset root
    pub fn clip_path(&self, clip: &str) -> String {
        let root = self.root.trim_end_matches('/');
        if root.is_empty() {
            format!("glb/{clip}.glb")
        } else {
            format!("{root}/glb/{clip}.glb")
        }
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        let clips: Vec<String> = [
            "Rumba Dancing",
            "Boxing",
            "Catwalk Walk Turn 180 Tight",
            "Angry",
            "Singing",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        Self {
            root: "models".to_string(),
            default_clip: clips[0].clone(),
            clips,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DemoConfig {
    pub physics: PhysicsConfig,
    pub movement: MovementConfig,
    pub scene: SceneConfig,
    pub camera: CameraConfig,
    pub assets: AssetConfig,
}

impl DemoConfig {
    /// Defaults with `STARDANCE_*` environment overrides applied
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Self {
        let vars: Vec<(String, String)> = std::env::vars()
            .filter(|(k, _)| k.starts_with("STARDANCE_"))
            .collect();
        Self::default().with_overrides(vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// Apply `(key, value)` overrides; unknown keys and unparsable values are
    /// logged and skipped
    pub fn with_overrides<'a>(mut self, vars: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        for (key, value) in vars {
            match key {
                "STARDANCE_ASSET_ROOT" => self.assets.root = value.to_string(),
                "STARDANCE_CONTACT_POLICY" => match ContactPolicyKind::from_name(value) {
                    Some(kind) => self.physics.contact_policy = kind,
                    None => tracing::warn!(value, "unknown contact policy, keeping {}", self.physics.contact_policy.label()),
                },
                "STARDANCE_SEED" => match value.parse() {
                    Ok(seed) => self.scene.seed = seed,
                    Err(_) => tracing::warn!(value, "invalid scene seed"),
                },
                "STARDANCE_STAR_COUNT" => match value.parse() {
                    Ok(count) => self.scene.star_count = count,
                    Err(_) => tracing::warn!(value, "invalid star count"),
                },
                other => tracing::debug!(key = other, "ignoring unknown override"),
            }
        }
        self
    }
}
