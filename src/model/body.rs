use glam::{Mat4, Quat, Vec3};

/// Handle of a rigid body owned by the physics world
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub u32);

/// Index of a visual proxy in the scene
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BodyShape {
    Sphere { radius: f32 },
    /// Infinite plane with +Y normal in body space
    Plane,
}

/// Position and orientation of a body or proxy
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Read-only snapshot of a body after the latest step
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyState {
    pub id: BodyId,
    pub shape: BodyShape,
    pub pose: Pose,
    pub linear_velocity: Vec3,
    pub is_static: bool,
    /// Contact with the ground as reported by the physics engine, if it reports any
    pub ground_contact: Option<bool>,
}

impl BodyState {
    /// Lowest world-space Y of the body's shape (planes have none)
    pub fn lowest_point(&self) -> Option<f32> {
        match self.shape {
            BodyShape::Sphere { radius } => Some(self.pose.position.y - radius),
            BodyShape::Plane => None,
        }
    }
}

/// Render-side counterpart of a body; written only by transform sync
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisualProxy {
    pub pose: Pose,
    pub radius: f32,
    pub color: [f32; 4],
}

impl VisualProxy {
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.radius),
            self.pose.orientation,
            self.pose.position,
        )
    }
}

/// Pairing between a proxy and the body it mirrors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Binding {
    pub proxy: ProxyId,
    pub body: BodyId,
}
