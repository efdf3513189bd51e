// MODEL: Simulation state and scene data
pub mod body;
pub mod materials;
pub mod world;
pub mod terrain;
pub mod scene;
pub mod character;
pub mod camera;

pub use body::{Binding, BodyId, BodyShape, BodyState, Pose, ProxyId, VisualProxy};
pub use materials::{ContactMaterial, MaterialId, MaterialTable};
pub use world::{BodyDesc, World};
pub use scene::Scene;
pub use character::{AnimationMixer, Character, CharacterModel};
pub use camera::Camera;
