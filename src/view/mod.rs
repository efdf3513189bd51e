// VIEW: Rendering and graphics
pub mod render;
pub mod gpu_init;

pub use render::{CameraResources, CameraUniform, InstanceRaw, LightingUniform, RenderState, ScenePipelines};
pub use gpu_init::GpuContext;
