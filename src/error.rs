use crate::model::{BodyId, ProxyId};

/// Failures while fetching or decoding a character asset
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch {path}: {reason}")]
    Fetch { path: String, reason: String },

    #[error("glTF parse error: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("asset has no binary chunk")]
    MissingBinaryChunk,

    #[error("asset contains no skinned mesh")]
    MissingMesh,

    #[error("mesh primitive has no {0} data")]
    MissingAttribute(&'static str),

    #[error("mesh primitive has {found} {attribute} values for {expected} vertices")]
    AttributeMismatch {
        attribute: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("morph target {target} has {found} positions for {expected} vertices")]
    MorphTargetMismatch {
        target: usize,
        expected: usize,
        found: usize,
    },

    #[error("index {index} is out of range for {count} vertices")]
    IndexOutOfRange { index: u32, count: usize },

    #[error("asset contains no animation")]
    MissingAnimation,
}

/// Broken links between the render side and the simulation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhysicsError {
    #[error("binding refers to unknown body {0:?}")]
    UnknownBody(BodyId),

    #[error("binding refers to unknown proxy {0:?}")]
    UnknownProxy(ProxyId),
}

/// Failures while bringing up the GPU
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to request device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}
