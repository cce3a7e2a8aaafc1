pub mod constants;
pub mod error;
pub mod math;
pub mod mesh;
pub mod primitives;
pub mod quality;
pub mod setup;
pub mod texture;
pub mod types;

pub use error::{BakeError, BakeWarning};
pub use mesh::MeshData;
pub use quality::{ContextBakingSettings, OcclusionMode, PixelFormat, QualityParameters, TextureSize};
pub use setup::{resolve_context_occluders, BakingSetup, MeshContext, OccluderCandidate};
pub use texture::{BakedTexture, PixelBuffer, Provenance};
pub use types::{LodGroupId, MeshContextFlags, UvChannel};
