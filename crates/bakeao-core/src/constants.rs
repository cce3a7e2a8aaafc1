//! Single source of truth for shared baking constants.
//! Limits, defaults and numeric tolerances used by the sampler, scene,
//! integrator and composer all live here.

/// Number of UV channels a mesh snapshot can carry (UV0..UV7).
pub const UV_CHANNEL_COUNT: usize = 8;

/// Largest texture edge accepted without clamping.
pub const MAX_TEXTURE_SIZE: u32 = 8192;

/// Largest ray count per texel accepted without clamping.
pub const MAX_RAYS_PER_TEXEL: u32 = 4096;

/// Supported super-sampling counts per texel.
pub const SUPPORTED_MSAA: [u32; 5] = [1, 2, 4, 8, 16];

/// MSAA above this combined with a texture edge above
/// `MSAA_WARNING_TEXTURE_SIZE` produces an advisory warning.
pub const MSAA_WARNING_SAMPLES: u32 = 4;

/// Texture edge above which high MSAA counts are considered wasteful.
pub const MSAA_WARNING_TEXTURE_SIZE: u32 = 1000;

/// Hard cap on occluder triangles flattened into one scene.
pub const MAX_OCCLUDER_TRIANGLES: usize = 16 * 1024 * 1024;

/// Hard cap on super-samples (texels × MSAA) generated for one bake.
pub const MAX_SAMPLES: usize = 256 * 1024 * 1024;

/// Default square texture edge.
pub const DEFAULT_TEXTURE_SIZE: u32 = 1024;

/// Default ray count per texel.
pub const DEFAULT_RAYS_PER_TEXEL: u32 = 128;

/// Default maximum occluder distance in world units.
pub const DEFAULT_MAX_OCCLUDER_DISTANCE: f32 = 1.0;

/// Default ray origin offset along the surface normal, in world units.
pub const DEFAULT_NORMAL_BIAS: f32 = 0.001;

/// Default super-sampling count.
pub const DEFAULT_MSAA: u32 = 4;

/// Minimum accepted hit distance, in texels of world footprint.
/// Rejects self-hits on the triangle the ray starts from.
pub const SELF_HIT_EPSILON_TEXELS: f32 = 0.01;

/// UV-space area below which a triangle is treated as degenerate.
pub const DEGENERATE_UV_AREA: f32 = 1e-12;

/// World-space area below which a triangle is treated as degenerate.
pub const DEGENERATE_WORLD_AREA: f32 = 1e-14;

/// Tolerance on barycentric coordinates when testing sub-texel centres.
/// Texel centres exactly on a shared edge are claimed by the first triangle.
pub const BARYCENTRIC_EPSILON: f32 = 1e-6;

/// Fraction of degenerate triangles above which the warning is surfaced.
pub const DEGENERATE_WARNING_FRACTION: f32 = 0.05;

/// Value written to texels no covered texel could reach during dilation.
pub const UNREACHED_TEXEL_VALUE: f32 = 1.0;

/// Max occluder distance above this fraction of the target's largest extent
/// produces an advisory warning.
pub const DISTANCE_WARNING_EXTENT_FRACTION: f32 = 0.7;

/// Version stamped into baked texture provenance.
pub const PROVENANCE_VERSION: u32 = 1;
