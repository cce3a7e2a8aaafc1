//! Per-bake configuration: mesh contexts and the baking setup that ties a
//! target to its occluders and quality parameters.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use glam::{Mat4, Vec3};

use crate::constants::{DEGENERATE_UV_AREA, DEGENERATE_WORLD_AREA};
use crate::math::{signed_area_2d, triangle_area, Aabb};
use crate::mesh::MeshData;
use crate::quality::{ContextBakingSettings, QualityParameters};
use crate::types::{LodGroupId, MeshContextFlags, UvChannel};

/// A mesh placed in the world for one bake request.
///
/// Immutable once built: `uv_to_world_ratio` is derived in `new` and never
/// recomputed.
#[derive(Debug, Clone)]
pub struct MeshContext {
    pub mesh: Arc<MeshData>,
    pub uv_channel: UvChannel,
    pub object_to_world: Mat4,
    pub flags: MeshContextFlags,
    /// World length covered by one unit of UV, averaged over the chart.
    /// Zero when the UV channel is missing or fully degenerate.
    pub uv_to_world_ratio: f32,
    pub lod_group: Option<LodGroupId>,
    /// Weight of a ray hit against this mesh, in [0, 1].
    pub occluder_strength: f32,
}

impl MeshContext {
    pub fn new(mesh: Arc<MeshData>, uv_channel: UvChannel, object_to_world: Mat4) -> Self {
        let uv_to_world_ratio = compute_uv_to_world_ratio(&mesh, uv_channel, &object_to_world);
        Self {
            mesh,
            uv_channel,
            object_to_world,
            flags: MeshContextFlags::DEFAULT,
            uv_to_world_ratio,
            lod_group: None,
            occluder_strength: 1.0,
        }
    }

    pub fn with_flags(mut self, flags: MeshContextFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_lod_group(mut self, group: LodGroupId) -> Self {
        self.lod_group = Some(group);
        self
    }

    pub fn with_occluder_strength(mut self, strength: f32) -> Self {
        self.occluder_strength = if strength.is_finite() {
            strength.clamp(0.0, 1.0)
        } else {
            1.0
        };
        self
    }

    /// World-space bounds of the placed mesh.
    pub fn world_bounds(&self) -> Aabb {
        self.mesh.bounds().transformed(&self.object_to_world)
    }

    /// Approximate world edge length of one texel of a `width × height` texture.
    pub fn texel_world_size(&self, width: u32, height: u32) -> f32 {
        let edge = width.max(height).max(1) as f32;
        self.uv_to_world_ratio / edge
    }

    /// True when both contexts place the same mesh data with the same transform.
    pub fn is_same_instance(&self, other: &MeshContext) -> bool {
        (Arc::ptr_eq(&self.mesh, &other.mesh)
            || self.mesh.content_hash() == other.mesh.content_hash())
            && self.object_to_world == other.object_to_world
    }

    pub(crate) fn hash_into<H: Hasher>(&self, hasher: &mut H) {
        self.mesh.hash_into(hasher);
        self.uv_channel.hash(hasher);
        for v in self.object_to_world.to_cols_array() {
            v.to_bits().hash(hasher);
        }
        self.flags.hash(hasher);
        self.lod_group.hash(hasher);
        self.occluder_strength.to_bits().hash(hasher);
    }
}

fn compute_uv_to_world_ratio(mesh: &MeshData, channel: UvChannel, object_to_world: &Mat4) -> f32 {
    if !mesh.has_uv(channel) {
        return 0.0;
    }
    let uvs = mesh.uv(channel);
    let mut world_area = 0.0f64;
    let mut uv_area = 0.0f64;
    for tri in 0..mesh.triangle_count() {
        let [a, b, c] = mesh.triangle(tri);
        if a >= uvs.len() || b >= uvs.len() || c >= uvs.len() {
            continue;
        }
        let uv = 0.5 * signed_area_2d(uvs[a], uvs[b], uvs[c]).abs();
        let p = |i: usize| object_to_world.transform_point3(mesh.positions[i]);
        let world = triangle_area(p(a), p(b), p(c));
        if uv < DEGENERATE_UV_AREA || world < DEGENERATE_WORLD_AREA {
            continue;
        }
        world_area += world as f64;
        uv_area += uv as f64;
    }
    if uv_area <= 0.0 {
        0.0
    } else {
        (world_area / uv_area).sqrt() as f32
    }
}

/// Everything one bake needs.
#[derive(Debug, Clone)]
pub struct BakingSetup {
    pub quality: QualityParameters,
    pub mesh_to_bake: MeshContext,
    /// May be empty: the bake then only accounts for self-occlusion.
    pub occluders: Vec<MeshContext>,
}

impl BakingSetup {
    pub fn new(quality: QualityParameters, mesh_to_bake: MeshContext) -> Self {
        Self {
            quality,
            mesh_to_bake,
            occluders: Vec::new(),
        }
    }

    pub fn with_occluders(mut self, occluders: Vec<MeshContext>) -> Self {
        self.occluders = occluders;
        self
    }

    /// Hash over the target's mesh, placement, flags and LOD group.
    pub fn target_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.mesh_to_bake.hash_into(&mut hasher);
        hasher.finish()
    }

    /// Hash over the occluder list, order sensitive.
    pub fn occluder_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.occluders.len().hash(&mut hasher);
        for occluder in &self.occluders {
            occluder.hash_into(&mut hasher);
        }
        hasher.finish()
    }
}

/// A scene object offered to `resolve_context_occluders`.
#[derive(Debug, Clone)]
pub struct OccluderCandidate {
    pub context: MeshContext,
    /// Scene layer index, 0..32.
    pub layer: u8,
}

/// Pick the scene objects that should occlude `target`.
///
/// Keeps candidates whose layer is in the settings' mask and whose world
/// bounds lie within `max_distance + search_margin` of the target's bounds.
/// Returns nothing when context baking is disabled.
pub fn resolve_context_occluders(
    target: &MeshContext,
    candidates: &[OccluderCandidate],
    settings: &ContextBakingSettings,
    max_distance: f32,
) -> Vec<MeshContext> {
    if !settings.enabled {
        return Vec::new();
    }
    let target_bounds = target.world_bounds();
    let reach = max_distance + settings.search_margin.max(0.0);
    candidates
        .iter()
        .filter(|c| c.layer < 32 && settings.layer_mask & (1u32 << c.layer) != 0)
        .filter(|c| {
            let bounds = c.context.world_bounds();
            !bounds.is_empty() && target_bounds.distance_to(&bounds) <= reach
        })
        .map(|c| c.context.clone())
        .collect()
}

/// Largest world-space extent of the target, used by advisory checks.
pub fn largest_world_extent(context: &MeshContext) -> f32 {
    let e: Vec3 = context.world_bounds().extent();
    e.max_element()
}
