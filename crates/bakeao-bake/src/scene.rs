//! Occluder scene: every occluding triangle flattened into world space and
//! indexed by a binned-SAH BVH.
//!
//! Built once per bake and shared read-only by all integration threads.
//! Nodes live in a flat array; interior nodes store the index of their left
//! child (the right child follows it), leaves store a contiguous triangle
//! range.

use bakeao_core::constants::{DEGENERATE_WORLD_AREA, MAX_OCCLUDER_TRIANGLES};
use bakeao_core::math::{normal_matrix, safe_inverse, triangle_area, Aabb};
use bakeao_core::{BakeError, MeshContext, MeshContextFlags, QualityParameters};
use glam::Vec3;

/// Number of SAH bins per split.
const BINS: usize = 16;
/// Nodes with this many triangles or fewer become leaves.
const MAX_LEAF_TRIANGLES: u32 = 4;
/// Build depth cap; traversal uses a fixed stack of this size.
const MAX_DEPTH: usize = 48;

/// Closest intersection along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub distance: f32,
    /// Occluder strength of the mesh that was hit, in (0, 1].
    pub strength: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneStats {
    /// Meshes flattened into the scene, the target included.
    pub mesh_count: usize,
    pub triangle_count: usize,
    pub node_count: usize,
    /// Occluders dropped as LOD siblings or duplicates of the target.
    pub excluded_occluders: usize,
    pub degenerate_triangles: usize,
}

#[derive(Debug, Clone, Copy)]
struct Triangle {
    v0: Vec3,
    e1: Vec3,
    e2: Vec3,
    strength: f32,
}

impl Triangle {
    fn new(a: Vec3, b: Vec3, c: Vec3, strength: f32) -> Self {
        Self {
            v0: a,
            e1: b - a,
            e2: c - a,
            strength,
        }
    }

    fn bounds(&self) -> Aabb {
        Aabb::EMPTY
            .grow(self.v0)
            .grow(self.v0 + self.e1)
            .grow(self.v0 + self.e2)
    }

    /// Two-sided Möller–Trumbore. Returns the hit distance within
    /// `[t_min, t_max]`.
    #[inline]
    fn intersect(&self, origin: Vec3, dir: Vec3, t_min: f32, t_max: f32) -> Option<f32> {
        let p = dir.cross(self.e2);
        let det = self.e1.dot(p);
        if det.abs() < 1e-12 {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = origin - self.v0;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(self.e1);
        let v = dir.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = self.e2.dot(q) * inv_det;
        (t >= t_min && t <= t_max).then_some(t)
    }
}

#[derive(Debug, Clone, Copy)]
struct BvhNode {
    bounds: Aabb,
    /// Leaf: first triangle. Interior: left child index.
    left_first: u32,
    /// Zero for interior nodes.
    tri_count: u32,
}

impl BvhNode {
    fn is_leaf(&self) -> bool {
        self.tri_count > 0
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Bin {
    bounds: Option<Aabb>,
    count: u32,
}

/// World-space triangle soup with a BVH over it.
#[derive(Debug, Clone)]
pub struct OccluderScene {
    nodes: Vec<BvhNode>,
    triangles: Vec<Triangle>,
    uniform_strength: bool,
    stats: SceneStats,
}

impl OccluderScene {
    /// Flatten `target` (unless it opts out with `DONT_COMBINE`) and
    /// `occluders` into one scene.
    ///
    /// Occluders sharing the target's LOD group with different mesh data are
    /// skipped, as are exact duplicates of the target.
    pub fn build(
        target: &MeshContext,
        occluders: &[MeshContext],
        quality: &QualityParameters,
    ) -> Result<Self, BakeError> {
        let mut stats = SceneStats::default();
        let mut included: Vec<&MeshContext> = Vec::with_capacity(occluders.len() + 1);
        if !target.flags.contains(MeshContextFlags::DONT_COMBINE) {
            included.push(target);
        }
        for occluder in occluders {
            if is_excluded(target, occluder) {
                stats.excluded_occluders += 1;
                continue;
            }
            if occluder.occluder_strength <= 0.0 {
                continue;
            }
            included.push(occluder);
        }

        let requested: usize = included.iter().map(|c| c.mesh.triangle_count()).sum();
        if requested > MAX_OCCLUDER_TRIANGLES {
            return Err(BakeError::ResourceExhausted {
                what: "occluder triangles",
                requested,
                limit: MAX_OCCLUDER_TRIANGLES,
            });
        }

        let mut triangles = Vec::with_capacity(requested);
        for ctx in &included {
            flatten_into(ctx, quality.normal_bias, &mut triangles, &mut stats);
        }
        stats.mesh_count = included.len();
        stats.triangle_count = triangles.len();

        let uniform_strength = triangles.iter().all(|t| t.strength >= 1.0);
        let (nodes, order) = build_bvh(&triangles);
        let triangles: Vec<Triangle> = order.iter().map(|&i| triangles[i as usize]).collect();
        stats.node_count = nodes.len();

        log::debug!(
            "occluder scene: {} meshes, {} triangles, {} BVH nodes, {} excluded",
            stats.mesh_count,
            stats.triangle_count,
            stats.node_count,
            stats.excluded_occluders
        );

        Ok(Self {
            nodes,
            triangles,
            uniform_strength,
            stats,
        })
    }

    pub fn stats(&self) -> SceneStats {
        self.stats
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// True when every triangle occludes at full strength, so the first hit
    /// found is as good as the nearest one for binary occlusion.
    pub fn has_uniform_strength(&self) -> bool {
        self.uniform_strength
    }

    pub fn bounds(&self) -> Aabb {
        self.nodes.first().map(|n| n.bounds).unwrap_or(Aabb::EMPTY)
    }

    pub fn nearest_hit(&self, origin: Vec3, dir: Vec3, max_distance: f32) -> Option<Hit> {
        self.nearest_hit_in(origin, dir, 0.0, max_distance)
    }

    /// Nearest intersection with distance in `[min_distance, max_distance]`.
    pub fn nearest_hit_in(
        &self,
        origin: Vec3,
        dir: Vec3,
        min_distance: f32,
        max_distance: f32,
    ) -> Option<Hit> {
        if self.nodes.is_empty() {
            return None;
        }
        let inv_dir = safe_inverse(dir);
        let mut best: Option<Hit> = None;
        let mut t_max = max_distance;
        let mut stack = [0u32; MAX_DEPTH + 1];
        let mut sp = 0usize;
        let mut node_idx = 0usize;

        if self.nodes[0].bounds.ray_entry(origin, inv_dir, t_max).is_none() {
            return None;
        }

        loop {
            let node = &self.nodes[node_idx];
            if node.is_leaf() {
                let first = node.left_first as usize;
                for tri in &self.triangles[first..first + node.tri_count as usize] {
                    if let Some(t) = tri.intersect(origin, dir, min_distance, t_max) {
                        t_max = t;
                        best = Some(Hit {
                            distance: t,
                            strength: tri.strength,
                        });
                    }
                }
            } else {
                let left = node.left_first as usize;
                let right = left + 1;
                let t_left = self.nodes[left].bounds.ray_entry(origin, inv_dir, t_max);
                let t_right = self.nodes[right].bounds.ray_entry(origin, inv_dir, t_max);
                match (t_left, t_right) {
                    (Some(tl), Some(tr)) => {
                        let (near, far) = if tl <= tr { (left, right) } else { (right, left) };
                        stack[sp] = far as u32;
                        sp += 1;
                        node_idx = near;
                        continue;
                    }
                    (Some(_), None) => {
                        node_idx = left;
                        continue;
                    }
                    (None, Some(_)) => {
                        node_idx = right;
                        continue;
                    }
                    (None, None) => {}
                }
            }
            if sp == 0 {
                break;
            }
            sp -= 1;
            node_idx = stack[sp] as usize;
        }
        best
    }

    pub fn any_hit(&self, origin: Vec3, dir: Vec3, max_distance: f32) -> Option<f32> {
        self.any_hit_in(origin, dir, 0.0, max_distance)
    }

    /// Strength of the first intersection found in
    /// `[min_distance, max_distance]`; traversal stops at the first hit.
    pub fn any_hit_in(
        &self,
        origin: Vec3,
        dir: Vec3,
        min_distance: f32,
        max_distance: f32,
    ) -> Option<f32> {
        if self.nodes.is_empty() {
            return None;
        }
        let inv_dir = safe_inverse(dir);
        let mut stack = [0u32; MAX_DEPTH + 2];
        let mut sp = 1usize;
        stack[0] = 0;

        while sp > 0 {
            sp -= 1;
            let node = &self.nodes[stack[sp] as usize];
            if node.bounds.ray_entry(origin, inv_dir, max_distance).is_none() {
                continue;
            }
            if node.is_leaf() {
                let first = node.left_first as usize;
                for tri in &self.triangles[first..first + node.tri_count as usize] {
                    if tri.intersect(origin, dir, min_distance, max_distance).is_some() {
                        return Some(tri.strength);
                    }
                }
            } else {
                stack[sp] = node.left_first + 1;
                stack[sp + 1] = node.left_first;
                sp += 2;
            }
        }
        None
    }
}

fn is_excluded(target: &MeshContext, occluder: &MeshContext) -> bool {
    if occluder.is_same_instance(target) {
        return true;
    }
    match (target.lod_group, occluder.lod_group) {
        (Some(a), Some(b)) if a == b => {
            occluder.mesh.content_hash() != target.mesh.content_hash()
        }
        _ => false,
    }
}

/// Append `ctx`'s triangles in world space. With `APPLY_NORMAL_BIAS` every
/// vertex is pulled inward along its normal by `normal_bias`.
fn flatten_into(ctx: &MeshContext, normal_bias: f32, out: &mut Vec<Triangle>, stats: &mut SceneStats) {
    let mesh = &ctx.mesh;
    let to_world = ctx.object_to_world;
    let normal_to_world = normal_matrix(&to_world);
    let shrink = ctx.flags.contains(MeshContextFlags::APPLY_NORMAL_BIAS) && normal_bias > 0.0;
    let has_normals = !mesh.normals.is_empty();

    for tri in 0..mesh.triangle_count() {
        let idx = mesh.triangle(tri);
        let mut v = idx.map(|i| to_world.transform_point3(mesh.positions[i]));
        if triangle_area(v[0], v[1], v[2]) < DEGENERATE_WORLD_AREA {
            stats.degenerate_triangles += 1;
            continue;
        }
        if shrink {
            let face = (v[1] - v[0]).cross(v[2] - v[0]).normalize_or_zero();
            for (corner, &i) in v.iter_mut().zip(idx.iter()) {
                let n = if has_normals {
                    (normal_to_world * mesh.normals[i]).normalize_or_zero()
                } else {
                    face
                };
                *corner -= n * normal_bias;
            }
        }
        out.push(Triangle::new(v[0], v[1], v[2], ctx.occluder_strength));
    }
}

/// Build a flat BVH. Returns the nodes and the triangle order the leaves
/// index into.
fn build_bvh(triangles: &[Triangle]) -> (Vec<BvhNode>, Vec<u32>) {
    if triangles.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let bounds: Vec<Aabb> = triangles.iter().map(Triangle::bounds).collect();
    let centers: Vec<Vec3> = bounds.iter().map(Aabb::center).collect();
    let mut order: Vec<u32> = (0..triangles.len() as u32).collect();

    let fit = |order: &[u32]| {
        order
            .iter()
            .fold(Aabb::EMPTY, |b, &i| b.union(bounds[i as usize]))
    };

    let mut nodes = Vec::with_capacity(triangles.len() * 2 / MAX_LEAF_TRIANGLES as usize + 1);
    nodes.push(BvhNode {
        bounds: fit(&order),
        left_first: 0,
        tri_count: triangles.len() as u32,
    });

    let mut work = vec![(0usize, 0usize)];
    while let Some((node_idx, depth)) = work.pop() {
        let node = nodes[node_idx];
        if node.tri_count <= MAX_LEAF_TRIANGLES || depth >= MAX_DEPTH {
            continue;
        }
        let first = node.left_first as usize;
        let count = node.tri_count as usize;
        let slice = &mut order[first..first + count];

        let centroid_bounds = slice
            .iter()
            .fold(Aabb::EMPTY, |b, &i| b.grow(centers[i as usize]));
        let extent = centroid_bounds.extent();
        let axis = if extent.y > extent.x && extent.y >= extent.z {
            1
        } else if extent.z > extent.x {
            2
        } else {
            0
        };
        let split_len = extent[axis];
        if split_len < 1e-9 {
            continue;
        }
        let split_min = centroid_bounds.min[axis];
        let scale = BINS as f32 / split_len;
        let bin_of = |i: u32| (((centers[i as usize][axis] - split_min) * scale) as usize).min(BINS - 1);

        let mut bins = [Bin::default(); BINS];
        for &i in slice.iter() {
            let bin = &mut bins[bin_of(i)];
            bin.count += 1;
            bin.bounds = Some(bin.bounds.unwrap_or(Aabb::EMPTY).union(bounds[i as usize]));
        }

        let mut left_area = [0.0f32; BINS];
        let mut left_count = [0u32; BINS];
        let mut acc = Aabb::EMPTY;
        let mut sum = 0;
        for b in 0..BINS {
            sum += bins[b].count;
            if let Some(bb) = bins[b].bounds {
                acc = acc.union(bb);
            }
            left_area[b] = acc.half_area();
            left_count[b] = sum;
        }
        let mut right_area = [0.0f32; BINS];
        let mut right_count = [0u32; BINS];
        acc = Aabb::EMPTY;
        sum = 0;
        for b in (0..BINS).rev() {
            sum += bins[b].count;
            if let Some(bb) = bins[b].bounds {
                acc = acc.union(bb);
            }
            right_area[b] = acc.half_area();
            right_count[b] = sum;
        }

        let mut best_cost = f32::INFINITY;
        let mut best_split = None;
        for b in 0..BINS - 1 {
            if left_count[b] == 0 || right_count[b + 1] == 0 {
                continue;
            }
            let cost = left_area[b] * left_count[b] as f32 + right_area[b + 1] * right_count[b + 1] as f32;
            if cost < best_cost {
                best_cost = cost;
                best_split = Some(b);
            }
        }
        let Some(split) = best_split else { continue };
        let leaf_cost = node.bounds.half_area() * count as f32;
        if count <= 2 * MAX_LEAF_TRIANGLES as usize && best_cost >= leaf_cost {
            continue;
        }

        // Stable in-place partition
        let mut mid = 0;
        for j in 0..count {
            if bin_of(slice[j]) <= split {
                slice.swap(mid, j);
                mid += 1;
            }
        }
        if mid == 0 || mid == count {
            continue;
        }

        let left_idx = nodes.len();
        let left_order = &order[first..first + mid];
        let right_order = &order[first + mid..first + count];
        let left = BvhNode {
            bounds: fit(left_order),
            left_first: first as u32,
            tri_count: mid as u32,
        };
        let right = BvhNode {
            bounds: fit(right_order),
            left_first: (first + mid) as u32,
            tri_count: (count - mid) as u32,
        };
        nodes.push(left);
        nodes.push(right);
        nodes[node_idx].left_first = left_idx as u32;
        nodes[node_idx].tri_count = 0;
        work.push((left_idx + 1, depth + 1));
        work.push((left_idx, depth + 1));
    }

    (nodes, order)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bakeao_core::primitives::{plane, unit_cube, unit_quad, uv_sphere};
    use bakeao_core::{LodGroupId, UvChannel};
    use glam::Mat4;

    use super::*;

    fn ctx(mesh: bakeao_core::MeshData, transform: Mat4) -> MeshContext {
        MeshContext::new(Arc::new(mesh), UvChannel::Uv0, transform)
    }

    /// Linear scan reference.
    fn brute_nearest(scene: &OccluderScene, origin: Vec3, dir: Vec3, max: f32) -> Option<f32> {
        scene
            .triangles
            .iter()
            .filter_map(|t| t.intersect(origin, dir, 0.0, max))
            .fold(None, |best: Option<f32>, t| Some(best.map_or(t, |b| b.min(t))))
    }

    #[test]
    fn test_ray_hits_quad_from_both_sides() {
        let target = ctx(unit_quad("quad"), Mat4::IDENTITY);
        let scene = OccluderScene::build(&target, &[], &QualityParameters::default())
            .expect("scene builds");
        let hit = scene
            .nearest_hit(Vec3::new(0.1, 1.0, 0.2), Vec3::NEG_Y, 10.0)
            .expect("hit from above");
        assert!((hit.distance - 1.0).abs() < 1e-5);
        assert_eq!(hit.strength, 1.0);
        assert!(scene.any_hit(Vec3::new(0.1, -1.0, 0.2), Vec3::Y, 10.0).is_some());
        assert!(scene.nearest_hit(Vec3::new(0.1, 1.0, 0.2), Vec3::Y, 10.0).is_none());
        assert!(scene.nearest_hit(Vec3::new(0.1, 1.0, 0.2), Vec3::NEG_Y, 0.5).is_none());
    }

    #[test]
    fn test_dont_combine_excludes_target() {
        let target = ctx(unit_quad("quad"), Mat4::IDENTITY).with_flags(MeshContextFlags::DONT_COMBINE);
        let scene = OccluderScene::build(&target, &[], &QualityParameters::default())
            .expect("scene builds");
        assert!(scene.is_empty());
        assert!(scene.nearest_hit(Vec3::new(0.1, 1.0, 0.2), Vec3::NEG_Y, 10.0).is_none());
    }

    #[test]
    fn test_duplicate_and_lod_sibling_excluded() {
        let mesh = Arc::new(unit_quad("quad"));
        let target = MeshContext::new(mesh.clone(), UvChannel::Uv0, Mat4::IDENTITY)
            .with_lod_group(LodGroupId(7));
        let duplicate = MeshContext::new(mesh, UvChannel::Uv0, Mat4::IDENTITY);
        let sibling = ctx(plane("lod1", 1.0, 2), Mat4::IDENTITY).with_lod_group(LodGroupId(7));
        let other = ctx(unit_quad("other"), Mat4::from_translation(Vec3::Y));
        let scene = OccluderScene::build(
            &target,
            &[duplicate, sibling, other],
            &QualityParameters::default(),
        )
        .expect("scene builds");
        assert_eq!(scene.stats().excluded_occluders, 2);
        assert_eq!(scene.stats().mesh_count, 2);
    }

    #[test]
    fn test_occluder_strength_reported() {
        let target = ctx(unit_quad("quad"), Mat4::IDENTITY).with_flags(MeshContextFlags::DONT_COMBINE);
        let lid = ctx(unit_quad("lid"), Mat4::from_translation(Vec3::Y)).with_occluder_strength(0.5);
        let scene = OccluderScene::build(&target, &[lid], &QualityParameters::default())
            .expect("scene builds");
        assert!(!scene.has_uniform_strength());
        let hit = scene.nearest_hit(Vec3::new(0.1, 0.0, 0.2), Vec3::Y, 2.0).expect("hit");
        assert_eq!(hit.strength, 0.5);
    }

    #[test]
    fn test_normal_bias_shrinks_occluder() {
        let quality = QualityParameters {
            normal_bias: 0.1,
            ..Default::default()
        };
        let target = ctx(unit_quad("quad"), Mat4::IDENTITY).with_flags(MeshContextFlags::DONT_COMBINE);
        let lid = ctx(unit_quad("lid"), Mat4::from_translation(Vec3::Y))
            .with_flags(MeshContextFlags::APPLY_NORMAL_BIAS);
        let scene = OccluderScene::build(&target, &[lid], &quality).expect("scene builds");
        let hit = scene.nearest_hit(Vec3::new(0.1, 0.0, 0.2), Vec3::Y, 2.0).expect("hit");
        assert!((hit.distance - 0.9).abs() < 1e-5);
    }

    #[test]
    fn test_min_distance_skips_near_hits() {
        let target = ctx(unit_quad("quad"), Mat4::IDENTITY);
        let scene = OccluderScene::build(&target, &[], &QualityParameters::default())
            .expect("scene builds");
        assert!(scene
            .nearest_hit_in(Vec3::new(0.1, 0.001, 0.2), Vec3::NEG_Y, 0.01, 1.0)
            .is_none());
    }

    #[test]
    fn test_bvh_matches_brute_force() {
        let target = ctx(uv_sphere("sphere", 1.0, 16, 32), Mat4::IDENTITY);
        let cubes: Vec<MeshContext> = (0..8)
            .map(|i| {
                let angle = i as f32 * std::f32::consts::TAU / 8.0;
                ctx(
                    unit_cube("cube"),
                    Mat4::from_translation(Vec3::new(angle.cos() * 3.0, 0.0, angle.sin() * 3.0)),
                )
            })
            .collect();
        let scene = OccluderScene::build(&target, &cubes, &QualityParameters::default())
            .expect("scene builds");
        assert!(scene.stats().node_count > 1);

        let origins = [Vec3::new(0.0, 5.0, 0.0), Vec3::new(5.0, 0.2, 0.1), Vec3::new(-0.3, 0.1, 5.0)];
        for (k, &origin) in origins.iter().enumerate() {
            for j in 0..64 {
                let a = j as f32 * 0.37 + k as f32;
                let target_point = Vec3::new(a.cos() * 3.0, (a * 1.7).sin(), a.sin() * 3.0);
                let dir = (target_point - origin).normalize();
                let expected = brute_nearest(&scene, origin, dir, 20.0);
                let got = scene.nearest_hit(origin, dir, 20.0).map(|h| h.distance);
                assert_eq!(expected, got, "ray {k}/{j}");
                assert_eq!(expected.is_some(), scene.any_hit(origin, dir, 20.0).is_some());
            }
        }
    }
}
