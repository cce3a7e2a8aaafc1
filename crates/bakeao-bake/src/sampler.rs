//! Mesh sampler: rasterizes the target's UV chart into world-space samples.
//!
//! The destination texture is super-sampled on a regular grid (`msaa_layout`).
//! Every sub-texel centre that falls inside a triangle's UV footprint becomes
//! one `TexelSample` carrying the interpolated world position and normal.
//!
//! Rasterization is two passes over a claim buffer: triangles claim
//! sub-texels in index order (first writer wins), then samples are emitted in
//! raster order from the claims. The output is therefore independent of
//! anything but the input mesh and grid.

use bakeao_core::constants::{BARYCENTRIC_EPSILON, DEGENERATE_UV_AREA, DEGENERATE_WORLD_AREA};
use bakeao_core::math::{barycentric_2d, normal_matrix, signed_area_2d, triangle_area};
use bakeao_core::MeshContext;
use glam::{UVec2, Vec2, Vec3};

const UNCLAIMED: u32 = u32::MAX;

/// One occupied sub-texel of the destination texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TexelSample {
    pub position: Vec3,
    /// Unit world-space normal.
    pub normal: Vec3,
    /// Destination texel.
    pub texel: UVec2,
    /// Sub-sample index within the texel, row-major in the MSAA layout.
    pub subsample: u32,
    /// Box-filter weight of this sub-sample within its texel.
    pub coverage: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerStats {
    pub total_triangles: usize,
    pub degenerate_triangles: usize,
    /// Sub-texels claimed by more than one triangle.
    pub overlapping_samples: usize,
    pub covered_texels: usize,
}

/// Samples of one bake in raster order over the super-sampled grid.
#[derive(Debug, Clone)]
pub struct SampleSet {
    pub width: u32,
    pub height: u32,
    pub msaa: u32,
    pub samples: Vec<TexelSample>,
    pub stats: SamplerStats,
}

/// Sub-sample grid (columns, rows) for a supported MSAA count.
pub fn msaa_layout(msaa: u32) -> (u32, u32) {
    match msaa {
        2 => (2, 1),
        4 => (2, 2),
        8 => (4, 2),
        16 => (4, 4),
        _ => (1, 1),
    }
}

/// Triangle transformed into world space with its UV footprint.
struct PreparedTriangle {
    uv: [Vec2; 3],
    double_area: f32,
    world: [Vec3; 3],
    normals: Option<[Vec3; 3]>,
    face_normal: Vec3,
}

impl PreparedTriangle {
    fn interpolate(&self, bary: Vec3) -> (Vec3, Vec3) {
        let position = self.world[0] * bary.x + self.world[1] * bary.y + self.world[2] * bary.z;
        let normal = self
            .normals
            .map(|n| n[0] * bary.x + n[1] * bary.y + n[2] * bary.z)
            .and_then(|n| n.try_normalize())
            .unwrap_or(self.face_normal);
        (position, normal)
    }
}

fn prepare_triangles(ctx: &MeshContext, stats: &mut SamplerStats) -> Vec<Option<PreparedTriangle>> {
    let mesh = &ctx.mesh;
    let uvs = mesh.uv(ctx.uv_channel);
    let to_world = ctx.object_to_world;
    let normal_to_world = normal_matrix(&to_world);
    let has_normals = !mesh.normals.is_empty();

    (0..mesh.triangle_count())
        .map(|tri| {
            let [a, b, c] = mesh.triangle(tri);
            let uv = [uvs[a], uvs[b], uvs[c]];
            let double_area = signed_area_2d(uv[0], uv[1], uv[2]);
            let world = [
                to_world.transform_point3(mesh.positions[a]),
                to_world.transform_point3(mesh.positions[b]),
                to_world.transform_point3(mesh.positions[c]),
            ];
            if 0.5 * double_area.abs() < DEGENERATE_UV_AREA
                || triangle_area(world[0], world[1], world[2]) < DEGENERATE_WORLD_AREA
            {
                stats.degenerate_triangles += 1;
                return None;
            }
            let face_normal = (world[1] - world[0])
                .cross(world[2] - world[0])
                .try_normalize()
                .unwrap_or(Vec3::Y);
            let normals = has_normals.then(|| {
                [
                    normal_to_world * mesh.normals[a],
                    normal_to_world * mesh.normals[b],
                    normal_to_world * mesh.normals[c],
                ]
            });
            Some(PreparedTriangle {
                uv,
                double_area,
                world,
                normals,
                face_normal,
            })
        })
        .collect()
}

/// Inclusive range of grid cells whose centres lie in `[lo, hi]` (UV units).
fn cell_range(lo: f32, hi: f32, cells: u32) -> Option<(u32, u32)> {
    let first = (lo * cells as f32 - 0.5).ceil().max(0.0);
    let last = (hi * cells as f32 - 0.5).floor().min(cells as f32 - 1.0);
    if !(first <= last) {
        return None;
    }
    Some((first as u32, last as u32))
}

fn cell_centre(x: u32, y: u32, grid_w: u32, grid_h: u32) -> Vec2 {
    Vec2::new(
        (x as f32 + 0.5) / grid_w as f32,
        (y as f32 + 0.5) / grid_h as f32,
    )
}

/// Rasterize `ctx`'s UV chart onto a `width × height` texture with `msaa`
/// sub-samples per texel.
///
/// A context without the requested UV channel yields an empty set; the
/// pipeline reports that case as an error before calling this.
pub fn build_samples(ctx: &MeshContext, width: u32, height: u32, msaa: u32) -> SampleSet {
    let (sx, sy) = msaa_layout(msaa);
    let mut stats = SamplerStats {
        total_triangles: ctx.mesh.triangle_count(),
        ..Default::default()
    };
    let empty = |stats| SampleSet {
        width,
        height,
        msaa: sx * sy,
        samples: Vec::new(),
        stats,
    };
    if !ctx.mesh.has_uv(ctx.uv_channel) || width == 0 || height == 0 {
        return empty(stats);
    }

    let grid_w = width * sx;
    let grid_h = height * sy;
    let triangles = prepare_triangles(ctx, &mut stats);

    // Pass 1: claim sub-texels in triangle index order
    let mut claims = vec![UNCLAIMED; grid_w as usize * grid_h as usize];
    for (tri_index, tri) in triangles.iter().enumerate() {
        let Some(tri) = tri else { continue };
        let lo = tri.uv[0].min(tri.uv[1]).min(tri.uv[2]);
        let hi = tri.uv[0].max(tri.uv[1]).max(tri.uv[2]);
        let (Some((x0, x1)), Some((y0, y1))) =
            (cell_range(lo.x, hi.x, grid_w), cell_range(lo.y, hi.y, grid_h))
        else {
            continue;
        };
        for y in y0..=y1 {
            for x in x0..=x1 {
                let p = cell_centre(x, y, grid_w, grid_h);
                let bary = barycentric_2d(p, tri.uv[0], tri.uv[1], tri.uv[2], tri.double_area);
                if bary.min_element() < -BARYCENTRIC_EPSILON {
                    continue;
                }
                let slot = &mut claims[y as usize * grid_w as usize + x as usize];
                if *slot == UNCLAIMED {
                    *slot = tri_index as u32;
                } else if bary.min_element() > BARYCENTRIC_EPSILON {
                    // Shared edges are not overlaps, interior hits are
                    stats.overlapping_samples += 1;
                }
            }
        }
    }

    // Pass 2: emit samples in raster order
    let coverage = 1.0 / (sx * sy) as f32;
    let mut samples = Vec::new();
    let mut texel_covered = vec![false; width as usize * height as usize];
    for y in 0..grid_h {
        for x in 0..grid_w {
            let owner = claims[y as usize * grid_w as usize + x as usize];
            if owner == UNCLAIMED {
                continue;
            }
            let Some(tri) = &triangles[owner as usize] else {
                continue;
            };
            let p = cell_centre(x, y, grid_w, grid_h);
            let bary = barycentric_2d(p, tri.uv[0], tri.uv[1], tri.uv[2], tri.double_area);
            let (position, normal) = tri.interpolate(bary.max(Vec3::ZERO) / bary.max(Vec3::ZERO).element_sum());
            let texel = UVec2::new(x / sx, y / sy);
            texel_covered[texel.y as usize * width as usize + texel.x as usize] = true;
            samples.push(TexelSample {
                position,
                normal,
                texel,
                subsample: (y % sy) * sx + x % sx,
                coverage,
            });
        }
    }
    stats.covered_texels = texel_covered.iter().filter(|&&c| c).count();

    if stats.overlapping_samples > 0 {
        log::debug!(
            "'{}': {} sub-texels claimed by overlapping UV charts",
            ctx.mesh.name,
            stats.overlapping_samples
        );
    }

    SampleSet {
        width,
        height,
        msaa: sx * sy,
        samples,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bakeao_core::primitives::{unit_cube, unit_quad};
    use bakeao_core::{MeshData, UvChannel};
    use glam::Mat4;

    use super::*;

    fn quad_ctx(transform: Mat4) -> MeshContext {
        MeshContext::new(Arc::new(unit_quad("quad")), UvChannel::Uv0, transform)
    }

    #[test]
    fn test_msaa_layouts() {
        assert_eq!(msaa_layout(1), (1, 1));
        assert_eq!(msaa_layout(2), (2, 1));
        assert_eq!(msaa_layout(4), (2, 2));
        assert_eq!(msaa_layout(8), (4, 2));
        assert_eq!(msaa_layout(16), (4, 4));
    }

    #[test]
    fn test_full_quad_covers_every_texel() {
        let set = build_samples(&quad_ctx(Mat4::IDENTITY), 16, 16, 4);
        assert_eq!(set.samples.len(), 16 * 16 * 4);
        assert_eq!(set.stats.covered_texels, 256);
        assert_eq!(set.stats.overlapping_samples, 0);
        assert_eq!(set.stats.degenerate_triangles, 0);
        for s in &set.samples {
            assert!((s.normal - Vec3::Y).length() < 1e-5);
            assert!(s.position.y.abs() < 1e-6);
            assert!((s.coverage - 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn test_row_zero_is_v_zero() {
        let set = build_samples(&quad_ctx(Mat4::IDENTITY), 4, 4, 1);
        // UV v maps to +Z on the quad, so the first row sits at the -Z edge
        let first = set.samples[0];
        assert_eq!(first.texel, UVec2::new(0, 0));
        assert!((first.position.z - (-0.5 + 0.125)).abs() < 1e-5);
        assert!((first.position.x - (-0.5 + 0.125)).abs() < 1e-5);
    }

    #[test]
    fn test_transform_applied() {
        let set = build_samples(
            &quad_ctx(Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0))),
            4,
            4,
            1,
        );
        assert!(set.samples.iter().all(|s| (s.position.y - 2.0).abs() < 1e-5));
    }

    #[test]
    fn test_overlapping_charts_first_wins() {
        // Two identical triangles stacked in UV at different heights
        let positions = vec![
            Vec3::ZERO,
            Vec3::X,
            Vec3::Z,
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 1.0),
        ];
        let uvs = vec![Vec2::ZERO, Vec2::X, Vec2::Y, Vec2::ZERO, Vec2::X, Vec2::Y];
        let mesh = MeshData::new("stack", positions, vec![0, 1, 2, 3, 4, 5])
            .with_uvs(UvChannel::Uv0, uvs);
        let ctx = MeshContext::new(Arc::new(mesh), UvChannel::Uv0, Mat4::IDENTITY);
        let set = build_samples(&ctx, 8, 8, 1);
        assert!(set.stats.overlapping_samples > 0);
        assert!(set.samples.iter().all(|s| s.position.y.abs() < 1e-6));
    }

    #[test]
    fn test_degenerate_triangle_skipped() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Z, Vec3::ZERO];
        let uvs = vec![Vec2::ZERO, Vec2::X, Vec2::Y, Vec2::ZERO];
        // Second triangle collapses to a line in UV
        let mesh = MeshData::new("degen", positions, vec![0, 1, 2, 0, 3, 3])
            .with_uvs(UvChannel::Uv0, uvs);
        let ctx = MeshContext::new(Arc::new(mesh), UvChannel::Uv0, Mat4::IDENTITY);
        let set = build_samples(&ctx, 8, 8, 1);
        assert_eq!(set.stats.degenerate_triangles, 1);
        assert!(!set.samples.is_empty());
    }

    #[test]
    fn test_missing_uv_yields_no_samples() {
        let ctx = MeshContext::new(Arc::new(unit_quad("quad")), UvChannel::Uv2, Mat4::IDENTITY);
        assert!(build_samples(&ctx, 8, 8, 1).samples.is_empty());
    }

    #[test]
    fn test_cube_atlas_has_gaps() {
        let ctx = MeshContext::new(Arc::new(unit_cube("cube")), UvChannel::Uv0, Mat4::IDENTITY);
        let set = build_samples(&ctx, 32, 32, 1);
        assert!(set.stats.covered_texels > 0);
        assert!(set.stats.covered_texels < 32 * 32);
        assert_eq!(set.stats.overlapping_samples, 0);
    }

    #[test]
    fn test_deterministic_output() {
        let ctx = MeshContext::new(Arc::new(unit_cube("cube")), UvChannel::Uv0, Mat4::IDENTITY);
        let a = build_samples(&ctx, 16, 16, 4);
        let b = build_samples(&ctx, 16, 16, 4);
        assert_eq!(a.samples, b.samples);
    }
}
