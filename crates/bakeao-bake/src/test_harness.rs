//! End-to-end bake scenarios over the procedural primitives.
//!
//! Each test runs the full pipeline and checks a property of the resulting
//! occlusion map rather than individual stages.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bakeao_core::primitives::{cube_face_uv_rect, plane, unit_cube, unit_quad, uv_sphere};
    use bakeao_core::{
        BakeError, BakingSetup, MeshContext, MeshData, PixelFormat, QualityParameters,
        TextureSize, UvChannel,
    };
    use glam::{Mat4, Quat, Vec2, Vec3};

    use crate::composer::{dilate, OcclusionMap};
    use crate::pipeline::{bake, BakeControl, BakeOutput};

    fn quality(size: u32, rays: u32, msaa: u32) -> QualityParameters {
        QualityParameters {
            texture_size: TextureSize::Square(size),
            rays_per_texel: rays,
            msaa_samples: msaa,
            ..Default::default()
        }
    }

    fn context(mesh: MeshData, transform: Mat4) -> MeshContext {
        MeshContext::new(Arc::new(mesh), UvChannel::Uv0, transform)
    }

    fn run(setup: &BakingSetup) -> BakeOutput {
        bake(setup, &BakeControl::new()).expect("bake succeeds")
    }

    /// Mean over covered texels whose centre lies inside the UV rectangle.
    fn mean_in_rect(map: &OcclusionMap, (min, max): (Vec2, Vec2)) -> f32 {
        let mut sum = 0.0;
        let mut count = 0;
        for y in 0..map.height {
            for x in 0..map.width {
                let uv = Vec2::new(
                    (x as f32 + 0.5) / map.width as f32,
                    (y as f32 + 0.5) / map.height as f32,
                );
                if map.is_covered(x, y) && uv.cmpge(min).all() && uv.cmple(max).all() {
                    sum += map.get(x, y);
                    count += 1;
                }
            }
        }
        assert!(count > 0, "no covered texels in rect");
        sum / count as f32
    }

    #[test]
    fn test_flat_quad_single_ray_is_open() {
        let setup = BakingSetup::new(quality(64, 1, 1), context(unit_quad("quad"), Mat4::IDENTITY));
        let out = run(&setup);
        assert_eq!(out.occlusion.covered_count(), 64 * 64);
        for v in out.texture.pixels.values() {
            assert!((v - 1.0).abs() < 1e-3, "texel value {v}");
        }
    }

    #[test]
    fn test_convex_mesh_without_occluders_is_open() {
        let setup = BakingSetup::new(quality(32, 16, 4), context(unit_cube("cube"), Mat4::IDENTITY));
        let out = run(&setup);
        for y in 0..32 {
            for x in 0..32 {
                if out.occlusion.is_covered(x, y) {
                    assert!((out.occlusion.get(x, y) - 1.0).abs() < 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_lid_over_cube_face() {
        let lid = context(
            unit_quad("lid"),
            Mat4::from_scale_rotation_translation(
                Vec3::new(1.2, 1.0, 1.2),
                Quat::IDENTITY,
                Vec3::new(0.0, 0.51, 0.0),
            ),
        );
        let setup = BakingSetup::new(quality(64, 64, 1), context(unit_cube("cube"), Mat4::IDENTITY))
            .with_occluders(vec![lid]);
        let out = run(&setup);
        // Face 2 is +Y (under the lid), face 3 is -Y
        let top = mean_in_rect(&out.occlusion, cube_face_uv_rect(2));
        let bottom = mean_in_rect(&out.occlusion, cube_face_uv_rect(3));
        assert!(top < 0.1, "top face under lid: {top}");
        assert!(bottom > 0.99, "bottom face: {bottom}");
    }

    #[test]
    fn test_sphere_contact_darkens_underside() {
        let sphere = context(uv_sphere("sphere", 1.0, 16, 32), Mat4::IDENTITY);
        let ground = context(plane("ground", 6.0, 1), Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0)));
        let mut q = quality(32, 64, 1);
        q.max_occluder_distance = 2.0;
        let out = run(&BakingSetup::new(q, sphere).with_occluders(vec![ground]));
        // UV v runs from the north pole (v = 0) to the south pole (v = 1)
        let upper = mean_in_rect(&out.occlusion, (Vec2::new(0.0, 0.05), Vec2::new(1.0, 0.3)));
        let lower = mean_in_rect(&out.occlusion, (Vec2::new(0.0, 0.7), Vec2::new(1.0, 0.95)));
        assert!(upper > lower, "upper {upper} lower {lower}");
    }

    #[test]
    fn test_bake_is_deterministic() {
        let setup = BakingSetup::new(
            quality(32, 16, 4),
            context(uv_sphere("sphere", 1.0, 12, 24), Mat4::IDENTITY),
        )
        .with_occluders(vec![context(
            plane("ground", 4.0, 2),
            Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0)),
        )]);
        let a = run(&setup);
        let b = run(&setup);
        assert_eq!(a.texture.pixels, b.texture.pixels);
        let bits = |m: &OcclusionMap| m.values.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a.occlusion), bits(&b.occlusion));
    }

    #[test]
    fn test_dilation_of_bake_is_idempotent() {
        let mut q = quality(32, 8, 1);
        q.dilation_limit = Some(3);
        let out = run(&BakingSetup::new(q, context(unit_cube("cube"), Mat4::IDENTITY)));
        assert_eq!(dilate(&out.occlusion, Some(3)), out.occlusion);
    }

    #[test]
    fn test_more_rays_lower_variance() {
        let target = context(plane("floor", 2.0, 4), Mat4::IDENTITY);
        let block = context(unit_cube("block"), Mat4::from_translation(Vec3::new(0.0, 0.5, 0.0)));

        let variance_for = |rays: u32| {
            let runs: Vec<Vec<f32>> = (0..8)
                .map(|seed| {
                    let mut q = quality(16, rays, 1);
                    q.seed = seed;
                    q.output_format = PixelFormat::GrayF32;
                    let setup = BakingSetup::new(q, target.clone()).with_occluders(vec![block.clone()]);
                    run(&setup).occlusion.values
                })
                .collect();
            let texels = runs[0].len();
            let mut total = 0.0f64;
            for t in 0..texels {
                let mean = runs.iter().map(|r| r[t] as f64).sum::<f64>() / runs.len() as f64;
                total += runs
                    .iter()
                    .map(|r| (r[t] as f64 - mean).powi(2))
                    .sum::<f64>()
                    / runs.len() as f64;
            }
            total / texels as f64
        };

        let coarse = variance_for(4);
        let fine = variance_for(64);
        assert!(coarse > 0.0);
        assert!(fine < coarse, "variance 64 rays {fine} vs 4 rays {coarse}");
    }

    #[test]
    fn test_missing_uv_channel_fails_without_output() {
        let ctx = MeshContext::new(Arc::new(unit_quad("quad")), UvChannel::Uv1, Mat4::IDENTITY);
        let result = bake(&BakingSetup::new(quality(16, 4, 1), ctx), &BakeControl::new());
        match result {
            Err(BakeError::MissingUvChannel { mesh, channel }) => {
                assert_eq!(mesh, "quad");
                assert_eq!(channel, UvChannel::Uv1);
            }
            other => panic!("expected MissingUvChannel, got {other:?}"),
        }
    }
}
