//! Occlusion integrator: cosine-weighted hemisphere rays per sample.
//!
//! Directions come from a golden-ratio stratified set that is rotated per
//! sample (Cranley–Patterson) by a hash of the texel, sub-sample and seed.
//! Each sample depends on nothing else, so integration is an embarrassingly
//! parallel map over the sample array.

use std::f32::consts::TAU;

use bakeao_core::constants::SELF_HIT_EPSILON_TEXELS;
use bakeao_core::{BakeError, MeshContext, OcclusionMode, QualityParameters};
use glam::Vec3;
use rayon::prelude::*;

use crate::pipeline::BakeControl;
use crate::rng::{hash_to_float, rehash, texel_hash};
use crate::sampler::TexelSample;
use crate::scene::OccluderScene;

/// Samples integrated between two abort checks.
pub(crate) const CHUNK_SIZE: usize = 1024;

/// Fractional part of the golden ratio.
const GOLDEN_FRACTION: f32 = 0.618_034;

/// Per-bake ray casting parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegratorParams {
    pub rays_per_texel: u32,
    /// World-space ray length.
    pub max_distance: f32,
    /// World-space origin offset along the normal.
    pub normal_bias: f32,
    /// Hits closer than this are treated as self-hits and ignored.
    pub min_distance: f32,
    pub mode: OcclusionMode,
    pub seed: u32,
}

impl IntegratorParams {
    /// Derive parameters from sanitized quality settings and the target.
    pub fn new(quality: &QualityParameters, target: &MeshContext) -> Self {
        let (width, height) = quality.dimensions();
        Self {
            rays_per_texel: quality.rays_per_texel,
            max_distance: quality.max_occluder_distance,
            normal_bias: quality.normal_bias,
            min_distance: SELF_HIT_EPSILON_TEXELS * target.texel_world_size(width, height),
            mode: quality.occlusion_mode,
            seed: quality.seed,
        }
    }
}

/// Cosine-weighted direction in the local frame (z up) for the unit square
/// point `(u1, u2)`.
fn cosine_direction(u1: f32, u2: f32) -> Vec3 {
    let r = u1.sqrt();
    let phi = TAU * u2;
    Vec3::new(r * phi.cos(), r * phi.sin(), (1.0 - u1).max(0.0).sqrt())
}

/// Occlusion for one sample in [0, 1], 1 meaning fully open.
pub fn integrate(sample: &TexelSample, scene: &OccluderScene, params: &IntegratorParams) -> f32 {
    if scene.is_empty() || params.rays_per_texel == 0 {
        return 1.0;
    }
    let normal = sample.normal;
    let (tangent, bitangent) = normal.any_orthonormal_pair();
    let origin = sample.position + normal * params.normal_bias;

    let hash = texel_hash(sample.texel.x, sample.texel.y, sample.subsample, params.seed);
    let shift_u = hash_to_float(hash);
    let shift_v = hash_to_float(rehash(hash, 1));

    let rays = params.rays_per_texel;
    let inv_rays = 1.0 / rays as f32;
    let first_hit_only = params.mode == OcclusionMode::Binary && scene.has_uniform_strength();
    let mut occlusion = 0.0f32;

    for i in 0..rays {
        let u1 = ((i as f32 + 0.5) * inv_rays + shift_u).fract();
        let u2 = (i as f32 * GOLDEN_FRACTION + shift_v).fract();
        let local = cosine_direction(u1, u2);
        let dir = (tangent * local.x + bitangent * local.y + normal * local.z).normalize();

        if first_hit_only {
            if let Some(strength) =
                scene.any_hit_in(origin, dir, params.min_distance, params.max_distance)
            {
                occlusion += strength;
            }
            continue;
        }
        let Some(hit) = scene.nearest_hit_in(origin, dir, params.min_distance, params.max_distance)
        else {
            continue;
        };
        occlusion += match params.mode {
            OcclusionMode::Binary => hit.strength,
            OcclusionMode::DistanceAttenuated => {
                hit.strength * (1.0 - hit.distance / params.max_distance).max(0.0)
            }
        };
    }

    (1.0 - occlusion * inv_rays).clamp(0.0, 1.0)
}

/// Integrate every sample in parallel, one value per sample in input order.
///
/// Abort is checked once per chunk; an aborted run returns
/// `BakeError::Aborted` and discards everything computed so far.
pub fn integrate_samples(
    samples: &[TexelSample],
    scene: &OccluderScene,
    params: &IntegratorParams,
    control: &BakeControl,
) -> Result<Vec<f32>, BakeError> {
    let chunks: Vec<Vec<f32>> = samples
        .par_chunks(CHUNK_SIZE)
        .map(|chunk| {
            if control.is_aborted() {
                return Err(BakeError::Aborted);
            }
            let values: Vec<f32> = chunk.iter().map(|s| integrate(s, scene, params)).collect();
            control.advance(chunk.len());
            Ok(values)
        })
        .collect::<Result<_, _>>()?;

    if control.is_aborted() {
        return Err(BakeError::Aborted);
    }
    Ok(chunks.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bakeao_core::primitives::unit_quad;
    use bakeao_core::{MeshContextFlags, UvChannel};
    use glam::{Mat4, UVec2};

    use super::*;

    fn sample_at(position: Vec3, normal: Vec3) -> TexelSample {
        TexelSample {
            position,
            normal,
            texel: UVec2::new(3, 4),
            subsample: 0,
            coverage: 1.0,
        }
    }

    fn params(rays: u32, mode: OcclusionMode) -> IntegratorParams {
        IntegratorParams {
            rays_per_texel: rays,
            max_distance: 10.0,
            normal_bias: 0.001,
            min_distance: 1e-5,
            mode,
            seed: 0,
        }
    }

    fn lid_scene(height: f32) -> OccluderScene {
        let floor = MeshContext::new(Arc::new(unit_quad("floor")), UvChannel::Uv0, Mat4::IDENTITY)
            .with_flags(MeshContextFlags::DONT_COMBINE);
        let lid = MeshContext::new(
            Arc::new(unit_quad("lid")),
            UvChannel::Uv0,
            Mat4::from_scale_rotation_translation(
                Vec3::splat(100.0),
                glam::Quat::IDENTITY,
                Vec3::new(0.0, height, 0.0),
            ),
        );
        OccluderScene::build(&floor, &[lid], &QualityParameters::default()).expect("scene builds")
    }

    #[test]
    fn test_cosine_direction_in_hemisphere() {
        for i in 0..32 {
            for j in 0..32 {
                let d = cosine_direction(i as f32 / 32.0, j as f32 / 32.0);
                assert!((d.length() - 1.0).abs() < 1e-5);
                assert!(d.z > 0.0);
            }
        }
    }

    #[test]
    fn test_empty_scene_is_open() {
        let floor = MeshContext::new(Arc::new(unit_quad("floor")), UvChannel::Uv0, Mat4::IDENTITY)
            .with_flags(MeshContextFlags::DONT_COMBINE);
        let scene = OccluderScene::build(&floor, &[], &QualityParameters::default())
            .expect("scene builds");
        let value = integrate(&sample_at(Vec3::ZERO, Vec3::Y), &scene, &params(16, OcclusionMode::Binary));
        assert_eq!(value, 1.0);
    }

    #[test]
    fn test_wide_lid_fully_occludes() {
        let scene = lid_scene(0.5);
        let value = integrate(
            &sample_at(Vec3::new(0.1, 0.0, 0.2), Vec3::Y),
            &scene,
            &params(64, OcclusionMode::Binary),
        );
        assert!(value < 0.01, "occlusion under lid: {value}");
    }

    #[test]
    fn test_facing_away_from_lid_is_open() {
        let scene = lid_scene(0.5);
        let value = integrate(
            &sample_at(Vec3::new(0.1, 0.0, 0.2), Vec3::NEG_Y),
            &scene,
            &params(64, OcclusionMode::Binary),
        );
        assert_eq!(value, 1.0);
    }

    #[test]
    fn test_out_of_range_lid_ignored() {
        let scene = lid_scene(0.5);
        let mut p = params(64, OcclusionMode::Binary);
        p.max_distance = 0.25;
        let value = integrate(&sample_at(Vec3::new(0.1, 0.0, 0.2), Vec3::Y), &scene, &p);
        assert_eq!(value, 1.0);
    }

    #[test]
    fn test_distance_attenuation_weakens_far_hits() {
        let scene = lid_scene(0.5);
        let sample = sample_at(Vec3::new(0.1, 0.0, 0.2), Vec3::Y);
        let mut p = params(64, OcclusionMode::DistanceAttenuated);
        p.max_distance = 1.0;
        let attenuated = integrate(&sample, &scene, &p);
        p.mode = OcclusionMode::Binary;
        let binary = integrate(&sample, &scene, &p);
        assert!(attenuated > binary);
        assert!(attenuated < 1.0);
    }

    #[test]
    fn test_integration_is_deterministic() {
        let scene = lid_scene(0.3);
        let sample = sample_at(Vec3::new(0.45, 0.0, 0.45), Vec3::new(1.0, 1.0, 0.0).normalize());
        let p = params(32, OcclusionMode::Binary);
        assert_eq!(
            integrate(&sample, &scene, &p).to_bits(),
            integrate(&sample, &scene, &p).to_bits()
        );
    }

    #[test]
    fn test_aborted_control_returns_error() {
        let scene = lid_scene(0.5);
        let control = BakeControl::new();
        control.abort();
        let samples = vec![sample_at(Vec3::ZERO, Vec3::Y); 10];
        let result = integrate_samples(&samples, &scene, &params(4, OcclusionMode::Binary), &control);
        assert!(matches!(result, Err(BakeError::Aborted)));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let scene = lid_scene(0.3);
        let samples: Vec<TexelSample> = (0..3000)
            .map(|i| TexelSample {
                position: Vec3::new((i % 50) as f32 * 0.01 - 0.25, 0.0, (i / 50) as f32 * 0.01 - 0.3),
                normal: Vec3::Y,
                texel: UVec2::new(i % 50, i / 50),
                subsample: 0,
                coverage: 1.0,
            })
            .collect();
        let p = params(8, OcclusionMode::DistanceAttenuated);
        let control = BakeControl::new();
        let parallel = integrate_samples(&samples, &scene, &p, &control).expect("not aborted");
        let sequential: Vec<f32> = samples.iter().map(|s| integrate(s, &scene, &p)).collect();
        assert_eq!(parallel, sequential);
        assert_eq!(control.progress().completed, samples.len());
    }
}
