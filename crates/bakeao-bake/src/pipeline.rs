//! Bake pipeline: validate, sample, build the occluder scene, integrate in
//! parallel, compose.
//!
//! Configuration problems fail the whole bake before any ray is cast.
//! Geometric problems (degenerate triangles, excluded occluders) are
//! recovered locally and reported as warnings.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use bakeao_core::constants::{DEGENERATE_WARNING_FRACTION, MAX_SAMPLES};
use bakeao_core::{BakeError, BakeWarning, BakedTexture, BakingSetup, Provenance};

use crate::composer::{compose, dilate, encode, OcclusionMap};
use crate::integrator::{integrate_samples, IntegratorParams};
use crate::sampler::{build_samples, SamplerStats};
use crate::scene::{OccluderScene, SceneStats};

/// Shared handle for cancelling a bake and polling its progress.
///
/// Progress counts integrated samples. The bake never calls back into the
/// caller; the caller polls `progress()` from any thread.
#[derive(Debug, Default)]
pub struct BakeControl {
    aborted: AtomicBool,
    completed: AtomicUsize,
    total: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BakeProgress {
    pub completed: usize,
    pub total: usize,
}

impl BakeProgress {
    /// Completed fraction in [0, 1]. Zero before integration starts.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            (self.completed as f32 / self.total as f32).min(1.0)
        }
    }
}

impl BakeControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Honoured at the next chunk boundary.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Relaxed)
    }

    pub fn progress(&self) -> BakeProgress {
        BakeProgress {
            completed: self.completed.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn begin(&self, total: usize) {
        self.completed.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    pub(crate) fn advance(&self, count: usize) {
        self.completed.fetch_add(count, Ordering::Relaxed);
    }
}

/// Wall time per stage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BakeTimings {
    pub sampling: Duration,
    pub scene_build: Duration,
    pub integration: Duration,
    pub composition: Duration,
}

impl BakeTimings {
    pub fn total(&self) -> Duration {
        self.sampling + self.scene_build + self.integration + self.composition
    }
}

/// Everything a bake learned besides the texture itself.
#[derive(Debug, Clone, Default)]
pub struct BakeReport {
    pub warnings: Vec<BakeWarning>,
    pub sampler: SamplerStats,
    pub scene: SceneStats,
    pub timings: BakeTimings,
    pub sample_count: usize,
    pub ray_count: u64,
}

impl BakeReport {
    /// Warnings worth showing to a user. Degenerate triangles only count when
    /// they make up a noticeable share of the mesh.
    pub fn significant_warnings(&self) -> Vec<&BakeWarning> {
        self.warnings
            .iter()
            .filter(|w| match w {
                BakeWarning::DegenerateTriangles { count, total } => {
                    *total > 0 && *count as f32 / *total as f32 > DEGENERATE_WARNING_FRACTION
                }
                _ => true,
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct BakeOutput {
    pub texture: BakedTexture,
    /// Dilated occlusion with the coverage mask it was resolved from.
    pub occlusion: OcclusionMap,
    pub report: BakeReport,
}

/// Check everything that can fail a bake without touching geometry beyond
/// validation. Returns the sanitized quality and the warnings gathered.
fn validate_setup(
    setup: &BakingSetup,
) -> Result<(bakeao_core::QualityParameters, Vec<BakeWarning>), BakeError> {
    let (quality, mut warnings) = setup.quality.sanitize()?;

    let target = &setup.mesh_to_bake;
    target.mesh.validate()?;
    if !target.mesh.has_uv(target.uv_channel) {
        return Err(BakeError::MissingUvChannel {
            mesh: target.mesh.name.clone(),
            channel: target.uv_channel,
        });
    }
    for occluder in &setup.occluders {
        occluder.mesh.validate()?;
    }
    if setup.occluders.is_empty() {
        log::warn!(
            "'{}': {}",
            target.mesh.name,
            BakeWarning::EmptyOccluderSet
        );
        warnings.push(BakeWarning::EmptyOccluderSet);
    }

    let (width, height) = quality.dimensions();
    let requested = width as usize * height as usize * quality.msaa_samples as usize;
    if requested > MAX_SAMPLES {
        return Err(BakeError::ResourceExhausted {
            what: "super-samples",
            requested,
            limit: MAX_SAMPLES,
        });
    }
    Ok((quality, warnings))
}

/// Bake ambient occlusion for `setup`.
///
/// Either returns a complete texture or an error; no partial buffer is ever
/// produced.
pub fn bake(setup: &BakingSetup, control: &BakeControl) -> Result<BakeOutput, BakeError> {
    let (quality, mut warnings) = validate_setup(setup)?;
    if control.is_aborted() {
        return Err(BakeError::Aborted);
    }
    let target = &setup.mesh_to_bake;
    let (width, height) = quality.dimensions();
    log::info!(
        "baking '{}' ({}) at {width}x{height}, {} rays, MSAA {}, {} occluders",
        target.mesh.name,
        target.uv_channel,
        quality.rays_per_texel,
        quality.msaa_samples,
        setup.occluders.len()
    );

    let mut timings = BakeTimings::default();

    let start = Instant::now();
    let samples = build_samples(target, width, height, quality.msaa_samples);
    timings.sampling = start.elapsed();
    if samples.stats.degenerate_triangles > 0 {
        let warning = BakeWarning::DegenerateTriangles {
            count: samples.stats.degenerate_triangles,
            total: samples.stats.total_triangles,
        };
        log::warn!("'{}': {warning}", target.mesh.name);
        warnings.push(warning);
    }

    let start = Instant::now();
    let scene = OccluderScene::build(target, &setup.occluders, &quality)?;
    timings.scene_build = start.elapsed();
    let scene_stats = scene.stats();
    if scene_stats.excluded_occluders > 0 {
        let warning = BakeWarning::OccludersExcluded {
            count: scene_stats.excluded_occluders,
        };
        log::warn!("'{}': {warning}", target.mesh.name);
        warnings.push(warning);
    }

    let params = IntegratorParams::new(&quality, target);
    control.begin(samples.samples.len());
    let start = Instant::now();
    let occlusion = integrate_samples(&samples.samples, &scene, &params, control)?;
    timings.integration = start.elapsed();

    let start = Instant::now();
    let resolved = compose(&samples.samples, &occlusion, width, height);
    let dilated = dilate(&resolved, quality.dilation_limit);
    let pixels = encode(&dilated, quality.output_format);
    timings.composition = start.elapsed();

    let report = BakeReport {
        warnings,
        sampler: samples.stats,
        scene: scene_stats,
        timings,
        sample_count: samples.samples.len(),
        ray_count: samples.samples.len() as u64 * quality.rays_per_texel as u64,
    };
    log::info!(
        "baked '{}': {} samples, {} covered texels in {:.1} ms",
        target.mesh.name,
        report.sample_count,
        report.sampler.covered_texels,
        timings.total().as_secs_f64() * 1000.0
    );

    Ok(BakeOutput {
        texture: BakedTexture {
            pixels,
            provenance: Provenance::for_setup(setup),
        },
        occlusion: dilated,
        report,
    })
}
