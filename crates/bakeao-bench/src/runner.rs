use std::time::Instant;

use bakeao_bake::{bake, BakeControl};
use bakeao_core::BakeError;

use crate::scenes::SceneConfig;

/// Wall-clock statistics over repeated bakes of one scene.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimingSeries {
    pub mean_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl TimingSeries {
    /// Statistics over `samples` in milliseconds. Non-finite samples are dropped.
    pub fn from_samples(samples: &[f64]) -> Self {
        let mut sorted: Vec<f64> = samples.iter().copied().filter(|t| t.is_finite()).collect();
        let (Some(&min_ms), Some(&max_ms)) = (
            sorted.iter().min_by(|a, b| a.total_cmp(b)),
            sorted.iter().max_by(|a, b| a.total_cmp(b)),
        ) else {
            return Self::default();
        };
        sorted.sort_by(f64::total_cmp);
        Self {
            mean_ms: sorted.iter().sum::<f64>() / sorted.len() as f64,
            median_ms: percentile(&sorted, 0.5),
            p95_ms: percentile(&sorted, 0.95),
            min_ms,
            max_ms,
        }
    }
}

/// Linear interpolation between the closest ranks of a sorted, non-empty slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// One scene's bake cost and output summary.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BenchmarkResult {
    pub scene_name: String,
    pub texels: u64,
    pub rays: u64,
    pub repeats: u32,
    /// Mean occlusion over covered texels of the last bake.
    pub mean_ao: f32,
    /// Millions of rays traced per second, from the mean bake time.
    #[serde(default)]
    pub mrays_per_sec: f64,
    pub timings: TimingSeries,
}

/// Bakes scenes on the CPU thread pool.
pub struct BenchmarkRunner {
    repeats: u32,
}

impl BenchmarkRunner {
    pub fn new(repeats: u32) -> Self {
        Self {
            repeats: repeats.max(1),
        }
    }

    /// Bake a scene `repeats` times and return timing results.
    pub fn run_scene(&self, config: &SceneConfig) -> Result<BenchmarkResult, BakeError> {
        let target = &config.setup.mesh_to_bake;
        log::info!(
            "Running scene '{}' ({} target triangles, {} occluders)...",
            config.name,
            target.mesh.triangle_count(),
            config.setup.occluders.len()
        );

        let mut bake_times = Vec::with_capacity(self.repeats as usize);
        let mut last = None;
        for _ in 0..self.repeats {
            let control = BakeControl::new();
            let start = Instant::now();
            let output = bake(&config.setup, &control)?;
            bake_times.push(start.elapsed().as_secs_f64() * 1000.0);
            last = Some(output);
        }
        let Some(output) = last else {
            return Err(BakeError::Aborted);
        };

        let timings = TimingSeries::from_samples(&bake_times);
        let rays = output.report.ray_count;
        let mrays_per_sec = if timings.mean_ms > 0.0 {
            rays as f64 / (timings.mean_ms * 1000.0)
        } else {
            0.0
        };
        log::info!(
            "  Done: mean={:.2}ms, p95={:.2}ms, {:.1} Mrays/s",
            timings.mean_ms,
            timings.p95_ms,
            mrays_per_sec
        );

        Ok(BenchmarkResult {
            scene_name: config.name.to_string(),
            texels: output.texture.pixels.pixel_count() as u64,
            rays,
            repeats: self.repeats,
            mean_ao: output.occlusion.covered_mean(),
            mrays_per_sec,
            timings,
        })
    }
}

#[cfg(test)]
mod tests {
    use bakeao_core::{QualityParameters, TextureSize};

    use super::*;
    use crate::scenes::standard_scenes;

    #[test]
    fn test_timing_series() {
        let t = TimingSeries::from_samples(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(t.mean_ms, 2.5);
        assert_eq!(t.median_ms, 2.5);
        assert_eq!(t.min_ms, 1.0);
        assert_eq!(t.max_ms, 4.0);
        assert!((t.p95_ms - 3.85).abs() < 1e-9);
    }

    #[test]
    fn test_timing_series_degenerate_input() {
        assert_eq!(TimingSeries::from_samples(&[]), TimingSeries::default());
        let t = TimingSeries::from_samples(&[f64::NAN, 7.0]);
        assert_eq!(t.mean_ms, 7.0);
        assert_eq!(t.p95_ms, 7.0);
    }

    #[test]
    fn test_run_flat_quad() {
        let quality = QualityParameters {
            texture_size: TextureSize::Square(16),
            rays_per_texel: 4,
            msaa_samples: 1,
            ..Default::default()
        };
        let scenes = standard_scenes(quality);
        let result = BenchmarkRunner::new(2)
            .run_scene(&scenes[0])
            .expect("bake succeeds");
        assert_eq!(result.texels, 256);
        assert_eq!(result.rays, 256 * 4);
        assert!((result.mean_ao - 1.0).abs() < 1e-3);
        assert!(result.mrays_per_sec >= 0.0);
    }
}
