use std::fmt::Write as _;
use std::path::Path;

use crate::runner::{BenchmarkResult, TimingSeries};

/// Largest change in a scene's mean AO before the output counts as drifted.
pub const AO_DRIFT_TOLERANCE: f32 = 0.02;

/// Results of one run, saved as JSON for later comparison.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Baseline {
    pub timestamp: String,
    /// Quality preset the scenes were baked at. Empty in older files.
    #[serde(default)]
    pub preset: String,
    pub results: Vec<BenchmarkResult>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("baseline I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("baseline JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read a baseline. A missing file is `Ok(None)`; an unreadable or
/// malformed one is an error.
pub fn load_baseline(path: &Path) -> Result<Option<Baseline>, ReportError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&contents)?))
}

pub fn save_baseline(path: &Path, baseline: &Baseline) -> Result<(), ReportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(baseline)?)?;
    Ok(())
}

/// What got worse for a scene relative to the baseline.
#[derive(Debug, Clone, PartialEq)]
pub enum Regression {
    /// Mean bake time grew by `percent`.
    Slower { scene: String, percent: f64 },
    /// Mean AO moved by `delta`, meaning the baked output changed.
    AoDrift { scene: String, delta: f32 },
}

impl Regression {
    pub fn scene(&self) -> &str {
        match self {
            Regression::Slower { scene, .. } | Regression::AoDrift { scene, .. } => scene,
        }
    }
}

/// Check every scene present in both runs. Timing is always compared;
/// AO output only when both runs used the same preset.
pub fn compare(
    current: &[BenchmarkResult],
    current_preset: &str,
    baseline: &Baseline,
    threshold_pct: f64,
) -> Vec<Regression> {
    let same_quality = baseline.preset == current_preset;
    let mut regressions = Vec::new();

    for result in current {
        let Some(base) = baseline
            .results
            .iter()
            .find(|b| b.scene_name == result.scene_name)
        else {
            log::debug!("scene '{}' not in baseline", result.scene_name);
            continue;
        };
        if let Some(percent) = slowdown_pct(&base.timings, &result.timings) {
            if percent > threshold_pct {
                regressions.push(Regression::Slower {
                    scene: result.scene_name.clone(),
                    percent,
                });
            }
        }
        let delta = result.mean_ao - base.mean_ao;
        if same_quality && delta.abs() > AO_DRIFT_TOLERANCE {
            regressions.push(Regression::AoDrift {
                scene: result.scene_name.clone(),
                delta,
            });
        }
    }
    regressions
}

/// Percent change of the mean, or None when the baseline has no usable time.
fn slowdown_pct(base: &TimingSeries, current: &TimingSeries) -> Option<f64> {
    (base.mean_ms > 0.0).then(|| (current.mean_ms / base.mean_ms - 1.0) * 100.0)
}

/// Markdown table with one row per scene.
pub fn format_markdown(results: &[BenchmarkResult]) -> String {
    let mut out = String::from(
        "| Scene | Texels | Rays | Mean (ms) | Median (ms) | P95 (ms) | Mrays/s | Mean AO |\n\
         |-------|--------|------|-----------|-------------|----------|---------|---------|\n",
    );
    for r in results {
        let t = &r.timings;
        let _ = writeln!(
            out,
            "| {} | {} | {} | {:.2} | {:.2} | {:.2} | {:.1} | {:.3} |",
            r.scene_name, r.texels, r.rays, t.mean_ms, t.median_ms, t.p95_ms, r.mrays_per_sec, r.mean_ao,
        );
    }
    out
}

/// Human-readable summary of `compare` output.
pub fn format_comparison(regressions: &[Regression], threshold_pct: f64) -> String {
    if regressions.is_empty() {
        return format!("No regressions: timings within {threshold_pct:.0}%, AO within {AO_DRIFT_TOLERANCE}.\n");
    }
    let mut out = format!("{} regressions:\n", regressions.len());
    for regression in regressions {
        let _ = match regression {
            Regression::Slower { scene, percent } => {
                writeln!(out, "  - {scene}: {percent:+.1}% bake time (limit {threshold_pct:.0}%)")
            }
            Regression::AoDrift { scene, delta } => {
                writeln!(out, "  - {scene}: mean AO moved by {delta:+.3}")
            }
        };
    }
    out
}
