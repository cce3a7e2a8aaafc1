//! Quality parameters and their sanitization.
//!
//! `QualityParameters::sanitize` is the only entry point the bake pipeline
//! uses: hard errors for values that make a bake meaningless, clamps plus
//! warnings for values that are merely out of range.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{BakeError, BakeWarning};

/// Destination texture dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureSize {
    /// Square texture with the given edge.
    Square(u32),
    /// Explicit width × height.
    Explicit { width: u32, height: u32 },
}

impl Default for TextureSize {
    fn default() -> Self {
        TextureSize::Square(DEFAULT_TEXTURE_SIZE)
    }
}

impl TextureSize {
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            TextureSize::Square(edge) => (edge, edge),
            TextureSize::Explicit { width, height } => (width, height),
        }
    }

    pub fn largest_edge(self) -> u32 {
        let (w, h) = self.dimensions();
        w.max(h)
    }
}

/// How a ray hit contributes to occlusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OcclusionMode {
    /// Every hit within range counts fully.
    #[default]
    Binary,
    /// Hits are weighted by `1 - distance / max_distance`.
    DistanceAttenuated,
}

/// Pixel format of the encoded output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    #[default]
    Gray8,
    Gray16,
    GrayF32,
    /// Occlusion replicated into RGB, alpha opaque.
    Rgba8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Gray16 => 2,
            PixelFormat::GrayF32 | PixelFormat::Rgba8 => 4,
        }
    }
}

/// Rules for which nearby scene objects count as occluders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextBakingSettings {
    /// When false only the target itself (and explicit occluders) occlude.
    pub enabled: bool,
    /// Bit mask of scene layers that may occlude.
    pub layer_mask: u32,
    /// Extra world distance added to `max_occluder_distance` when searching
    /// for candidate occluders.
    #[serde(default)]
    pub search_margin: f32,
}

impl Default for ContextBakingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            layer_mask: u32::MAX,
            search_margin: 0.0,
        }
    }
}

/// Full set of user-facing quality knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityParameters {
    pub texture_size: TextureSize,
    pub rays_per_texel: u32,
    /// World-space reach of occlusion rays.
    pub max_occluder_distance: f32,
    /// Super-samples per texel: 1, 2, 4, 8 or 16.
    pub msaa_samples: u32,
    /// World-space ray origin offset along the normal.
    pub normal_bias: f32,
    #[serde(default)]
    pub occlusion_mode: OcclusionMode,
    /// Maximum dilation distance in texels. `None` fills the whole texture.
    #[serde(default)]
    pub dilation_limit: Option<u32>,
    /// Seed mixed into every per-texel sequence.
    #[serde(default)]
    pub seed: u32,
    #[serde(default)]
    pub output_format: PixelFormat,
    #[serde(default)]
    pub context: ContextBakingSettings,
}

impl Default for QualityParameters {
    fn default() -> Self {
        Self {
            texture_size: TextureSize::default(),
            rays_per_texel: DEFAULT_RAYS_PER_TEXEL,
            max_occluder_distance: DEFAULT_MAX_OCCLUDER_DISTANCE,
            msaa_samples: DEFAULT_MSAA,
            normal_bias: DEFAULT_NORMAL_BIAS,
            occlusion_mode: OcclusionMode::default(),
            dilation_limit: None,
            seed: 0,
            output_format: PixelFormat::default(),
            context: ContextBakingSettings::default(),
        }
    }
}

impl QualityParameters {
    pub fn dimensions(&self) -> (u32, u32) {
        self.texture_size.dimensions()
    }

    /// Reject meaningless values and clamp out-of-range ones.
    ///
    /// Returns the clamped copy together with the warnings describing every
    /// adjustment that was made.
    pub fn sanitize(&self) -> Result<(QualityParameters, Vec<BakeWarning>), BakeError> {
        let (width, height) = self.dimensions();
        if width == 0 || height == 0 {
            return Err(BakeError::InvalidQuality(format!(
                "texture size must be positive, got {width}x{height}"
            )));
        }
        if self.rays_per_texel == 0 {
            return Err(BakeError::InvalidQuality(
                "rays per texel must be positive".into(),
            ));
        }
        if !self.max_occluder_distance.is_finite() || self.max_occluder_distance <= 0.0 {
            return Err(BakeError::InvalidQuality(format!(
                "max occluder distance must be a positive number, got {}",
                self.max_occluder_distance
            )));
        }
        if !self.normal_bias.is_finite() || self.normal_bias < 0.0 {
            return Err(BakeError::InvalidQuality(format!(
                "normal bias must be a non-negative number, got {}",
                self.normal_bias
            )));
        }

        let mut out = *self;
        let mut warnings = Vec::new();

        let clamped_w = width.min(MAX_TEXTURE_SIZE);
        let clamped_h = height.min(MAX_TEXTURE_SIZE);
        if (clamped_w, clamped_h) != (width, height) {
            warnings.push(BakeWarning::Quality(format!(
                "texture size {width}x{height} clamped to {clamped_w}x{clamped_h}"
            )));
            out.texture_size = if clamped_w == clamped_h {
                TextureSize::Square(clamped_w)
            } else {
                TextureSize::Explicit {
                    width: clamped_w,
                    height: clamped_h,
                }
            };
        }

        if self.rays_per_texel > MAX_RAYS_PER_TEXEL {
            warnings.push(BakeWarning::Quality(format!(
                "rays per texel {} clamped to {MAX_RAYS_PER_TEXEL}",
                self.rays_per_texel
            )));
            out.rays_per_texel = MAX_RAYS_PER_TEXEL;
        }

        if !SUPPORTED_MSAA.contains(&self.msaa_samples) {
            let snapped = snap_msaa(self.msaa_samples);
            warnings.push(BakeWarning::Quality(format!(
                "unsupported MSAA sample count {} snapped to {snapped}",
                self.msaa_samples
            )));
            out.msaa_samples = snapped;
        }

        if out.msaa_samples > MSAA_WARNING_SAMPLES
            && out.texture_size.largest_edge() > MSAA_WARNING_TEXTURE_SIZE
        {
            warnings.push(BakeWarning::Quality(format!(
                "MSAA {} with a {}px texture greatly increases bake time; 4 is usually enough",
                out.msaa_samples,
                out.texture_size.largest_edge()
            )));
        }

        for w in &warnings {
            log::warn!("{w}");
        }

        Ok((out, warnings))
    }

    pub(crate) fn hash_into<H: Hasher>(&self, hasher: &mut H) {
        self.texture_size.hash(hasher);
        self.rays_per_texel.hash(hasher);
        self.max_occluder_distance.to_bits().hash(hasher);
        self.msaa_samples.hash(hasher);
        self.normal_bias.to_bits().hash(hasher);
        self.occlusion_mode.hash(hasher);
        self.dilation_limit.hash(hasher);
        self.seed.hash(hasher);
        self.output_format.hash(hasher);
    }
}

/// Largest supported MSAA count not above `samples` (at least 1).
fn snap_msaa(samples: u32) -> u32 {
    SUPPORTED_MSAA
        .iter()
        .copied()
        .filter(|&s| s <= samples.max(1))
        .max()
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_sanitize_cleanly() {
        let (q, warnings) = QualityParameters::default()
            .sanitize()
            .expect("defaults are valid");
        assert!(warnings.is_empty());
        assert_eq!(q, QualityParameters::default());
    }

    #[test]
    fn test_zero_texture_size_rejected() {
        let q = QualityParameters {
            texture_size: TextureSize::Explicit {
                width: 0,
                height: 64,
            },
            ..Default::default()
        };
        assert!(matches!(q.sanitize(), Err(BakeError::InvalidQuality(_))));
    }

    #[test]
    fn test_zero_rays_rejected() {
        let q = QualityParameters {
            rays_per_texel: 0,
            ..Default::default()
        };
        assert!(matches!(q.sanitize(), Err(BakeError::InvalidQuality(_))));
    }

    #[test]
    fn test_non_finite_distance_rejected() {
        let q = QualityParameters {
            max_occluder_distance: f32::NAN,
            ..Default::default()
        };
        assert!(q.sanitize().is_err());
    }

    #[test]
    fn test_oversized_values_clamped() {
        let q = QualityParameters {
            texture_size: TextureSize::Square(20_000),
            rays_per_texel: 100_000,
            msaa_samples: 1,
            ..Default::default()
        };
        let (out, warnings) = q.sanitize().expect("clamped");
        assert_eq!(out.texture_size, TextureSize::Square(MAX_TEXTURE_SIZE));
        assert_eq!(out.rays_per_texel, MAX_RAYS_PER_TEXEL);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_msaa_snapped() {
        assert_eq!(snap_msaa(0), 1);
        assert_eq!(snap_msaa(3), 2);
        assert_eq!(snap_msaa(12), 8);
        assert_eq!(snap_msaa(64), 16);
    }

    #[test]
    fn test_high_msaa_large_texture_warns() {
        let q = QualityParameters {
            texture_size: TextureSize::Square(2048),
            msaa_samples: 16,
            ..Default::default()
        };
        let (out, warnings) = q.sanitize().expect("valid");
        assert_eq!(out.msaa_samples, 16);
        assert_eq!(warnings.len(), 1);
    }
}
