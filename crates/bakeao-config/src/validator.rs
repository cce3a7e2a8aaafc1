use std::collections::HashSet;

use bakeao_core::constants::{
    DISTANCE_WARNING_EXTENT_FRACTION, MAX_RAYS_PER_TEXEL, MAX_TEXTURE_SIZE, MSAA_WARNING_SAMPLES,
    MSAA_WARNING_TEXTURE_SIZE, SUPPORTED_MSAA,
};
use bakeao_core::setup::largest_world_extent;
use bakeao_core::{BakingSetup, MeshContext, QualityParameters};
use thiserror::Error;

use crate::loader::PresetTable;

/// Texels per world unit below which a bake is flagged as blurry.
pub const LOW_TEXEL_DENSITY: f32 = 16.0;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Duplicate quality preset '{0}'")]
    DuplicatePreset(String),
    #[error("Texture size {width}x{height} must be positive")]
    ZeroTextureSize { width: u32, height: u32 },
    #[error("Texture size {value} exceeds max {max}")]
    TextureSizeExceedsMax { value: u32, max: u32 },
    #[error("Rays per texel must be positive")]
    ZeroRays,
    #[error("Rays per texel {value} exceeds max {max}")]
    RaysExceedMax { value: u32, max: u32 },
    #[error("Max occluder distance {0} must be a positive number")]
    InvalidOccluderDistance(f32),
    #[error("Normal bias {0} must be a non-negative number")]
    InvalidNormalBias(f32),
    #[error("MSAA sample count {0} is not one of 1, 2, 4, 8, 16")]
    UnsupportedMsaa(u32),
    #[error("Mesh '{name}': {reason}")]
    InvalidMesh { name: String, reason: String },
    #[error("Mesh '{name}' has no {channel} data")]
    MissingUvChannel { name: String, channel: String },
    #[error("Occluder '{name}' strength {value} is outside 0..1")]
    OccluderStrengthOutOfRange { name: String, value: f32 },
}

/// Non-blocking observations about a setup. A bake with advisories still runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Advisory {
    HighMsaaLargeTexture { msaa: u32, size: u32 },
    OccluderDistanceExceedsBounds { distance: f32, extent: f32 },
    LowTexelDensity { texels_per_unit: f32 },
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Advisory::HighMsaaLargeTexture { msaa, size } => write!(
                f,
                "MSAA {msaa} on a {size}px texture increases bake time with little visible gain"
            ),
            Advisory::OccluderDistanceExceedsBounds { distance, extent } => write!(
                f,
                "max occluder distance {distance} is large compared to the mesh size {extent}; \
                 the result may look uniformly dark"
            ),
            Advisory::LowTexelDensity { texels_per_unit } => write!(
                f,
                "only {texels_per_unit:.1} texels per world unit; the texture will look blurry"
            ),
        }
    }
}

/// Validate quality parameters without clamping anything.
pub fn validate_quality(quality: &QualityParameters) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let (width, height) = quality.dimensions();
    if width == 0 || height == 0 {
        errors.push(ValidationError::ZeroTextureSize { width, height });
    }
    let largest = width.max(height);
    if largest > MAX_TEXTURE_SIZE {
        errors.push(ValidationError::TextureSizeExceedsMax {
            value: largest,
            max: MAX_TEXTURE_SIZE,
        });
    }
    if quality.rays_per_texel == 0 {
        errors.push(ValidationError::ZeroRays);
    }
    if quality.rays_per_texel > MAX_RAYS_PER_TEXEL {
        errors.push(ValidationError::RaysExceedMax {
            value: quality.rays_per_texel,
            max: MAX_RAYS_PER_TEXEL,
        });
    }
    if !quality.max_occluder_distance.is_finite() || quality.max_occluder_distance <= 0.0 {
        errors.push(ValidationError::InvalidOccluderDistance(
            quality.max_occluder_distance,
        ));
    }
    if !quality.normal_bias.is_finite() || quality.normal_bias < 0.0 {
        errors.push(ValidationError::InvalidNormalBias(quality.normal_bias));
    }
    if !SUPPORTED_MSAA.contains(&quality.msaa_samples) {
        errors.push(ValidationError::UnsupportedMsaa(quality.msaa_samples));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_mesh(ctx: &MeshContext, errors: &mut Vec<ValidationError>) {
    if let Err(e) = ctx.mesh.validate() {
        errors.push(ValidationError::InvalidMesh {
            name: ctx.mesh.name.clone(),
            reason: e.to_string(),
        });
    }
}

/// Validate a whole setup: quality, target mesh and UV channel, occluders.
pub fn validate_setup(setup: &BakingSetup) -> Result<(), Vec<ValidationError>> {
    let mut errors = validate_quality(&setup.quality).err().unwrap_or_default();

    let target = &setup.mesh_to_bake;
    check_mesh(target, &mut errors);
    if !target.mesh.has_uv(target.uv_channel) {
        errors.push(ValidationError::MissingUvChannel {
            name: target.mesh.name.clone(),
            channel: target.uv_channel.to_string(),
        });
    }
    for occluder in &setup.occluders {
        check_mesh(occluder, &mut errors);
        if !(0.0..=1.0).contains(&occluder.occluder_strength) {
            errors.push(ValidationError::OccluderStrengthOutOfRange {
                name: occluder.mesh.name.clone(),
                value: occluder.occluder_strength,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Collect advisories for a setup that already validates.
pub fn advisories(setup: &BakingSetup) -> Vec<Advisory> {
    let mut out = Vec::new();
    let quality = &setup.quality;
    let size = quality.texture_size.largest_edge();

    if quality.msaa_samples > MSAA_WARNING_SAMPLES && size > MSAA_WARNING_TEXTURE_SIZE {
        out.push(Advisory::HighMsaaLargeTexture {
            msaa: quality.msaa_samples,
            size,
        });
    }

    let extent = largest_world_extent(&setup.mesh_to_bake);
    if extent > 0.0 && quality.max_occluder_distance > DISTANCE_WARNING_EXTENT_FRACTION * extent {
        out.push(Advisory::OccluderDistanceExceedsBounds {
            distance: quality.max_occluder_distance,
            extent,
        });
    }

    let ratio = setup.mesh_to_bake.uv_to_world_ratio;
    if ratio > 0.0 {
        let texels_per_unit = size as f32 / ratio;
        if texels_per_unit < LOW_TEXEL_DENSITY {
            out.push(Advisory::LowTexelDensity { texels_per_unit });
        }
    }

    for advisory in &out {
        log::warn!("'{}': {advisory}", setup.mesh_to_bake.mesh.name);
    }
    out
}

/// Validate a preset table: unique names and valid quality in every preset.
pub fn validate_presets(table: &PresetTable) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for preset in &table.presets {
        if !seen.insert(preset.name.to_ascii_lowercase()) {
            errors.push(ValidationError::DuplicatePreset(preset.name.clone()));
        }
        if let Err(mut quality_errors) = validate_quality(&preset.quality) {
            errors.append(&mut quality_errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
