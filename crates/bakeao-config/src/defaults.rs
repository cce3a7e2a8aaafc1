//! Built-in quality presets, compiled into the binary.

use bakeao_core::QualityParameters;

use crate::loader::{load_presets_from_str, LoadError, PresetTable};

pub const DEFAULT_PRESETS_RON: &str = include_str!("../../../data/quality/presets.ron");

/// Names of the built-in presets, from fastest to slowest.
pub const PRESET_NAMES: [&str; 4] = ["low", "medium", "high", "ultra"];

pub fn default_presets() -> Result<PresetTable, LoadError> {
    load_presets_from_str(DEFAULT_PRESETS_RON)
}

/// Look up a built-in preset by name (case-insensitive).
pub fn preset(name: &str) -> Result<QualityParameters, LoadError> {
    default_presets()?
        .get(name)
        .copied()
        .ok_or_else(|| LoadError::UnknownPreset(name.to_string()))
}
