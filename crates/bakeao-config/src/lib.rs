pub mod defaults;
pub mod loader;
pub mod validator;

pub use defaults::{default_presets, preset, PRESET_NAMES};
pub use loader::{
    load_all_presets, load_presets_from_str, load_setup_from_str, setup_to_json, LoadError,
    PresetTable, QualityPreset, SetupDocument, SETUP_DOCUMENT_VERSION,
};
pub use validator::{advisories, validate_presets, validate_quality, validate_setup, Advisory, ValidationError};
