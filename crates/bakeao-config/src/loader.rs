use std::sync::Arc;

use bakeao_core::{
    BakingSetup, LodGroupId, MeshContext, MeshContextFlags, MeshData, QualityParameters, UvChannel,
};
use glam::Mat4;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current baking-setup document version.
pub const SETUP_DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to parse quality presets RON: {0}")]
    PresetParseError(String),
    #[error("Failed to parse baking setup JSON: {0}")]
    SetupParseError(String),
    #[error("Failed to write baking setup JSON: {0}")]
    SetupWriteError(String),
    #[error("Unsupported baking setup version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("Unknown quality preset '{0}'")]
    UnknownPreset(String),
}

/// Named quality settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityPreset {
    pub name: String,
    pub quality: QualityParameters,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetTable {
    pub presets: Vec<QualityPreset>,
}

impl PresetTable {
    pub fn get(&self, name: &str) -> Option<&QualityParameters> {
        self.presets
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| &p.quality)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.iter().map(|p| p.name.as_str())
    }
}

/// Parse a single presets RON string into a PresetTable.
pub fn load_presets_from_str(ron_str: &str) -> Result<PresetTable, LoadError> {
    let options = ron::Options::default();
    let presets: Vec<QualityPreset> = options
        .from_str(ron_str)
        .map_err(|e| LoadError::PresetParseError(e.to_string()))?;
    Ok(PresetTable { presets })
}

/// Load and merge several preset sources. Later sources override earlier
/// presets with the same name.
pub fn load_all_presets(sources: &[&str]) -> Result<PresetTable, LoadError> {
    let mut table = PresetTable::default();
    for source in sources {
        for preset in load_presets_from_str(source)?.presets {
            match table.presets.iter_mut().find(|p| p.name == preset.name) {
                Some(existing) => {
                    log::info!("quality preset '{}' overridden", preset.name);
                    *existing = preset;
                }
                None => table.presets.push(preset),
            }
        }
    }
    Ok(table)
}

fn default_strength() -> f32 {
    1.0
}

fn identity() -> Mat4 {
    Mat4::IDENTITY
}

/// Serialized form of a `MeshContext`. The mesh is stored inline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshContextDocument {
    pub mesh: MeshData,
    #[serde(default)]
    pub uv_channel: UvChannel,
    #[serde(default = "identity")]
    pub object_to_world: Mat4,
    #[serde(default)]
    pub flags: MeshContextFlags,
    #[serde(default)]
    pub lod_group: Option<u32>,
    #[serde(default = "default_strength")]
    pub occluder_strength: f32,
}

impl MeshContextDocument {
    pub fn from_context(ctx: &MeshContext) -> Self {
        Self {
            mesh: (*ctx.mesh).clone(),
            uv_channel: ctx.uv_channel,
            object_to_world: ctx.object_to_world,
            flags: ctx.flags,
            lod_group: ctx.lod_group.map(|g| g.0),
            occluder_strength: ctx.occluder_strength,
        }
    }

    pub fn into_context(self) -> MeshContext {
        let mut ctx = MeshContext::new(Arc::new(self.mesh), self.uv_channel, self.object_to_world)
            .with_flags(self.flags)
            .with_occluder_strength(self.occluder_strength);
        if let Some(group) = self.lod_group {
            ctx = ctx.with_lod_group(LodGroupId(group));
        }
        ctx
    }
}

/// Versioned JSON document describing one bake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupDocument {
    pub version: u32,
    pub quality: QualityParameters,
    pub mesh_to_bake: MeshContextDocument,
    #[serde(default)]
    pub occluders: Vec<MeshContextDocument>,
}

impl SetupDocument {
    pub fn from_setup(setup: &BakingSetup) -> Self {
        Self {
            version: SETUP_DOCUMENT_VERSION,
            quality: setup.quality,
            mesh_to_bake: MeshContextDocument::from_context(&setup.mesh_to_bake),
            occluders: setup
                .occluders
                .iter()
                .map(MeshContextDocument::from_context)
                .collect(),
        }
    }

    pub fn into_setup(self) -> BakingSetup {
        BakingSetup::new(self.quality, self.mesh_to_bake.into_context()).with_occluders(
            self.occluders
                .into_iter()
                .map(MeshContextDocument::into_context)
                .collect(),
        )
    }
}

/// Only the version field, read before committing to a full parse.
#[derive(Deserialize)]
struct VersionHeader {
    version: u32,
}

/// Parse a baking setup document. The version is checked first so that a
/// document from a newer format reports a version error, not a field error.
pub fn load_setup_from_str(json: &str) -> Result<BakingSetup, LoadError> {
    let header: VersionHeader =
        serde_json::from_str(json).map_err(|e| LoadError::SetupParseError(e.to_string()))?;
    if header.version != SETUP_DOCUMENT_VERSION {
        return Err(LoadError::UnsupportedVersion {
            found: header.version,
            supported: SETUP_DOCUMENT_VERSION,
        });
    }
    let document: SetupDocument =
        serde_json::from_str(json).map_err(|e| LoadError::SetupParseError(e.to_string()))?;
    Ok(document.into_setup())
}

/// Serialize a baking setup to a version 1 JSON document.
pub fn setup_to_json(setup: &BakingSetup, pretty: bool) -> Result<String, LoadError> {
    let document = SetupDocument::from_setup(setup);
    let result = if pretty {
        serde_json::to_string_pretty(&document)
    } else {
        serde_json::to_string(&document)
    };
    result.map_err(|e| LoadError::SetupWriteError(e.to_string()))
}
