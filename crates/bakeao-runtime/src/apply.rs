//! Applying a baked AO texture to renderers.
//!
//! Two strategies exist: writing a per-renderer property block that
//! overrides the shared materials, or replacing the renderer's materials
//! with per-renderer copies and writing into those.

use std::sync::Arc;

use bakeao_core::{BakedTexture, UvChannel};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::renderer::{Material, PropertySheet, Renderer};

pub const OCCLUSION_MAP_PROPERTY: &str = "_OcclusionMap";
pub const OCCLUSION_STRENGTH_PROPERTY: &str = "_OcclusionStrength";
pub const OCCLUSION_UV_SET_PROPERTY: &str = "_AOTextureUV";
pub const MULTIPLY_ALBEDO_PROPERTY: &str = "_MultiplyAlbedoAndOcclusion";

pub const MAX_OCCLUSION_STRENGTH: f32 = 2.0;

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("Renderer '{0}' has no materials to instance")]
    NoMaterials(String),
    #[error("Occlusion strength {0} is not a finite number")]
    InvalidStrength(f32),
    #[error("Apply mode Default must be resolved before creating an applicator")]
    UnresolvedMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ApplyMode {
    /// Use the project-wide mode from `RuntimeSettings`.
    #[default]
    Default,
    MaterialPropertyBlock,
    MaterialInstance,
}

/// Project-wide runtime settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSettings {
    pub default_apply_mode: ApplyMode,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            default_apply_mode: ApplyMode::MaterialInstance,
        }
    }
}

impl RuntimeSettings {
    /// The project default with `Default` resolved against the render
    /// pipeline: property blocks for the built-in pipeline, material
    /// instances for scriptable pipelines.
    pub fn project_mode(&self, uses_scriptable_pipeline: bool) -> ApplyMode {
        match self.default_apply_mode {
            ApplyMode::Default if uses_scriptable_pipeline => ApplyMode::MaterialInstance,
            ApplyMode::Default => ApplyMode::MaterialPropertyBlock,
            mode => mode,
        }
    }

    /// Concrete mode for a component's requested `mode`. Edit mode always
    /// uses property blocks so that shared material assets are never
    /// modified.
    pub fn resolve(&self, mode: ApplyMode, uses_scriptable_pipeline: bool, editing: bool) -> ApplyMode {
        if editing {
            return ApplyMode::MaterialPropertyBlock;
        }
        match mode {
            ApplyMode::Default => self.project_mode(uses_scriptable_pipeline),
            mode => mode,
        }
    }
}

/// Values written into the renderer for one baked texture.
#[derive(Debug, Clone)]
pub struct AoProperties {
    pub texture: Arc<BakedTexture>,
    /// In 0..=2.
    pub strength: f32,
    pub uv_set: UvChannel,
    pub multiply_into_diffuse: bool,
}

impl AoProperties {
    pub fn new(texture: Arc<BakedTexture>) -> Self {
        let uv_set = texture.provenance.uv_channel;
        Self {
            texture,
            strength: 1.0,
            uv_set,
            multiply_into_diffuse: false,
        }
    }

    pub fn with_strength(mut self, strength: f32) -> Self {
        self.strength = strength.clamp(0.0, MAX_OCCLUSION_STRENGTH);
        self
    }

    pub fn with_uv_set(mut self, uv_set: UvChannel) -> Self {
        self.uv_set = uv_set;
        self
    }

    pub fn with_multiply_into_diffuse(mut self, multiply: bool) -> Self {
        self.multiply_into_diffuse = multiply;
        self
    }

    pub fn write_to(&self, sheet: &mut PropertySheet) -> Result<(), ApplyError> {
        if !self.strength.is_finite() {
            return Err(ApplyError::InvalidStrength(self.strength));
        }
        sheet.set_texture(OCCLUSION_MAP_PROPERTY, &self.texture);
        sheet.set_float(
            OCCLUSION_STRENGTH_PROPERTY,
            self.strength.clamp(0.0, MAX_OCCLUSION_STRENGTH),
        );
        sheet.set_float(OCCLUSION_UV_SET_PROPERTY, self.uv_set.index() as f32);
        sheet.set_float(
            MULTIPLY_ALBEDO_PROPERTY,
            if self.multiply_into_diffuse { 1.0 } else { 0.0 },
        );
        Ok(())
    }
}

/// A strategy for getting AO properties onto a renderer.
pub trait ApplyAo: std::fmt::Debug + Send + Sync {
    fn mode(&self) -> ApplyMode;
    fn apply(&mut self, renderer: &mut Renderer, properties: &AoProperties) -> Result<(), ApplyError>;
    /// Undo everything `apply` did to the renderer.
    fn clear(&mut self, renderer: &mut Renderer);
    /// True when the renderer no longer references a live AO texture.
    fn has_invalid_texture(&self, renderer: &Renderer) -> bool;
}

/// Writes AO into the renderer's property block, leaving shared materials
/// untouched.
#[derive(Debug, Default)]
pub struct PropertyBlockApplicator {
    block: PropertySheet,
}

impl PropertyBlockApplicator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ApplyAo for PropertyBlockApplicator {
    fn mode(&self) -> ApplyMode {
        ApplyMode::MaterialPropertyBlock
    }

    fn apply(&mut self, renderer: &mut Renderer, properties: &AoProperties) -> Result<(), ApplyError> {
        // Keep whatever else the renderer already had in its block
        if let Some(existing) = &renderer.property_block {
            self.block = existing.clone();
        }
        properties.write_to(&mut self.block)?;
        renderer.property_block = Some(self.block.clone());
        Ok(())
    }

    fn clear(&mut self, renderer: &mut Renderer) {
        self.block.clear();
        renderer.property_block = None;
    }

    fn has_invalid_texture(&self, renderer: &Renderer) -> bool {
        match &renderer.property_block {
            Some(block) => block.texture(OCCLUSION_MAP_PROPERTY).is_none(),
            None => true,
        }
    }
}

/// Replaces the renderer's materials with per-renderer copies on first
/// apply and writes AO into the copies. `clear` restores the originals.
#[derive(Debug, Default)]
pub struct InstancedMaterialApplicator {
    originals: Option<Vec<Arc<Material>>>,
}

impl InstancedMaterialApplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_instanced(&self) -> bool {
        self.originals.is_some()
    }
}

impl ApplyAo for InstancedMaterialApplicator {
    fn mode(&self) -> ApplyMode {
        ApplyMode::MaterialInstance
    }

    fn apply(&mut self, renderer: &mut Renderer, properties: &AoProperties) -> Result<(), ApplyError> {
        if renderer.materials.is_empty() {
            return Err(ApplyError::NoMaterials(renderer.name.clone()));
        }
        if self.originals.is_none() {
            self.originals = Some(renderer.materials.clone());
            renderer.materials = renderer
                .materials
                .iter()
                .map(|m| Arc::new(m.instantiate()))
                .collect();
            log::debug!(
                "instanced {} materials on '{}'",
                renderer.materials.len(),
                renderer.name
            );
        }
        for material in &mut renderer.materials {
            properties.write_to(&mut Arc::make_mut(material).properties)?;
        }
        Ok(())
    }

    fn clear(&mut self, renderer: &mut Renderer) {
        if let Some(originals) = self.originals.take() {
            renderer.materials = originals;
        }
    }

    fn has_invalid_texture(&self, _renderer: &Renderer) -> bool {
        false
    }
}

/// Applicator for a concrete mode. `Default` must be resolved through
/// `RuntimeSettings::resolve` first.
pub fn applicator_for(mode: ApplyMode) -> Result<Box<dyn ApplyAo>, ApplyError> {
    match mode {
        ApplyMode::MaterialPropertyBlock => Ok(Box::new(PropertyBlockApplicator::new())),
        ApplyMode::MaterialInstance => Ok(Box::new(InstancedMaterialApplicator::new())),
        ApplyMode::Default => Err(ApplyError::UnresolvedMode),
    }
}
