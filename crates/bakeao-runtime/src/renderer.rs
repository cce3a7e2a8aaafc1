//! Minimal renderer/material model the AO properties are written into.
//!
//! Materials are shared between renderers through `Arc`; a renderer can
//! additionally carry a property block whose values override every material
//! it draws with.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use bakeao_core::BakedTexture;

/// A single shader property value. Textures are weak references so a
/// deleted texture asset shows up as an invalid binding instead of being
/// kept alive by the material.
#[derive(Debug, Clone)]
pub enum PropertyValue {
    Texture(Weak<BakedTexture>),
    Float(f32),
}

/// Named shader properties.
#[derive(Debug, Clone, Default)]
pub struct PropertySheet {
    values: BTreeMap<&'static str, PropertyValue>,
}

impl PropertySheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_texture(&mut self, name: &'static str, texture: &Arc<BakedTexture>) {
        self.values
            .insert(name, PropertyValue::Texture(Arc::downgrade(texture)));
    }

    pub fn set_float(&mut self, name: &'static str, value: f32) {
        self.values.insert(name, PropertyValue::Float(value));
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name)
    }

    /// Live texture bound under `name`, if any.
    pub fn texture(&self, name: &str) -> Option<Arc<BakedTexture>> {
        match self.values.get(name) {
            Some(PropertyValue::Texture(t)) => t.upgrade(),
            _ => None,
        }
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.values.get(name) {
            Some(PropertyValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.values.remove(name);
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Material {
    pub name: String,
    pub properties: PropertySheet,
    /// True for per-renderer copies made from a shared material.
    pub instanced: bool,
}

impl Material {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Per-renderer copy of this material.
    pub fn instantiate(&self) -> Self {
        Self {
            name: format!("{} (Instance)", self.name),
            properties: self.properties.clone(),
            instanced: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    pub name: String,
    pub materials: Vec<Arc<Material>>,
    pub property_block: Option<PropertySheet>,
    pub is_static: bool,
}

impl Renderer {
    pub fn new(name: &str, materials: Vec<Arc<Material>>) -> Self {
        Self {
            name: name.to_string(),
            materials,
            ..Default::default()
        }
    }

    /// Float seen by the shader of material `index`: the property block
    /// wins over the material.
    pub fn effective_float(&self, index: usize, name: &str) -> Option<f32> {
        self.property_block
            .as_ref()
            .and_then(|b| b.float(name))
            .or_else(|| self.materials.get(index).and_then(|m| m.properties.float(name)))
    }

    /// Texture seen by the shader of material `index`.
    pub fn effective_texture(&self, index: usize, name: &str) -> Option<Arc<BakedTexture>> {
        self.property_block
            .as_ref()
            .and_then(|b| b.texture(name))
            .or_else(|| {
                self.materials
                    .get(index)
                    .and_then(|m| m.properties.texture(name))
            })
    }
}
