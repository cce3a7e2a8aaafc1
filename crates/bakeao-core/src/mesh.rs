//! Immutable mesh snapshot consumed by a bake.
//!
//! A bake never holds live engine handles: callers copy positions, normals,
//! UV sets and indices into a `MeshData` and share it through `Arc`.

use std::hash::{Hash, Hasher};

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::constants::UV_CHANNEL_COUNT;
use crate::error::BakeError;
use crate::math::Aabb;
use crate::types::UvChannel;

/// Triangle mesh with up to eight UV sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshData {
    /// Human-readable name used in errors and provenance.
    pub name: String,
    pub positions: Vec<Vec3>,
    /// Per-vertex normals. Empty means "use face normals".
    #[serde(default)]
    pub normals: Vec<Vec3>,
    /// UV sets indexed by `UvChannel`. An empty set means the channel is absent.
    #[serde(default)]
    pub uvs: [Vec<Vec2>; UV_CHANNEL_COUNT],
    /// Triangle list, three indices per triangle.
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(name: impl Into<String>, positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            positions,
            indices,
            ..Default::default()
        }
    }

    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        self.normals = normals;
        self
    }

    pub fn with_uvs(mut self, channel: UvChannel, uvs: Vec<Vec2>) -> Self {
        self.uvs[channel.index()] = uvs;
        self
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn has_uv(&self, channel: UvChannel) -> bool {
        let uvs = &self.uvs[channel.index()];
        !uvs.is_empty() && uvs.len() == self.positions.len()
    }

    pub fn uv(&self, channel: UvChannel) -> &[Vec2] {
        &self.uvs[channel.index()]
    }

    /// Vertex indices of triangle `tri`.
    pub fn triangle(&self, tri: usize) -> [usize; 3] {
        let base = tri * 3;
        [
            self.indices[base] as usize,
            self.indices[base + 1] as usize,
            self.indices[base + 2] as usize,
        ]
    }

    /// Object-space bounds of all vertices.
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(&self.positions)
    }

    /// Check structural consistency. UV channels are checked separately
    /// because a missing channel is its own error.
    pub fn validate(&self) -> Result<(), BakeError> {
        if self.positions.is_empty() || self.indices.is_empty() {
            return Err(BakeError::InvalidMesh(format!(
                "mesh '{}' has no geometry",
                self.name
            )));
        }
        if self.indices.len() % 3 != 0 {
            return Err(BakeError::InvalidMesh(format!(
                "mesh '{}' index count {} is not a multiple of 3",
                self.name,
                self.indices.len()
            )));
        }
        let vertex_count = self.positions.len();
        if let Some(&bad) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(BakeError::InvalidMesh(format!(
                "mesh '{}' index {bad} out of range ({vertex_count} vertices)",
                self.name
            )));
        }
        if !self.normals.is_empty() && self.normals.len() != vertex_count {
            return Err(BakeError::InvalidMesh(format!(
                "mesh '{}' has {} normals for {vertex_count} vertices",
                self.name,
                self.normals.len()
            )));
        }
        for (i, uvs) in self.uvs.iter().enumerate() {
            if !uvs.is_empty() && uvs.len() != vertex_count {
                return Err(BakeError::InvalidMesh(format!(
                    "mesh '{}' UV{i} has {} entries for {vertex_count} vertices",
                    self.name,
                    uvs.len()
                )));
            }
        }
        if self.positions.iter().any(|p| !p.is_finite()) {
            return Err(BakeError::InvalidMesh(format!(
                "mesh '{}' has non-finite positions",
                self.name
            )));
        }
        if self.normals.iter().any(|n| !n.is_finite()) {
            return Err(BakeError::InvalidMesh(format!(
                "mesh '{}' has non-finite normals",
                self.name
            )));
        }
        if let Some(i) = self
            .uvs
            .iter()
            .position(|uvs| uvs.iter().any(|uv| !uv.is_finite()))
        {
            return Err(BakeError::InvalidMesh(format!(
                "mesh '{}' UV{i} has non-finite coordinates",
                self.name
            )));
        }
        Ok(())
    }

    /// Deterministic hash over every field that affects a bake.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.hash_into(&mut hasher);
        hasher.finish()
    }

    pub(crate) fn hash_into<H: Hasher>(&self, hasher: &mut H) {
        self.positions.len().hash(hasher);
        for p in &self.positions {
            p.to_array().map(f32::to_bits).hash(hasher);
        }
        self.normals.len().hash(hasher);
        for n in &self.normals {
            n.to_array().map(f32::to_bits).hash(hasher);
        }
        for uvs in &self.uvs {
            uvs.len().hash(hasher);
            for uv in uvs {
                uv.to_array().map(f32::to_bits).hash(hasher);
            }
        }
        self.indices.hash(hasher);
    }
}
