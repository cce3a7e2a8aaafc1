//! Encoded bake output and its provenance.

use serde::{Deserialize, Serialize};

use crate::constants::PROVENANCE_VERSION;
use crate::quality::{PixelFormat, QualityParameters};
use crate::setup::BakingSetup;
use crate::types::{MeshContextFlags, UvChannel};

/// Tightly packed row-major pixels. Row 0 corresponds to v = 0.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let len = width as usize * height as usize * format.bytes_per_pixel();
        Self {
            width,
            height,
            format,
            data: vec![0; len],
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Occlusion value of pixel (x, y) decoded back to [0, 1].
    /// For `Rgba8` the red channel is read.
    pub fn value(&self, x: u32, y: u32) -> f32 {
        let i = (y as usize * self.width as usize + x as usize) * self.format.bytes_per_pixel();
        match self.format {
            PixelFormat::Gray8 | PixelFormat::Rgba8 => self.data[i] as f32 / 255.0,
            PixelFormat::Gray16 => {
                bytemuck::pod_read_unaligned::<u16>(&self.data[i..i + 2]) as f32 / 65535.0
            }
            PixelFormat::GrayF32 => bytemuck::pod_read_unaligned::<f32>(&self.data[i..i + 4]),
        }
    }

    /// Every pixel decoded, in raster order.
    pub fn values(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.pixel_count());
        for y in 0..self.height {
            for x in 0..self.width {
                out.push(self.value(x, y));
            }
        }
        out
    }
}

/// Where a baked texture came from. Compared against a live setup to decide
/// whether a re-bake is needed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub mesh_name: String,
    pub mesh_hash: u64,
    /// Target mesh together with its transform, flags and LOD group.
    #[serde(default)]
    pub target_hash: u64,
    pub uv_channel: UvChannel,
    pub quality: QualityParameters,
    pub occluder_hash: u64,
    /// Mesh had no stable identity; the texture is always considered stale.
    pub temporary: bool,
    pub version: u32,
}

impl Provenance {
    pub fn for_setup(setup: &BakingSetup) -> Self {
        let target = &setup.mesh_to_bake;
        Self {
            mesh_name: target.mesh.name.clone(),
            mesh_hash: target.mesh.content_hash(),
            target_hash: setup.target_hash(),
            uv_channel: target.uv_channel,
            quality: setup.quality,
            occluder_hash: setup.occluder_hash(),
            temporary: target.flags.contains(MeshContextFlags::TEMPORARY),
            version: PROVENANCE_VERSION,
        }
    }

    pub(crate) fn quality_hash(&self) -> u64 {
        use std::hash::Hasher;
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.quality.hash_into(&mut hasher);
        hasher.finish()
    }
}

/// Final product of a bake.
#[derive(Debug, Clone, PartialEq)]
pub struct BakedTexture {
    pub pixels: PixelBuffer,
    pub provenance: Provenance,
}

impl BakedTexture {
    pub fn width(&self) -> u32 {
        self.pixels.width
    }

    pub fn height(&self) -> u32 {
        self.pixels.height
    }

    /// True when re-baking `setup` could produce a different texture.
    pub fn is_stale(&self, setup: &BakingSetup) -> bool {
        if self.provenance.temporary
            || setup
                .mesh_to_bake
                .flags
                .contains(MeshContextFlags::TEMPORARY)
        {
            return true;
        }
        let current = Provenance::for_setup(setup);
        current.version != self.provenance.version
            || current.mesh_hash != self.provenance.mesh_hash
            || current.target_hash != self.provenance.target_hash
            || current.uv_channel != self.provenance.uv_channel
            || current.occluder_hash != self.provenance.occluder_hash
            || current.quality_hash() != self.provenance.quality_hash()
    }
}
