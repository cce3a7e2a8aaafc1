//! Texture composer: resolves super-samples into texels, fills the gutter
//! between UV islands and encodes the final pixel buffer.

use std::collections::VecDeque;

use bakeao_core::constants::UNREACHED_TEXEL_VALUE;
use bakeao_core::{BakeError, PixelBuffer, PixelFormat};

use crate::sampler::TexelSample;

/// 8-connected neighbour offsets in fixed order. Dilation results depend on
/// this order when two sources reach a texel in the same ring.
const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (-1, 1),
    (1, -1),
    (-1, -1),
];

/// Dense per-texel occlusion with the coverage mask it was resolved from.
#[derive(Debug, Clone, PartialEq)]
pub struct OcclusionMap {
    pub width: u32,
    pub height: u32,
    pub values: Vec<f32>,
    /// True where at least one sample landed. Never changed by dilation.
    pub covered: Vec<bool>,
}

impl OcclusionMap {
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            values: vec![UNREACHED_TEXEL_VALUE; len],
            covered: vec![false; len],
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.values[self.index(x, y)]
    }

    pub fn is_covered(&self, x: u32, y: u32) -> bool {
        self.covered[self.index(x, y)]
    }

    pub fn covered_count(&self) -> usize {
        self.covered.iter().filter(|&&c| c).count()
    }

    /// Mean value over covered texels, 1.0 when nothing is covered.
    pub fn covered_mean(&self) -> f32 {
        let (sum, count) = self
            .values
            .iter()
            .zip(&self.covered)
            .filter(|&(_, &c)| c)
            .fold((0.0f64, 0usize), |(s, n), (&v, _)| (s + v as f64, n + 1));
        if count == 0 {
            1.0
        } else {
            (sum / count as f64) as f32
        }
    }
}

/// Box-filter sub-samples into texels, weighted by coverage.
///
/// `occlusion[i]` is the integrated value of `samples[i]`.
pub fn compose(samples: &[TexelSample], occlusion: &[f32], width: u32, height: u32) -> OcclusionMap {
    let mut map = OcclusionMap::new(width, height);
    let len = map.values.len();
    let mut weighted = vec![0.0f64; len];
    let mut weights = vec![0.0f64; len];

    for (sample, &value) in samples.iter().zip(occlusion) {
        if sample.texel.x >= width || sample.texel.y >= height {
            continue;
        }
        let i = map.index(sample.texel.x, sample.texel.y);
        weighted[i] += (value * sample.coverage) as f64;
        weights[i] += sample.coverage as f64;
    }

    for i in 0..len {
        if weights[i] > 0.0 {
            map.values[i] = (weighted[i] / weights[i]) as f32;
            map.covered[i] = true;
        }
    }
    map
}

/// Fill uncovered texels from their nearest covered texel.
///
/// Multi-source BFS in rings from every covered texel. `limit` bounds the
/// ring count; texels no source reaches get `UNREACHED_TEXEL_VALUE`.
/// Covered texels and the mask are left untouched, so dilating twice gives
/// the same map as dilating once.
pub fn dilate(map: &OcclusionMap, limit: Option<u32>) -> OcclusionMap {
    let mut out = map.clone();
    let (w, h) = (map.width as i32, map.height as i32);
    let mut ring = vec![u32::MAX; map.values.len()];
    let mut queue = VecDeque::new();

    for (i, &covered) in map.covered.iter().enumerate() {
        if covered {
            ring[i] = 0;
            queue.push_back(i);
        } else {
            out.values[i] = UNREACHED_TEXEL_VALUE;
        }
    }

    while let Some(current) = queue.pop_front() {
        let d = ring[current];
        if limit.is_some_and(|l| d >= l) {
            continue;
        }
        let x = (current % map.width as usize) as i32;
        let y = (current / map.width as usize) as i32;
        for &(dx, dy) in &NEIGHBOR_OFFSETS {
            let (nx, ny) = (x + dx, y + dy);
            if nx < 0 || nx >= w || ny < 0 || ny >= h {
                continue;
            }
            let n = ny as usize * map.width as usize + nx as usize;
            if ring[n] != u32::MAX {
                continue;
            }
            ring[n] = d + 1;
            out.values[n] = out.values[current];
            queue.push_back(n);
        }
    }
    out
}

fn quantize(value: f32, max: f32) -> f32 {
    (value.clamp(0.0, 1.0) * max).round()
}

/// Encode the map into a tightly packed buffer of `format`.
pub fn encode(map: &OcclusionMap, format: PixelFormat) -> PixelBuffer {
    let data: Vec<u8> = match format {
        PixelFormat::Gray8 => map.values.iter().map(|&v| quantize(v, 255.0) as u8).collect(),
        PixelFormat::Gray16 => {
            let words: Vec<u16> = map.values.iter().map(|&v| quantize(v, 65535.0) as u16).collect();
            bytemuck::cast_slice::<u16, u8>(&words).to_vec()
        }
        PixelFormat::GrayF32 => bytemuck::cast_slice::<f32, u8>(&map.values).to_vec(),
        PixelFormat::Rgba8 => map
            .values
            .iter()
            .flat_map(|&v| {
                let g = quantize(v, 255.0) as u8;
                [g, g, g, 255]
            })
            .collect(),
    };
    PixelBuffer {
        width: map.width,
        height: map.height,
        format,
        data,
    }
}

/// Write occlusion into one channel of an existing RGBA8 buffer, leaving the
/// other channels as they were.
pub fn encode_into(map: &OcclusionMap, existing: &mut PixelBuffer, channel: usize) -> Result<(), BakeError> {
    if existing.format != PixelFormat::Rgba8 {
        return Err(BakeError::InvalidQuality(format!(
            "channel packing needs an Rgba8 buffer, got {:?}",
            existing.format
        )));
    }
    if channel >= 4 {
        return Err(BakeError::InvalidQuality(format!(
            "channel {channel} out of range for Rgba8"
        )));
    }
    if (existing.width, existing.height) != (map.width, map.height) {
        return Err(BakeError::InvalidQuality(format!(
            "buffer is {}x{} but the occlusion map is {}x{}",
            existing.width, existing.height, map.width, map.height
        )));
    }
    for (pixel, &v) in existing.data.chunks_exact_mut(4).zip(&map.values) {
        pixel[channel] = quantize(v, 255.0) as u8;
    }
    Ok(())
}
