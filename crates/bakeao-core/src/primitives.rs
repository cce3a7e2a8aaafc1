//! Procedural meshes with a ready-made UV0 chart.
//!
//! Used by tests and the bench scenes. Every primitive is centred at the
//! origin and carries per-vertex normals.

use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};

use crate::mesh::MeshData;
use crate::types::UvChannel;

/// Face order of `unit_cube`: +X, -X, +Y, -Y, +Z, -Z.
pub const CUBE_FACE_NORMALS: [Vec3; 6] = [
    Vec3::X,
    Vec3::NEG_X,
    Vec3::Y,
    Vec3::NEG_Y,
    Vec3::Z,
    Vec3::NEG_Z,
];

/// Fraction of an atlas cell left empty on each side of a cube face.
const CUBE_ATLAS_PADDING: f32 = 0.04;

/// Unit square in the XZ plane facing +Y, UV0 covering [0,1]².
pub fn unit_quad(name: &str) -> MeshData {
    let positions = vec![
        Vec3::new(-0.5, 0.0, -0.5),
        Vec3::new(0.5, 0.0, -0.5),
        Vec3::new(0.5, 0.0, 0.5),
        Vec3::new(-0.5, 0.0, 0.5),
    ];
    let uvs = vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(0.0, 1.0),
    ];
    MeshData::new(name, positions, vec![0, 2, 1, 0, 3, 2])
        .with_normals(vec![Vec3::Y; 4])
        .with_uvs(UvChannel::Uv0, uvs)
}

/// Subdivided square of edge `size` in the XZ plane facing +Y.
pub fn plane(name: &str, size: f32, subdivisions: u32) -> MeshData {
    let n = subdivisions.max(1);
    let stride = n + 1;
    let mut positions = Vec::with_capacity((stride * stride) as usize);
    let mut uvs = Vec::with_capacity(positions.capacity());
    for j in 0..=n {
        let t = j as f32 / n as f32;
        for i in 0..=n {
            let s = i as f32 / n as f32;
            positions.push(Vec3::new((s - 0.5) * size, 0.0, (t - 0.5) * size));
            uvs.push(Vec2::new(s, t));
        }
    }
    let mut indices = Vec::with_capacity((n * n * 6) as usize);
    for j in 0..n {
        for i in 0..n {
            let a = j * stride + i;
            let b = a + 1;
            let c = a + stride;
            let d = c + 1;
            indices.extend_from_slice(&[a, d, b, a, c, d]);
        }
    }
    let count = positions.len();
    MeshData::new(name, positions, indices)
        .with_normals(vec![Vec3::Y; count])
        .with_uvs(UvChannel::Uv0, uvs)
}

/// UV rectangle (min, max) of cube face `face` in the 3×2 atlas.
pub fn cube_face_uv_rect(face: usize) -> (Vec2, Vec2) {
    let cell = Vec2::new(1.0 / 3.0, 0.5);
    let origin = Vec2::new((face % 3) as f32, (face / 3) as f32) * cell;
    let pad = cell * CUBE_ATLAS_PADDING;
    (origin + pad, origin + cell - pad)
}

/// Axis-aligned cube with edge 1. Each face owns one padded cell of a 3×2
/// UV0 atlas so the chart has no overlaps.
pub fn unit_cube(name: &str) -> MeshData {
    let mut positions = Vec::with_capacity(24);
    let mut normals = Vec::with_capacity(24);
    let mut uvs = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (face, &n) in CUBE_FACE_NORMALS.iter().enumerate() {
        let u_axis = if n.x.abs() > 0.5 { Vec3::Z } else { Vec3::X };
        let v_axis = n.cross(u_axis);
        let (uv_min, uv_max) = cube_face_uv_rect(face);
        let base = positions.len() as u32;
        for (s, t) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            positions.push(n * 0.5 + u_axis * (s - 0.5) + v_axis * (t - 0.5));
            normals.push(n);
            uvs.push(uv_min + (uv_max - uv_min) * Vec2::new(s, t));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    MeshData::new(name, positions, indices)
        .with_normals(normals)
        .with_uvs(UvChannel::Uv0, uvs)
}

/// Latitude/longitude sphere. UV0 is the equirectangular chart.
pub fn uv_sphere(name: &str, radius: f32, stacks: u32, slices: u32) -> MeshData {
    let stacks = stacks.max(3);
    let slices = slices.max(3);
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut uvs = Vec::new();

    for i in 0..=stacks {
        let v = i as f32 / stacks as f32;
        let theta = v * PI;
        for j in 0..=slices {
            let u = j as f32 / slices as f32;
            let phi = u * TAU;
            let n = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
            positions.push(n * radius);
            normals.push(n);
            uvs.push(Vec2::new(u, v));
        }
    }

    let stride = slices + 1;
    let mut indices = Vec::new();
    for i in 0..stacks {
        for j in 0..slices {
            let a = i * stride + j;
            let b = a + 1;
            let c = a + stride;
            let d = c + 1;
            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }

    MeshData::new(name, positions, indices)
        .with_normals(normals)
        .with_uvs(UvChannel::Uv0, uvs)
}

/// Torus around the Y axis.
pub fn torus(name: &str, major_radius: f32, minor_radius: f32, segments: u32, sides: u32) -> MeshData {
    let segments = segments.max(3);
    let sides = sides.max(3);
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut uvs = Vec::new();

    for i in 0..=segments {
        let u = i as f32 / segments as f32;
        let phi = u * TAU;
        let ring = Vec3::new(phi.cos(), 0.0, phi.sin());
        for j in 0..=sides {
            let v = j as f32 / sides as f32;
            let theta = v * TAU;
            let n = ring * theta.cos() + Vec3::Y * theta.sin();
            positions.push(ring * major_radius + n * minor_radius);
            normals.push(n);
            uvs.push(Vec2::new(u, v));
        }
    }

    let stride = sides + 1;
    let mut indices = Vec::new();
    for i in 0..segments {
        for j in 0..sides {
            let a = i * stride + j;
            let b = a + 1;
            let c = a + stride;
            let d = c + 1;
            indices.extend_from_slice(&[a, b, c, b, d, c]);
        }
    }

    MeshData::new(name, positions, indices)
        .with_normals(normals)
        .with_uvs(UvChannel::Uv0, uvs)
}
