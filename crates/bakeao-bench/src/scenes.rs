use std::f32::consts::TAU;
use std::sync::Arc;

use bakeao_core::primitives::{plane, torus, unit_cube, unit_quad, uv_sphere};
use bakeao_core::{BakingSetup, MeshContext, MeshData, QualityParameters, UvChannel};
use glam::{Mat4, Quat, Vec3};

/// Configuration for a single benchmark scene.
pub struct SceneConfig {
    pub name: &'static str,
    pub setup: BakingSetup,
}

fn context(mesh: MeshData, transform: Mat4) -> MeshContext {
    MeshContext::new(Arc::new(mesh), UvChannel::Uv0, transform)
}

fn flat_quad(quality: QualityParameters) -> BakingSetup {
    BakingSetup::new(quality, context(unit_quad("quad"), Mat4::IDENTITY))
}

fn cube_under_lid(quality: QualityParameters) -> BakingSetup {
    let lid = context(
        unit_quad("lid"),
        Mat4::from_scale_rotation_translation(
            Vec3::new(1.5, 1.0, 1.5),
            Quat::IDENTITY,
            Vec3::new(0.0, 0.51, 0.0),
        ),
    );
    BakingSetup::new(quality, context(unit_cube("cube"), Mat4::IDENTITY)).with_occluders(vec![lid])
}

fn sphere_on_ground(quality: QualityParameters) -> BakingSetup {
    let ground = context(
        plane("ground", 8.0, 4),
        Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0)),
    );
    BakingSetup::new(quality, context(uv_sphere("sphere", 1.0, 32, 64), Mat4::IDENTITY))
        .with_occluders(vec![ground])
}

/// A torus lying on a ground plane, surrounded by a ring of cubes.
fn torus_ring(quality: QualityParameters) -> BakingSetup {
    const CUBES: usize = 12;
    const RING_RADIUS: f32 = 2.2;

    let mut occluders: Vec<MeshContext> = (0..CUBES)
        .map(|i| {
            let angle = i as f32 / CUBES as f32 * TAU;
            context(
                unit_cube(&format!("cube_{i}")),
                Mat4::from_scale_rotation_translation(
                    Vec3::splat(0.6),
                    Quat::from_rotation_y(angle),
                    Vec3::new(angle.cos() * RING_RADIUS, 0.3, angle.sin() * RING_RADIUS),
                ),
            )
        })
        .collect();
    occluders.push(context(plane("ground", 8.0, 4), Mat4::IDENTITY));

    let target = context(
        torus("torus", 1.0, 0.35, 48, 24),
        Mat4::from_translation(Vec3::new(0.0, 0.35, 0.0)),
    );
    BakingSetup::new(quality, target).with_occluders(occluders)
}

/// Return the standard suite of benchmark scenes baked at `quality`.
pub fn standard_scenes(quality: QualityParameters) -> Vec<SceneConfig> {
    vec![
        SceneConfig {
            name: "flat_quad",
            setup: flat_quad(quality),
        },
        SceneConfig {
            name: "cube_under_lid",
            setup: cube_under_lid(quality),
        },
        SceneConfig {
            name: "sphere_on_ground",
            setup: sphere_on_ground(quality),
        },
        SceneConfig {
            name: "torus_ring",
            setup: torus_ring(quality),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_scenes_have_uvs() {
        for scene in standard_scenes(QualityParameters::default()) {
            let target = &scene.setup.mesh_to_bake;
            assert!(target.mesh.has_uv(target.uv_channel), "{}", scene.name);
            target.mesh.validate().expect("valid target mesh");
        }
    }

    #[test]
    fn test_torus_ring_occluders() {
        let setup = torus_ring(QualityParameters::default());
        assert_eq!(setup.occluders.len(), 13);
    }
}
