//! Build-time folding of AO into materials for static objects.

use std::sync::Arc;

use crate::apply::ApplyError;
use crate::component::BakeAoComponent;
use crate::renderer::Renderer;

/// A scene object as seen by the build step.
#[derive(Debug)]
pub struct SceneObject {
    pub renderer: Renderer,
    pub ao: Option<BakeAoComponent>,
}

/// For every static object with an AO component: detach the component,
/// give the renderer its own material copies with the AO properties
/// written in, and drop the component. Returns the number of renderers
/// processed.
pub fn bake_static_renderers(objects: &mut [SceneObject]) -> Result<usize, ApplyError> {
    let mut baked = 0;
    for object in objects.iter_mut().filter(|o| o.renderer.is_static) {
        let Some(mut component) = object.ao.take() else {
            continue;
        };
        // Undo any live changes before the component goes away
        component.disable(&mut object.renderer);

        let Some(properties) = component.properties() else {
            log::debug!("'{}' has no AO texture, component dropped", object.renderer.name);
            continue;
        };
        object.renderer.materials = object
            .renderer
            .materials
            .iter()
            .map(|m| {
                let mut copy = m.instantiate();
                properties.write_to(&mut copy.properties).map(|_| Arc::new(copy))
            })
            .collect::<Result<_, _>>()?;
        baked += 1;
    }
    log::info!("folded AO into materials of {baked} static renderers");
    Ok(baked)
}

#[cfg(test)]
mod tests {
    use bakeao_core::constants::PROVENANCE_VERSION;
    use bakeao_core::{
        BakedTexture, PixelBuffer, PixelFormat, Provenance, QualityParameters, UvChannel,
    };

    use super::*;
    use crate::apply::{OCCLUSION_MAP_PROPERTY, OCCLUSION_STRENGTH_PROPERTY};
    use crate::component::ApplyContext;
    use crate::renderer::Material;

    fn texture() -> Arc<BakedTexture> {
        Arc::new(BakedTexture {
            pixels: PixelBuffer::new(2, 2, PixelFormat::Gray8),
            provenance: Provenance {
                mesh_name: "rock".into(),
                mesh_hash: 1,
                target_hash: 0,
                uv_channel: UvChannel::Uv0,
                quality: QualityParameters::default(),
                occluder_hash: 0,
                temporary: false,
                version: PROVENANCE_VERSION,
            },
        })
    }

    fn object(is_static: bool, tex: &Arc<BakedTexture>, shared: &Arc<Material>) -> SceneObject {
        let mut renderer = Renderer::new("rock", vec![shared.clone()]);
        renderer.is_static = is_static;
        let mut ao = BakeAoComponent::new(tex.clone());
        ao.strength = 0.8;
        ao.enable(&mut renderer, &ApplyContext::default()).expect("enables");
        SceneObject {
            renderer,
            ao: Some(ao),
        }
    }

    #[test]
    fn test_static_objects_are_folded() {
        let tex = texture();
        let shared = Arc::new(Material::new("stone"));
        let mut objects = vec![object(true, &tex, &shared), object(false, &tex, &shared)];

        let baked = bake_static_renderers(&mut objects).expect("bakes");
        assert_eq!(baked, 1);

        let folded = &objects[0];
        assert!(folded.ao.is_none());
        assert!(folded.renderer.property_block.is_none());
        let material = &folded.renderer.materials[0];
        assert!(material.instanced);
        assert!(!Arc::ptr_eq(material, &shared));
        assert_eq!(material.properties.float(OCCLUSION_STRENGTH_PROPERTY), Some(0.8));
        assert!(material.properties.texture(OCCLUSION_MAP_PROPERTY).is_some());

        assert!(objects[1].ao.is_some(), "dynamic object keeps its component");
        assert!(shared.properties.is_empty());
    }

    #[test]
    fn test_static_without_texture_drops_component() {
        let mut renderer = Renderer::new("bare", vec![Arc::new(Material::new("m"))]);
        renderer.is_static = true;
        let mut objects = vec![SceneObject {
            renderer,
            ao: Some(BakeAoComponent::default()),
        }];
        assert_eq!(bake_static_renderers(&mut objects).expect("bakes"), 0);
        assert!(objects[0].ao.is_none());
        assert!(!objects[0].renderer.materials[0].instanced);
    }
}
