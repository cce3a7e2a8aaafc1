use std::sync::Arc;

use bakeao_core::{BakedTexture, UvChannel};

use crate::apply::{applicator_for, ApplyAo, ApplyError, ApplyMode, AoProperties, RuntimeSettings};
use crate::renderer::Renderer;

/// Where the component lives. Edit mode never instances materials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyContext {
    pub settings: RuntimeSettings,
    pub uses_scriptable_pipeline: bool,
    pub editing: bool,
}

impl Default for ApplyContext {
    fn default() -> Self {
        Self {
            settings: RuntimeSettings::default(),
            uses_scriptable_pipeline: false,
            editing: false,
        }
    }
}

/// Per-renderer AO state: the requested mode and properties plus the
/// applicator currently holding changes on the renderer.
#[derive(Debug)]
pub struct BakeAoComponent {
    pub mode: ApplyMode,
    pub texture: Option<Arc<BakedTexture>>,
    pub strength: f32,
    pub uv_set: UvChannel,
    pub multiply_into_diffuse: bool,
    enabled: bool,
    applicator: Option<Box<dyn ApplyAo>>,
}

impl Default for BakeAoComponent {
    fn default() -> Self {
        Self {
            mode: ApplyMode::Default,
            texture: None,
            strength: 1.0,
            uv_set: UvChannel::Uv0,
            multiply_into_diffuse: false,
            enabled: false,
            applicator: None,
        }
    }
}

impl BakeAoComponent {
    pub fn new(texture: Arc<BakedTexture>) -> Self {
        let uv_set = texture.provenance.uv_channel;
        Self {
            texture: Some(texture),
            uv_set,
            ..Default::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Mode of the live applicator, if enabled.
    pub fn active_mode(&self) -> Option<ApplyMode> {
        self.applicator.as_ref().map(|a| a.mode())
    }

    pub fn properties(&self) -> Option<AoProperties> {
        self.texture.as_ref().map(|texture| AoProperties {
            texture: texture.clone(),
            strength: self.strength,
            uv_set: self.uv_set,
            multiply_into_diffuse: self.multiply_into_diffuse,
        })
    }

    /// Pick an applicator for the resolved mode and apply.
    pub fn enable(&mut self, renderer: &mut Renderer, context: &ApplyContext) -> Result<(), ApplyError> {
        self.disable(renderer);
        let mode = context.settings.resolve(
            self.mode,
            context.uses_scriptable_pipeline,
            context.editing,
        );
        self.applicator = Some(applicator_for(mode)?);
        self.enabled = true;
        self.update(renderer)
    }

    /// Remove everything the applicator wrote.
    pub fn disable(&mut self, renderer: &mut Renderer) {
        if let Some(mut applicator) = self.applicator.take() {
            applicator.clear(renderer);
        }
        self.enabled = false;
    }

    /// Re-apply current properties. No-op without a texture or while disabled.
    pub fn update(&mut self, renderer: &mut Renderer) -> Result<(), ApplyError> {
        if !self.enabled {
            return Ok(());
        }
        let Some(properties) = self.properties() else {
            return Ok(());
        };
        let Some(applicator) = self.applicator.as_mut() else {
            return Ok(());
        };
        applicator.apply(renderer, &properties)
    }

    /// Full teardown and re-enable, after changing several fields at once.
    pub fn refresh(&mut self, renderer: &mut Renderer, context: &ApplyContext) -> Result<(), ApplyError> {
        let was_enabled = self.enabled;
        self.disable(renderer);
        if was_enabled {
            self.enable(renderer, context)?;
        }
        Ok(())
    }

    pub fn has_invalid_texture(&self, renderer: &Renderer) -> bool {
        self.applicator
            .as_ref()
            .is_some_and(|a| a.has_invalid_texture(renderer))
    }
}

#[cfg(test)]
mod tests {
    use bakeao_core::constants::PROVENANCE_VERSION;
    use bakeao_core::{PixelBuffer, PixelFormat, Provenance, QualityParameters};

    use super::*;
    use crate::apply::OCCLUSION_STRENGTH_PROPERTY;
    use crate::renderer::Material;

    fn texture() -> Arc<BakedTexture> {
        Arc::new(BakedTexture {
            pixels: PixelBuffer::new(2, 2, PixelFormat::Gray8),
            provenance: Provenance {
                mesh_name: "barrel".into(),
                mesh_hash: 7,
                target_hash: 0,
                uv_channel: UvChannel::Uv1,
                quality: QualityParameters::default(),
                occluder_hash: 0,
                temporary: false,
                version: PROVENANCE_VERSION,
            },
        })
    }

    fn renderer() -> Renderer {
        Renderer::new("barrel", vec![Arc::new(Material::new("wood"))])
    }

    #[test]
    fn test_uv_set_follows_texture() {
        let component = BakeAoComponent::new(texture());
        assert_eq!(component.uv_set, UvChannel::Uv1);
    }

    #[test]
    fn test_edit_mode_uses_property_block() {
        let mut r = renderer();
        let mut component = BakeAoComponent::new(texture());
        component.mode = ApplyMode::MaterialInstance;
        let context = ApplyContext {
            editing: true,
            ..Default::default()
        };
        component.enable(&mut r, &context).expect("enables");
        assert_eq!(component.active_mode(), Some(ApplyMode::MaterialPropertyBlock));
        assert!(r.property_block.is_some());
        assert!(!r.materials[0].instanced);
    }

    #[test]
    fn test_play_mode_default_instances() {
        let mut r = renderer();
        let mut component = BakeAoComponent::new(texture());
        component.enable(&mut r, &ApplyContext::default()).expect("enables");
        assert_eq!(component.active_mode(), Some(ApplyMode::MaterialInstance));
        assert!(r.materials[0].instanced);

        component.strength = 0.25;
        component.update(&mut r).expect("updates");
        assert_eq!(r.effective_float(0, OCCLUSION_STRENGTH_PROPERTY), Some(0.25));

        component.disable(&mut r);
        assert!(!r.materials[0].instanced);
        assert!(!component.is_enabled());
    }

    #[test]
    fn test_refresh_switches_mode() {
        let mut r = renderer();
        let mut component = BakeAoComponent::new(texture());
        component.enable(&mut r, &ApplyContext::default()).expect("enables");
        component.mode = ApplyMode::MaterialPropertyBlock;
        component.refresh(&mut r, &ApplyContext::default()).expect("refreshes");
        assert_eq!(component.active_mode(), Some(ApplyMode::MaterialPropertyBlock));
        assert!(!r.materials[0].instanced);
        assert!(r.property_block.is_some());
    }

    #[test]
    fn test_update_rewrites_property_block() {
        let mut r = renderer();
        let mut component = BakeAoComponent::new(texture());
        component.mode = ApplyMode::MaterialPropertyBlock;
        component.enable(&mut r, &ApplyContext::default()).expect("enables");
        assert_eq!(r.effective_float(0, OCCLUSION_STRENGTH_PROPERTY), Some(1.0));

        component.strength = 0.5;
        component.update(&mut r).expect("updates");
        assert_eq!(r.effective_float(0, OCCLUSION_STRENGTH_PROPERTY), Some(0.5));

        component.disable(&mut r);
        component.strength = 0.1;
        component.update(&mut r).expect("disabled update is a no-op");
        assert!(r.property_block.is_none());
    }

    #[test]
    fn test_no_texture_is_noop() {
        let mut r = renderer();
        let mut component = BakeAoComponent::default();
        component.enable(&mut r, &ApplyContext::default()).expect("enables");
        assert!(!r.materials[0].instanced);
        assert!(r.property_block.is_none());
    }
}
