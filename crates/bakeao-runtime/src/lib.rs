pub mod apply;
pub mod component;
pub mod renderer;
pub mod static_bake;

pub use apply::{
    applicator_for, AoProperties, ApplyAo, ApplyError, ApplyMode, InstancedMaterialApplicator,
    PropertyBlockApplicator, RuntimeSettings,
};
pub use component::{ApplyContext, BakeAoComponent};
pub use renderer::{Material, PropertySheet, PropertyValue, Renderer};
pub use static_bake::{bake_static_renderers, SceneObject};
