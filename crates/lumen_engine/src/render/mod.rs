//! Multi-pass forward rendering
//!
//! [`ForwardEngine`] renders a [`crate::scene::SceneGraph`] once per light
//! pass. The first pass writes depth; every further pass is blended
//! additively on top with an `EQUAL` depth test, so each light only shades
//! the surfaces that are actually visible.

pub mod engine;
pub mod lights;
pub mod pass;
pub mod shadow;
pub mod strategy;

pub use engine::{BasePass, FilterId, ForwardEngine, PassId, PassPlan};
pub use lights::{Attenuation, BaseLight, DirectionalLight, PointLight, SpotLight};
pub use pass::RenderPass;
pub use shadow::{FilterContext, PassFilter, ShadowInfo, ShadowMapFilter};
pub use strategy::{DrawStrategy, SolidDraw, WireframeDraw};

use thiserror::Error;

use crate::assets::ObjError;
use crate::config::ConfigError;
use crate::foundation::math::Mat4;
use crate::graphics::{DataBinder, StateError};
use crate::resources::{ResourceError, Shader};
use crate::scene::SceneError;

/// Rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    /// State cache precondition violated
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Resource creation or binding failed
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    /// Scene graph misuse
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Model loading error
    #[error("Model error: {0}")]
    Obj(#[from] ObjError),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Everything a renderable needs while a pass walks the scene
pub struct RenderContext<'a> {
    /// Binder owning the graphics context
    pub binder: &'a mut DataBinder,

    /// Shader bound for the current pass
    pub shader: &'a Shader,

    /// Camera view matrix
    pub view: Mat4,

    /// Camera projection matrix
    pub projection: Mat4,

    /// Issues the draw calls
    pub strategy: &'a dyn DrawStrategy,

    /// Set while rendering shadow depth maps; materials are skipped
    pub depth_only: bool,
}
