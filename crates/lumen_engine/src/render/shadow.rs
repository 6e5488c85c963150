//! Pass filters and shadow mapping
//!
//! A [`PassFilter`] runs around every additive pass: `pre` before the pass
//! state is set up and `post` after it is restored. [`ShadowMapFilter`] uses
//! this to render a depth map from the light's point of view before each
//! shadow-casting pass and hand it to the pass shader.

use std::fmt::Debug;
use std::rc::Rc;

use crate::config::RenderConfig;
use crate::foundation::math::{utils, Mat4, Vec3};
use crate::graphics::api::ClearFlags;
use crate::graphics::DataBinder;
use crate::render::{DrawStrategy, RenderContext, RenderPass, RenderResult};
use crate::resources::{FrameBuffer, RenderTarget, Shader, UniformValue};
use crate::scene::SceneGraph;

/// Texture slot used for the shadow map unless configured otherwise
pub const DEFAULT_SHADOW_SLOT: u32 = 7;

/// Shadow-casting setup of a light pass
#[derive(Debug, Clone)]
pub struct ShadowInfo {
    /// Light view-projection matrix
    pub light_matrix: Mat4,

    /// Depth-only target the shadow map is rendered into
    pub framebuffer: Rc<FrameBuffer>,

    /// Shader used to render the depth map
    pub depth_shader: Rc<Shader>,

    /// Depth bias applied when sampling
    pub bias: f32,

    /// Texture slot the shadow map is bound to during the pass
    pub slot: u32,
}

impl ShadowInfo {
    /// Shadow setup with a square depth map sized from the render config
    pub fn new(light_matrix: Mat4, depth_shader: Rc<Shader>, config: &RenderConfig) -> Self {
        Self {
            light_matrix,
            framebuffer: Rc::new(FrameBuffer::depth_only(config.shadow_map_size)),
            depth_shader,
            bias: config.shadow_bias,
            slot: DEFAULT_SHADOW_SLOT,
        }
    }

    /// Builder pattern: bind the shadow map to another texture slot
    pub fn with_slot(mut self, slot: u32) -> Self {
        self.slot = slot;
        self
    }

    /// Orthographic light matrix for a directional light
    ///
    /// Covers a box of `half_extent` around `center`, looking along
    /// `direction` from `depth / 2` units away.
    pub fn directional_matrix(direction: Vec3, center: Vec3, half_extent: f32, depth: f32) -> Mat4 {
        let direction = direction.try_normalize(f32::EPSILON).unwrap_or_else(|| -Vec3::y());
        // look_at degenerates when the view direction is parallel to up
        let up = if direction.cross(&Vec3::y()).norm_squared() <= f32::EPSILON {
            Vec3::z()
        } else {
            Vec3::y()
        };
        let eye = center - direction * (depth * 0.5);
        utils::orthographic(half_extent, half_extent, 0.0, depth) * utils::look_at(eye, center, up)
    }
}

/// Everything a filter may use around a pass
pub struct FilterContext<'a> {
    /// Binder owning the graphics context
    pub binder: &'a mut DataBinder,

    /// Scene being rendered
    pub scene: &'a SceneGraph,

    /// Target the frame is rendered into
    pub target: &'a RenderTarget,

    /// Camera view matrix
    pub view: Mat4,

    /// Camera projection matrix
    pub projection: Mat4,

    /// Active draw strategy
    pub strategy: &'a dyn DrawStrategy,
}

/// Hook run around every additive pass
pub trait PassFilter: Debug {
    /// Run before the pass state is set up
    fn pre(&mut self, pass: &RenderPass, ctx: &mut FilterContext<'_>) -> RenderResult<()>;

    /// Run after the pass state is restored
    fn post(&mut self, pass: &RenderPass, ctx: &mut FilterContext<'_>) -> RenderResult<()>;
}

/// Renders shadow maps for passes carrying [`ShadowInfo`]
#[derive(Debug, Default)]
pub struct ShadowMapFilter {
    maps_rendered: u64,
}

impl ShadowMapFilter {
    /// Create the filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of shadow maps rendered so far
    pub fn maps_rendered(&self) -> u64 {
        self.maps_rendered
    }

    fn render_depth_map(shadow: &ShadowInfo, ctx: &mut FilterContext<'_>) -> RenderResult<()> {
        let target = RenderTarget::FrameBuffer(Rc::clone(&shadow.framebuffer));
        ctx.binder.bind_as_render_target(&target)?;
        if !ctx.binder.state().depth_write() {
            ctx.binder.state_mut().set_depth_write(true)?;
        }
        ctx.binder.state_mut().clear(ClearFlags::DEPTH);

        ctx.binder.bind_shader(&shadow.depth_shader)?;
        let mut render_ctx = RenderContext {
            binder: &mut *ctx.binder,
            shader: &shadow.depth_shader,
            view: Mat4::identity(),
            projection: shadow.light_matrix,
            strategy: ctx.strategy,
            depth_only: true,
        };
        ctx.scene.render(&mut render_ctx)
    }
}

impl PassFilter for ShadowMapFilter {
    fn pre(&mut self, pass: &RenderPass, ctx: &mut FilterContext<'_>) -> RenderResult<()> {
        let Some(shadow) = pass.shadow() else {
            return Ok(());
        };

        log::trace!("Rendering shadow map for pass '{}'", pass.name());
        Self::render_depth_map(shadow, ctx)?;
        ctx.binder.bind_as_render_target(ctx.target)?;
        self.maps_rendered += 1;

        let shader = pass.shader();
        ctx.binder.bind_shader(shader)?;
        ctx.binder.set_uniform_if_present(shader, "light_matrix", &UniformValue::Mat4(shadow.light_matrix))?;
        ctx.binder.set_uniform_if_present(shader, "shadow_bias", &UniformValue::Float(shadow.bias))?;
        ctx.binder.set_uniform_if_present(shader, "shadow_map", &UniformValue::Sampler(shadow.slot))?;
        if let Some(map) = shadow.framebuffer.depth_attachment() {
            ctx.binder.bind_texture(map, shadow.slot)?;
        }
        Ok(())
    }

    fn post(&mut self, pass: &RenderPass, ctx: &mut FilterContext<'_>) -> RenderResult<()> {
        if let Some(shadow) = pass.shadow() {
            ctx.binder.unbind_texture(shadow.slot)?;
        }
        Ok(())
    }
}
