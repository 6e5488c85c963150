//! Forward render engine
//!
//! Per frame:
//!
//! ```text
//! bind target -> clear -> base pass (writes depth)
//!             -> for each further pass:
//!                  filters.pre -> blend ONE/ONE, depth write off, depth EQUAL
//!                  -> render -> depth LESS, depth write on, blend off -> filters.post
//! ```
//!
//! The base pass must not cast shadows. When the first pass does, the list is
//! stably partitioned so shadow-free passes come first; when every pass casts
//! shadows a dim ambient pass is rendered as the base instead.

use std::rc::Rc;

use crate::config::{EngineConfig, RenderConfig};
use crate::foundation::math::{Mat4, Vec3};
use crate::graphics::api::{BlendFunction, Capability, ClearFlags, DepthFunction, GraphicsApi};
use crate::graphics::{DataBinder, GraphicsState};
use crate::render::{
    DrawStrategy, FilterContext, PassFilter, RenderContext, RenderPass, RenderResult, SolidDraw,
};
use crate::resources::{RenderTarget, Shader, UniformValue};
use crate::scene::{Camera, NodeId, SceneError, SceneGraph};

/// Ambient intensity of the pass synthesized when every pass casts shadows
pub const SYNTHETIC_AMBIENT: f32 = 0.01;

/// Identifier of a registered render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassId(u64);

/// Identifier of a registered pass filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterId(u64);

/// Pass rendered first, writing depth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasePass {
    /// The pass at this index of the (partitioned) pass list
    Listed(usize),
    /// The synthesized ambient pass
    Synthetic,
}

/// Order in which a frame renders the registered passes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassPlan {
    /// Depth-writing base pass
    pub base: BasePass,
    /// Indices of the additively blended passes, in order
    pub additive: Vec<usize>,
}

struct CameraMatrices {
    view: Mat4,
    projection: Mat4,
    eye: Vec3,
}

impl CameraMatrices {
    fn identity() -> Self {
        Self {
            view: Mat4::identity(),
            projection: Mat4::identity(),
            eye: Vec3::zeros(),
        }
    }
}

/// Multi-pass forward renderer
pub struct ForwardEngine {
    binder: DataBinder,
    config: EngineConfig,
    passes: Vec<(PassId, RenderPass)>,
    filters: Vec<(FilterId, Box<dyn PassFilter>)>,
    synthetic_base: RenderPass,
    camera: Option<NodeId>,
    strategy: Box<dyn DrawStrategy>,
    target: RenderTarget,
    next_id: u64,
}

impl ForwardEngine {
    /// Create an engine drawing into the default surface
    ///
    /// `ambient_shader` renders the synthesized base pass and must declare a
    /// `vec3 ambient` uniform.
    pub fn new(
        api: Box<dyn GraphicsApi>,
        config: EngineConfig,
        ambient_shader: Rc<Shader>,
        width: u32,
        height: u32,
    ) -> RenderResult<Self> {
        config.validate()?;

        let mut state = GraphicsState::new(api, &config.state);
        Self::apply_render_config(&mut state, &config.render)?;

        log::info!(
            "Forward engine initialized ({}x{}, strict state = {})",
            width,
            height,
            config.state.strict
        );

        Ok(Self {
            binder: DataBinder::new(state),
            synthetic_base: RenderPass::ambient(
                ambient_shader,
                Vec3::new(SYNTHETIC_AMBIENT, SYNTHETIC_AMBIENT, SYNTHETIC_AMBIENT),
            ),
            config,
            passes: Vec::new(),
            filters: Vec::new(),
            camera: None,
            strategy: Box::new(SolidDraw),
            target: RenderTarget::Default { width, height },
            next_id: 0,
        })
    }

    fn apply_render_config(state: &mut GraphicsState, render: &RenderConfig) -> RenderResult<()> {
        if state.clear_color() != render.clear_color {
            state.set_clear_color(render.clear_color)?;
        }
        if !state.is_enabled(Capability::DepthTest) {
            state.enable(Capability::DepthTest)?;
        }
        if state.depth_function() != DepthFunction::Less {
            state.set_depth_function(DepthFunction::Less)?;
        }
        if state.front_face() != render.front_face {
            state.set_front_face(render.front_face)?;
        }
        if state.cull_face() != render.cull_face {
            state.set_cull_face(render.cull_face)?;
        }
        if state.is_enabled(Capability::CullFace) != render.face_culling {
            state.set_enabled(Capability::CullFace, render.face_culling)?;
        }
        Ok(())
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// State cache
    pub fn state(&self) -> &GraphicsState {
        self.binder.state()
    }

    /// Mutable state cache
    pub fn state_mut(&mut self) -> &mut GraphicsState {
        self.binder.state_mut()
    }

    /// Resource binder
    pub fn data_binder(&self) -> &DataBinder {
        &self.binder
    }

    /// Mutable resource binder, e.g. for disposing a resource context
    pub fn data_binder_mut(&mut self) -> &mut DataBinder {
        &mut self.binder
    }

    // Passes

    /// Append a pass
    pub fn add_render_pass(&mut self, pass: RenderPass) -> PassId {
        let id = PassId(self.next_id());
        log::debug!("Added render pass '{}' ({:?})", pass.name(), id);
        self.passes.push((id, pass));
        id
    }

    /// Remove a pass
    ///
    /// A shadow framebuffer no other owner refers to is released together with
    /// its depth map; it is recreated if the returned pass is added again.
    pub fn remove_render_pass(&mut self, id: PassId) -> Option<RenderPass> {
        let index = self.passes.iter().position(|(pass_id, _)| *pass_id == id)?;
        let (_, pass) = self.passes.remove(index);
        if let Some(shadow) = pass.shadow() {
            if Rc::strong_count(&shadow.framebuffer) == 1 {
                self.binder.release_framebuffer_with_attachments(&shadow.framebuffer);
            }
        }
        Some(pass)
    }

    /// Registered passes in their current order
    pub fn render_passes(&self) -> impl Iterator<Item = &RenderPass> + '_ {
        self.passes.iter().map(|(_, pass)| pass)
    }

    /// Pass rendered as the base when every registered pass casts shadows
    pub fn synthetic_base(&self) -> &RenderPass {
        &self.synthetic_base
    }

    /// Append a pass filter
    pub fn add_pass_filter(&mut self, filter: Box<dyn PassFilter>) -> FilterId {
        let id = FilterId(self.next_id());
        log::debug!("Added pass filter {:?} ({:?})", filter, id);
        self.filters.push((id, filter));
        id
    }

    /// Remove a pass filter
    pub fn remove_pass_filter(&mut self, id: FilterId) -> Option<Box<dyn PassFilter>> {
        let index = self.filters.iter().position(|(filter_id, _)| *filter_id == id)?;
        Some(self.filters.remove(index).1)
    }

    /// Partition the passes and decide the base pass
    pub fn plan_passes(&mut self) -> PassPlan {
        Self::plan(&mut self.passes)
    }

    fn plan(passes: &mut [(PassId, RenderPass)]) -> PassPlan {
        if passes.first().map_or(false, |(_, pass)| pass.has_shadow()) {
            // Stable: relative order within each group is kept
            passes.sort_by_key(|(_, pass)| pass.has_shadow());
        }

        match passes.first() {
            Some((_, pass)) if !pass.has_shadow() => PassPlan {
                base: BasePass::Listed(0),
                additive: (1..passes.len()).collect(),
            },
            _ => PassPlan {
                base: BasePass::Synthetic,
                additive: (0..passes.len()).collect(),
            },
        }
    }

    // Camera, strategy and target

    /// Select the node carrying the [`Camera`] entity
    pub fn set_camera(&mut self, camera: Option<NodeId>) {
        self.camera = camera;
    }

    /// Selected camera node
    pub fn camera(&self) -> Option<NodeId> {
        self.camera
    }

    /// Replace the draw strategy
    pub fn set_draw_strategy(&mut self, strategy: Box<dyn DrawStrategy>) {
        log::debug!("Draw strategy set to {:?}", strategy);
        self.strategy = strategy;
    }

    /// Active draw strategy
    pub fn draw_strategy(&self) -> &dyn DrawStrategy {
        self.strategy.as_ref()
    }

    /// Render into a framebuffer or back into the default surface
    pub fn set_render_target(&mut self, target: RenderTarget) {
        self.target = target;
    }

    /// Active render target
    pub fn render_target(&self) -> &RenderTarget {
        &self.target
    }

    /// Update the default surface size
    pub fn resize(&mut self, width: u32, height: u32) {
        if let RenderTarget::Default {
            width: current_width,
            height: current_height,
        } = &mut self.target
        {
            *current_width = width;
            *current_height = height;
        }
        log::debug!("Surface resized to {}x{}", width, height);
    }

    fn camera_matrices(scene: &SceneGraph, camera: Option<NodeId>) -> RenderResult<CameraMatrices> {
        let Some(node_id) = camera else {
            return Ok(CameraMatrices::identity());
        };
        let node = scene.node(node_id).ok_or(SceneError::NodeNotFound)?;
        let Some(camera) = node.find_entity::<Camera>() else {
            log::warn!("Camera node '{}' has no camera entity, using identity matrices", node.name());
            return Ok(CameraMatrices::identity());
        };

        let world = scene.world_matrix(node_id)?;
        let view = world.try_inverse().unwrap_or_else(|| {
            log::warn!("Camera node '{}' has a singular transform", node.name());
            Mat4::identity()
        });
        Ok(CameraMatrices {
            view,
            projection: camera.projection_matrix(),
            eye: Vec3::new(world[(0, 3)], world[(1, 3)], world[(2, 3)]),
        })
    }

    // Frame

    /// Render a frame, clearing the target first
    pub fn render(&mut self, scene: &SceneGraph) -> RenderResult<()> {
        self.render_with_clear(scene, true)
    }

    /// Render a frame
    pub fn render_with_clear(&mut self, scene: &SceneGraph, clear: bool) -> RenderResult<()> {
        let Self {
            binder,
            config,
            passes,
            filters,
            synthetic_base,
            camera,
            strategy,
            target,
            ..
        } = self;

        binder.bind_as_render_target(target)?;
        if clear {
            let state = binder.state_mut();
            if state.clear_color() != config.render.clear_color {
                state.set_clear_color(config.render.clear_color)?;
            }
            if !state.depth_write() {
                state.set_depth_write(true)?;
            }
            state.clear(ClearFlags::COLOR | ClearFlags::DEPTH);
        }

        if passes.is_empty() {
            return Ok(());
        }

        let plan = Self::plan(passes);
        let matrices = Self::camera_matrices(scene, *camera)?;
        let strategy: &dyn DrawStrategy = &**strategy;

        let base = match plan.base {
            BasePass::Listed(index) => &passes[index].1,
            BasePass::Synthetic => {
                log::trace!("Every pass casts shadows, rendering synthetic ambient base");
                &*synthetic_base
            }
        };
        Self::render_pass(binder, base, scene, &matrices, strategy)?;

        for &index in &plan.additive {
            let pass = &passes[index].1;

            for (_, filter) in filters.iter_mut() {
                let mut ctx = FilterContext {
                    binder: &mut *binder,
                    scene,
                    target: &*target,
                    view: matrices.view,
                    projection: matrices.projection,
                    strategy,
                };
                filter.pre(pass, &mut ctx)?;
            }

            Self::begin_additive(binder.state_mut())?;
            Self::render_pass(binder, pass, scene, &matrices, strategy)?;
            Self::end_additive(binder.state_mut())?;

            for (_, filter) in filters.iter_mut() {
                let mut ctx = FilterContext {
                    binder: &mut *binder,
                    scene,
                    target: &*target,
                    view: matrices.view,
                    projection: matrices.projection,
                    strategy,
                };
                filter.post(pass, &mut ctx)?;
            }
        }
        Ok(())
    }

    fn render_pass(
        binder: &mut DataBinder,
        pass: &RenderPass,
        scene: &SceneGraph,
        matrices: &CameraMatrices,
        strategy: &dyn DrawStrategy,
    ) -> RenderResult<()> {
        log::trace!("Rendering pass '{}'", pass.name());
        let shader = pass.shader();
        binder.bind_shader(shader)?;
        pass.apply(binder)?;
        binder.set_uniform_if_present(shader, "eye_position", &UniformValue::Vec3(matrices.eye))?;

        let mut ctx = RenderContext {
            binder,
            shader,
            view: matrices.view,
            projection: matrices.projection,
            strategy,
            depth_only: false,
        };
        scene.render(&mut ctx)
    }

    fn begin_additive(state: &mut GraphicsState) -> RenderResult<()> {
        if !state.is_enabled(Capability::Blend) {
            state.enable(Capability::Blend)?;
        }
        if state.blend_function() != BlendFunction::ADDITIVE {
            state.set_blend_function(BlendFunction::ADDITIVE)?;
        }
        if state.depth_write() {
            state.set_depth_write(false)?;
        }
        if state.depth_function() != DepthFunction::Equal {
            state.set_depth_function(DepthFunction::Equal)?;
        }
        Ok(())
    }

    fn end_additive(state: &mut GraphicsState) -> RenderResult<()> {
        if state.depth_function() != DepthFunction::Less {
            state.set_depth_function(DepthFunction::Less)?;
        }
        if !state.depth_write() {
            state.set_depth_write(true)?;
        }
        if state.is_enabled(Capability::Blend) {
            state.disable(Capability::Blend)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ForwardEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardEngine")
            .field("passes", &self.passes.len())
            .field("filters", &self.filters.len())
            .field("camera", &self.camera)
            .field("strategy", &self.strategy)
            .field("target", &self.target)
            .finish()
    }
}
