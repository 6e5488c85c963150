//! Graphics state cache
//!
//! [`GraphicsState`] owns the graphics context and mirrors every piece of
//! toggle and function state the engine touches. A mutator either finds the
//! requested value already in place, or issues exactly one API call and
//! records the new value. Redundant requests are silently absorbed in lenient
//! mode and reported as [`StateError::Unchanged`] in strict mode.
//!
//! Bound resource handles (textures per slot, vertex array, program,
//! framebuffer) are recorded here as well, but the cache does not issue the
//! bind calls for them; [`crate::graphics::DataBinder`] does, after asking the
//! cache whether the bind is needed.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::config::StateConfig;
use crate::foundation::math::Color;
use crate::graphics::api::{
    BlendFunction, Capability, ClearFlags, CullFace, DepthFunction, FrontFace, GraphicsApi,
    Handle, PolygonMode, Viewport,
};

/// State cache errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    /// Strict mode: the requested state is already current
    #[error("Redundant state change: {0} is already current")]
    Unchanged(String),

    /// A bound resource was recorded with the `INVALID` handle
    #[error("Invalid handle recorded for {0}")]
    InvalidHandle(String),
}

/// Result type for state cache operations
pub type StateResult<T> = Result<T, StateError>;

/// Cached mirror of the graphics context state
pub struct GraphicsState {
    api: Box<dyn GraphicsApi>,
    strict: bool,

    capabilities: HashMap<Capability, bool>,
    clear_color: Color,
    depth_function: DepthFunction,
    blend_function: BlendFunction,
    front_face: FrontFace,
    cull_face: CullFace,
    polygon_mode: PolygonMode,
    depth_write: bool,
    color_write: bool,
    viewport: Viewport,

    bound_textures: HashMap<u32, Handle>,
    bound_mesh: Handle,
    bound_shader: Handle,
    bound_framebuffer: Handle,
}

impl fmt::Debug for GraphicsState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphicsState")
            .field("strict", &self.strict)
            .field("capabilities", &self.capabilities)
            .field("depth_function", &self.depth_function)
            .field("blend_function", &self.blend_function)
            .field("bound_mesh", &self.bound_mesh)
            .field("bound_shader", &self.bound_shader)
            .field("bound_framebuffer", &self.bound_framebuffer)
            .finish_non_exhaustive()
    }
}

impl GraphicsState {
    /// Wrap a freshly created context
    ///
    /// The cache starts from the documented initial state of a new context, so
    /// no API calls are issued here.
    pub fn new(api: Box<dyn GraphicsApi>, config: &StateConfig) -> Self {
        let capabilities = Capability::ALL
            .iter()
            .map(|&cap| (cap, cap.initially_enabled()))
            .collect();

        log::debug!("Graphics state cache created (strict = {})", config.strict);

        Self {
            api,
            strict: config.strict,
            capabilities,
            clear_color: Color::TRANSPARENT,
            depth_function: DepthFunction::Less,
            blend_function: BlendFunction::REPLACE,
            front_face: FrontFace::CounterClockwise,
            cull_face: CullFace::Back,
            polygon_mode: PolygonMode::Fill,
            depth_write: true,
            color_write: true,
            viewport: Viewport::default(),
            bound_textures: HashMap::new(),
            bound_mesh: Handle::NONE,
            bound_shader: Handle::NONE,
            bound_framebuffer: Handle::NONE,
        }
    }

    /// Whether redundant changes are reported as errors
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Switch between strict and lenient mode
    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    pub(crate) fn api_mut(&mut self) -> &mut dyn GraphicsApi {
        self.api.as_mut()
    }

    fn redundant(&self, what: impl FnOnce() -> String) -> StateResult<()> {
        if self.strict {
            let what = what();
            log::warn!("Redundant state change rejected: {}", what);
            Err(StateError::Unchanged(what))
        } else {
            Ok(())
        }
    }

    // Toggles

    /// Whether a capability is currently enabled
    pub fn is_enabled(&self, capability: Capability) -> bool {
        self.capabilities.get(&capability).copied().unwrap_or(false)
    }

    /// Enable a capability
    pub fn enable(&mut self, capability: Capability) -> StateResult<()> {
        if self.is_enabled(capability) {
            return self.redundant(|| format!("{:?} enabled", capability));
        }
        self.api.enable(capability);
        self.capabilities.insert(capability, true);
        Ok(())
    }

    /// Disable a capability
    pub fn disable(&mut self, capability: Capability) -> StateResult<()> {
        if !self.is_enabled(capability) {
            return self.redundant(|| format!("{:?} disabled", capability));
        }
        self.api.disable(capability);
        self.capabilities.insert(capability, false);
        Ok(())
    }

    /// Enable or disable a capability
    pub fn set_enabled(&mut self, capability: Capability, enabled: bool) -> StateResult<()> {
        if enabled {
            self.enable(capability)
        } else {
            self.disable(capability)
        }
    }

    // Function state

    /// Current clear color
    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    /// Set the clear color
    pub fn set_clear_color(&mut self, color: Color) -> StateResult<()> {
        if self.clear_color == color {
            return self.redundant(|| format!("clear color {:?}", color));
        }
        self.api.clear_color(color);
        self.clear_color = color;
        Ok(())
    }

    /// Current depth comparison
    pub fn depth_function(&self) -> DepthFunction {
        self.depth_function
    }

    /// Set the depth comparison
    pub fn set_depth_function(&mut self, function: DepthFunction) -> StateResult<()> {
        if self.depth_function == function {
            return self.redundant(|| format!("depth function {:?}", function));
        }
        self.api.depth_func(function);
        self.depth_function = function;
        Ok(())
    }

    /// Current blend factors
    pub fn blend_function(&self) -> BlendFunction {
        self.blend_function
    }

    /// Set the blend factors
    pub fn set_blend_function(&mut self, function: BlendFunction) -> StateResult<()> {
        if self.blend_function == function {
            return self.redundant(|| format!("blend function {:?}", function));
        }
        self.api.blend_func(function);
        self.blend_function = function;
        Ok(())
    }

    /// Current front-face winding
    pub fn front_face(&self) -> FrontFace {
        self.front_face
    }

    /// Set the front-face winding
    pub fn set_front_face(&mut self, winding: FrontFace) -> StateResult<()> {
        if self.front_face == winding {
            return self.redundant(|| format!("front face {:?}", winding));
        }
        self.api.front_face(winding);
        self.front_face = winding;
        Ok(())
    }

    /// Faces currently selected for culling
    pub fn cull_face(&self) -> CullFace {
        self.cull_face
    }

    /// Select the faces removed by culling
    pub fn set_cull_face(&mut self, face: CullFace) -> StateResult<()> {
        if self.cull_face == face {
            return self.redundant(|| format!("cull face {:?}", face));
        }
        self.api.cull_face(face);
        self.cull_face = face;
        Ok(())
    }

    /// Current polygon rasterization mode
    pub fn polygon_mode(&self) -> PolygonMode {
        self.polygon_mode
    }

    /// Set the polygon rasterization mode
    pub fn set_polygon_mode(&mut self, mode: PolygonMode) -> StateResult<()> {
        if self.polygon_mode == mode {
            return self.redundant(|| format!("polygon mode {:?}", mode));
        }
        self.api.polygon_mode(mode);
        self.polygon_mode = mode;
        Ok(())
    }

    /// Whether depth writes are enabled
    pub fn depth_write(&self) -> bool {
        self.depth_write
    }

    /// Enable or disable depth writes
    pub fn set_depth_write(&mut self, write: bool) -> StateResult<()> {
        if self.depth_write == write {
            return self.redundant(|| format!("depth write {}", write));
        }
        self.api.depth_mask(write);
        self.depth_write = write;
        Ok(())
    }

    /// Whether color writes are enabled
    pub fn color_write(&self) -> bool {
        self.color_write
    }

    /// Enable or disable color writes
    pub fn set_color_write(&mut self, write: bool) -> StateResult<()> {
        if self.color_write == write {
            return self.redundant(|| format!("color write {}", write));
        }
        self.api.color_mask(write);
        self.color_write = write;
        Ok(())
    }

    /// Current viewport
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Set the viewport
    pub fn set_viewport(&mut self, viewport: Viewport) -> StateResult<()> {
        if self.viewport == viewport {
            return self.redundant(|| format!("viewport {:?}", viewport));
        }
        self.api.viewport(viewport);
        self.viewport = viewport;
        Ok(())
    }

    /// Clear buffers of the bound render target
    pub fn clear(&mut self, flags: ClearFlags) {
        log::trace!("Clearing {:?}", flags);
        self.api.clear(flags);
    }

    // Bound resources

    /// Texture recorded for a slot, `Handle::NONE` when nothing is bound
    pub fn bound_texture(&self, slot: u32) -> Handle {
        self.bound_textures.get(&slot).copied().unwrap_or(Handle::NONE)
    }

    /// Record the texture bound to a slot
    pub fn set_bound_texture(&mut self, slot: u32, texture: Handle) -> StateResult<()> {
        if !texture.is_valid() {
            return Err(StateError::InvalidHandle(format!("texture slot {}", slot)));
        }
        self.bound_textures.insert(slot, texture);
        Ok(())
    }

    /// Vertex array currently recorded as bound
    pub fn bound_mesh(&self) -> Handle {
        self.bound_mesh
    }

    /// Record the bound vertex array
    pub fn set_bound_mesh(&mut self, vertex_array: Handle) -> StateResult<()> {
        if !vertex_array.is_valid() {
            return Err(StateError::InvalidHandle("mesh".to_string()));
        }
        self.bound_mesh = vertex_array;
        Ok(())
    }

    /// Program currently recorded as in use
    pub fn bound_shader(&self) -> Handle {
        self.bound_shader
    }

    /// Record the program in use
    pub fn set_bound_shader(&mut self, program: Handle) -> StateResult<()> {
        if !program.is_valid() {
            return Err(StateError::InvalidHandle("shader".to_string()));
        }
        self.bound_shader = program;
        Ok(())
    }

    /// Framebuffer currently recorded as bound, `Handle::NONE` for the default surface
    pub fn bound_framebuffer(&self) -> Handle {
        self.bound_framebuffer
    }

    /// Record the bound framebuffer
    pub fn set_bound_framebuffer(&mut self, framebuffer: Handle) -> StateResult<()> {
        if !framebuffer.is_valid() {
            return Err(StateError::InvalidHandle("framebuffer".to_string()));
        }
        self.bound_framebuffer = framebuffer;
        Ok(())
    }

    /// Forget every bound-resource record equal to `handle`
    ///
    /// Used when the object behind a handle is deleted so a later object that
    /// reuses the name is not mistaken for already bound.
    pub(crate) fn forget_handle(&mut self, handle: Handle) {
        self.bound_textures.retain(|_, bound| *bound != handle);
        if self.bound_mesh == handle {
            self.bound_mesh = Handle::NONE;
        }
        if self.bound_shader == handle {
            self.bound_shader = Handle::NONE;
        }
        if self.bound_framebuffer == handle {
            self.bound_framebuffer = Handle::NONE;
        }
    }
}
