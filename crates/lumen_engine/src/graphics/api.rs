//! Immediate-mode graphics API abstraction
//!
//! This module defines the trait a graphics context must implement to drive
//! the engine. The trait mirrors an OpenGL-style state machine: state is
//! toggled globally, resources are bound before use, and objects are named by
//! opaque integer handles.
//!
//! Only [`crate::graphics::GraphicsState`] and [`crate::graphics::DataBinder`]
//! hold a `GraphicsApi`. Every other component goes through them, which keeps
//! the state cache an exact mirror of the context.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::foundation::math::Color;

/// Opaque name of an API-side object (texture, buffer, program, framebuffer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(pub u32);

impl Handle {
    /// Marker for objects that have not been created yet
    pub const INVALID: Self = Self(u32::MAX);

    /// The reserved "no object" name: unbinds, or selects the default framebuffer
    pub const NONE: Self = Self(0);

    /// Whether this handle names a created object or the reserved `NONE`
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    /// Raw integer value
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Toggleable server-side capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Depth testing
    DepthTest,
    /// Color blending
    Blend,
    /// Face culling
    CullFace,
    /// Stencil testing
    StencilTest,
    /// Scissor testing
    ScissorTest,
    /// Polygon offset for filled primitives
    PolygonOffsetFill,
    /// Multisample rasterization
    Multisample,
    /// Color dithering
    Dither,
}

impl Capability {
    /// Every capability the cache tracks
    pub const ALL: [Self; 8] = [
        Self::DepthTest,
        Self::Blend,
        Self::CullFace,
        Self::StencilTest,
        Self::ScissorTest,
        Self::PolygonOffsetFill,
        Self::Multisample,
        Self::Dither,
    ];

    /// State of the capability on a freshly created context
    pub fn initially_enabled(self) -> bool {
        matches!(self, Self::Multisample | Self::Dither)
    }
}

/// Depth comparison function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepthFunction {
    /// Never passes
    Never,
    /// Passes if the incoming depth is less than the stored depth
    Less,
    /// Passes if the depths are equal
    Equal,
    /// Passes if the incoming depth is less than or equal to the stored depth
    LessOrEqual,
    /// Passes if the incoming depth is greater than the stored depth
    Greater,
    /// Passes if the depths differ
    NotEqual,
    /// Passes if the incoming depth is greater than or equal to the stored depth
    GreaterOrEqual,
    /// Always passes
    Always,
}

/// Blend equation factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendFactor {
    /// `0`
    Zero,
    /// `1`
    One,
    /// Source color
    SrcColor,
    /// `1 - source color`
    OneMinusSrcColor,
    /// Source alpha
    SrcAlpha,
    /// `1 - source alpha`
    OneMinusSrcAlpha,
    /// Destination color
    DstColor,
    /// `1 - destination color`
    OneMinusDstColor,
    /// Destination alpha
    DstAlpha,
    /// `1 - destination alpha`
    OneMinusDstAlpha,
}

/// Source and destination blend factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlendFunction {
    /// Factor applied to the incoming fragment
    pub src: BlendFactor,
    /// Factor applied to the stored fragment
    pub dst: BlendFactor,
}

impl BlendFunction {
    /// `ONE, ZERO`: the context default, overwrites the target
    pub const REPLACE: Self = Self::new(BlendFactor::One, BlendFactor::Zero);

    /// `ONE, ONE`: sums light contributions
    pub const ADDITIVE: Self = Self::new(BlendFactor::One, BlendFactor::One);

    /// `SRC_ALPHA, ONE_MINUS_SRC_ALPHA`: classic transparency
    pub const ALPHA: Self = Self::new(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);

    /// Create a blend function
    pub const fn new(src: BlendFactor, dst: BlendFactor) -> Self {
        Self { src, dst }
    }
}

impl Default for BlendFunction {
    fn default() -> Self {
        Self::REPLACE
    }
}

/// Winding order of front-facing polygons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrontFace {
    /// Clockwise
    Clockwise,
    /// Counter-clockwise
    CounterClockwise,
}

/// Faces removed by face culling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CullFace {
    /// Front faces
    Front,
    /// Back faces
    Back,
    /// Both
    FrontAndBack,
}

/// Polygon rasterization mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    /// Filled polygons
    Fill,
    /// Polygon outlines
    Line,
    /// Polygon vertices only
    Point,
}

bitflags! {
    /// Buffers affected by a clear call
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u32 {
        /// Color buffer
        const COLOR = 1;
        /// Depth buffer
        const DEPTH = 1 << 1;
        /// Stencil buffer
        const STENCIL = 1 << 2;
    }
}

/// Primitive topology of an indexed draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawMode {
    /// Independent triangles
    Triangles,
    /// Independent line segments
    Lines,
    /// Points
    Points,
    /// Connected triangle strip
    TriangleStrip,
    /// Connected line strip
    LineStrip,
}

/// Texture sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    /// Nearest texel
    Nearest,
    /// Bilinear
    Linear,
    /// Nearest texel of the nearest mip level
    NearestMipmapNearest,
    /// Trilinear
    LinearMipmapLinear,
}

/// Internal texture storage format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit RGBA
    Rgba8,
    /// 8-bit RGB
    Rgb8,
    /// 8-bit single channel
    R8,
    /// 24-bit depth
    Depth24,
    /// 32-bit float depth
    Depth32F,
}

impl TextureFormat {
    /// Bytes per texel of client-side pixel data
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8 | Self::Depth24 | Self::Depth32F => 4,
            Self::Rgb8 => 3,
            Self::R8 => 1,
        }
    }

    /// Whether the format stores depth
    pub fn is_depth(self) -> bool {
        matches!(self, Self::Depth24 | Self::Depth32F)
    }
}

/// Programmable pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex stage
    Vertex,
    /// Fragment stage
    Fragment,
    /// Geometry stage
    Geometry,
}

/// Framebuffer attachment point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attachment {
    /// Numbered color attachment
    Color(u32),
    /// Depth attachment
    Depth,
}

/// Result of a framebuffer completeness check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferStatus {
    /// Ready for rendering
    Complete,
    /// An attachment is not renderable
    IncompleteAttachment,
    /// No image is attached at all
    MissingAttachment,
    /// A draw buffer names an attachment point without an image
    IncompleteDrawBuffer,
    /// The read buffer names an attachment point without an image
    IncompleteReadBuffer,
    /// Attachments disagree on sample counts
    IncompleteMultisample,
    /// The combination of formats is not supported by the implementation
    Unsupported,
}

/// Rectangle of the render target written by rasterization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Viewport {
    /// Left edge in pixels
    pub x: i32,
    /// Bottom edge in pixels
    pub y: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Viewport {
    /// Viewport covering a whole target of the given size
    pub fn full(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}

/// One attribute of an interleaved vertex layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Shader input location
    pub location: u32,
    /// Number of `f32` components
    pub components: u32,
    /// Byte offset inside one vertex
    pub offset: usize,
}

/// Interleaved vertex buffer layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLayout {
    /// Size of one vertex in bytes
    pub stride: usize,
    /// Attributes in location order
    pub attributes: &'static [VertexAttribute],
}

/// Client-side description of a texture image upload
#[derive(Debug, Clone, Copy)]
pub struct TextureUpload<'a> {
    /// Width in texels
    pub width: u32,
    /// Height in texels
    pub height: u32,
    /// Internal storage format
    pub format: TextureFormat,
    /// Minification filter
    pub min_filter: TextureFilter,
    /// Magnification filter
    pub mag_filter: TextureFilter,
    /// Pixel data, `None` to allocate uninitialized storage
    pub pixels: Option<&'a [u8]>,
}

/// Raw value written to a uniform location
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformData {
    /// `float`
    Float(f32),
    /// `int`, `bool` or sampler slot
    Int(i32),
    /// `vec2`
    Vec2([f32; 2]),
    /// `vec3`
    Vec3([f32; 3]),
    /// `vec4`
    Vec4([f32; 4]),
    /// `mat4`, column-major
    Mat4([f32; 16]),
}

/// Immediate-mode graphics context
///
/// Implementations issue the real driver calls. Object creation methods return
/// [`Handle::INVALID`] when the implementation cannot create the object.
pub trait GraphicsApi {
    /// Enable a capability
    fn enable(&mut self, capability: Capability);

    /// Disable a capability
    fn disable(&mut self, capability: Capability);

    /// Set the color used by color clears
    fn clear_color(&mut self, color: Color);

    /// Clear buffers of the bound framebuffer
    fn clear(&mut self, flags: ClearFlags);

    /// Set the depth comparison
    fn depth_func(&mut self, function: DepthFunction);

    /// Enable or disable depth buffer writes
    fn depth_mask(&mut self, write: bool);

    /// Enable or disable writes to every color channel
    fn color_mask(&mut self, write: bool);

    /// Set the blend factors
    fn blend_func(&mut self, function: BlendFunction);

    /// Set the front-facing winding
    fn front_face(&mut self, winding: FrontFace);

    /// Choose which faces are culled
    fn cull_face(&mut self, face: CullFace);

    /// Set the polygon rasterization mode
    fn polygon_mode(&mut self, mode: PolygonMode);

    /// Set the viewport
    fn viewport(&mut self, viewport: Viewport);

    /// Create a texture object
    fn gen_texture(&mut self) -> Handle;

    /// Select the texture unit affected by `bind_texture`
    fn active_texture(&mut self, slot: u32);

    /// Bind a 2D texture to the active unit
    fn bind_texture(&mut self, texture: Handle);

    /// Specify storage and contents of the bound texture
    fn tex_image_2d(&mut self, upload: &TextureUpload<'_>);

    /// Delete a texture object
    fn delete_texture(&mut self, texture: Handle);

    /// Create a vertex array object
    fn gen_vertex_array(&mut self) -> Handle;

    /// Create a buffer object
    fn gen_buffer(&mut self) -> Handle;

    /// Bind a vertex array, `Handle::NONE` unbinds
    fn bind_vertex_array(&mut self, vertex_array: Handle);

    /// Upload interleaved vertex data into a buffer and describe its layout
    /// to the bound vertex array
    fn vertex_buffer_data(&mut self, buffer: Handle, data: &[u8], layout: &VertexLayout);

    /// Upload index data into a buffer attached to the bound vertex array
    fn index_buffer_data(&mut self, buffer: Handle, indices: &[u32]);

    /// Delete a vertex array object
    fn delete_vertex_array(&mut self, vertex_array: Handle);

    /// Delete a buffer object
    fn delete_buffer(&mut self, buffer: Handle);

    /// Draw `count` indices of the bound vertex array
    fn draw_elements(&mut self, mode: DrawMode, count: u32);

    /// Create a program object
    fn create_program(&mut self) -> Handle;

    /// Compile a stage and attach it to a program; `Err` carries the info log
    fn compile_shader(&mut self, program: Handle, stage: ShaderStage, source: &str) -> Result<(), String>;

    /// Link a program; `Err` carries the info log
    fn link_program(&mut self, program: Handle) -> Result<(), String>;

    /// Validate a program against the current state; `Err` carries the info log
    fn validate_program(&mut self, program: Handle) -> Result<(), String>;

    /// Make a program current
    fn use_program(&mut self, program: Handle);

    /// Location of an active uniform, `None` when the driver does not expose it
    fn uniform_location(&mut self, program: Handle, name: &str) -> Option<i32>;

    /// Write a uniform of the current program
    fn set_uniform(&mut self, location: i32, value: UniformData);

    /// Delete a program object
    fn delete_program(&mut self, program: Handle);

    /// Create a framebuffer object
    fn gen_framebuffer(&mut self) -> Handle;

    /// Bind a framebuffer for drawing, `Handle::NONE` selects the default surface
    fn bind_framebuffer(&mut self, framebuffer: Handle);

    /// Attach a texture to the bound framebuffer
    fn framebuffer_texture(&mut self, attachment: Attachment, texture: Handle);

    /// Select how many color attachments receive fragment output, `0` for none
    fn draw_buffers(&mut self, color_attachments: u32);

    /// Check completeness of the bound framebuffer
    fn check_framebuffer_status(&mut self) -> FramebufferStatus;

    /// Delete a framebuffer object
    fn delete_framebuffer(&mut self, framebuffer: Handle);
}
