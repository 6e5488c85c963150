//! Framebuffers and render targets

use std::cell::Cell;
use std::rc::Rc;

use crate::graphics::api::{Handle, TextureFilter, TextureFormat};
use crate::resources::Texture;

/// Offscreen render target built from texture attachments
#[derive(Debug)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    color: Vec<Rc<Texture>>,
    depth: Option<Rc<Texture>>,
    handle: Cell<Handle>,
}

impl FrameBuffer {
    /// Create a framebuffer without attachments
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            color: Vec::new(),
            depth: None,
            handle: Cell::new(Handle::INVALID),
        }
    }

    /// Depth-only framebuffer, as used for shadow maps
    pub fn depth_only(size: u32) -> Self {
        let depth = Texture::empty(size, size, TextureFormat::Depth24)
            .with_filters(TextureFilter::Nearest, TextureFilter::Nearest);
        Self::new(size, size).with_depth(Rc::new(depth))
    }

    /// Builder pattern: append a color attachment
    pub fn with_color(mut self, texture: Rc<Texture>) -> Self {
        self.color.push(texture);
        self
    }

    /// Builder pattern: set the depth attachment
    pub fn with_depth(mut self, texture: Rc<Texture>) -> Self {
        self.depth = Some(texture);
        self
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Color attachments in attachment-point order
    pub fn color_attachments(&self) -> &[Rc<Texture>] {
        &self.color
    }

    /// Depth attachment
    pub fn depth_attachment(&self) -> Option<&Rc<Texture>> {
        self.depth.as_ref()
    }

    /// API framebuffer name, `INVALID` until first bind
    pub fn handle(&self) -> Handle {
        self.handle.get()
    }

    pub(crate) fn set_handle(&self, handle: Handle) {
        self.handle.set(handle);
    }
}

/// Surface a frame is rendered into
#[derive(Debug, Clone)]
pub enum RenderTarget {
    /// The window surface provided by the context
    Default {
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
    /// An offscreen framebuffer
    FrameBuffer(Rc<FrameBuffer>),
}

impl RenderTarget {
    /// Size in pixels
    pub fn size(&self) -> (u32, u32) {
        match self {
            Self::Default { width, height } => (*width, *height),
            Self::FrameBuffer(fb) => (fb.width(), fb.height()),
        }
    }

    /// Whether this is the default surface
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default { .. })
    }
}
