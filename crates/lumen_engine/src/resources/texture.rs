//! 2D textures

use std::cell::Cell;
use std::path::Path;

use crate::graphics::api::{Handle, TextureFilter, TextureFormat};
use crate::resources::{ResourceError, ResourceResult};

/// Decoded pixels plus sampling parameters and the API texture they live in
#[derive(Debug)]
pub struct Texture {
    width: u32,
    height: u32,
    format: TextureFormat,
    min_filter: TextureFilter,
    mag_filter: TextureFilter,
    pixels: Option<Vec<u8>>,
    handle: Cell<Handle>,
}

impl Texture {
    /// Create a texture from tightly packed pixel rows
    pub fn new(width: u32, height: u32, format: TextureFormat, pixels: Vec<u8>) -> ResourceResult<Self> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if pixels.len() != expected {
            return Err(ResourceError::InvalidData(format!(
                "{}x{} {:?} texture needs {} bytes, got {}",
                width,
                height,
                format,
                expected,
                pixels.len()
            )));
        }
        Ok(Self {
            pixels: Some(pixels),
            ..Self::empty(width, height, format)
        })
    }

    /// Create a texture with uninitialized storage, typically a render target
    pub fn empty(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            format,
            min_filter: TextureFilter::Linear,
            mag_filter: TextureFilter::Linear,
            pixels: None,
            handle: Cell::new(Handle::INVALID),
        }
    }

    /// Create an RGBA texture from a decoded image
    pub fn from_image(image: &image::DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            pixels: Some(rgba.into_raw()),
            ..Self::empty(width, height, TextureFormat::Rgba8)
        }
    }

    /// Decode an image file into an RGBA texture
    pub fn load<P: AsRef<Path>>(path: P) -> ResourceResult<Self> {
        let path = path.as_ref();
        let image = image::open(path)?;
        log::debug!(
            "Loaded texture {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(Self::from_image(&image))
    }

    /// Single-texel texture of one color
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            pixels: Some(rgba.to_vec()),
            min_filter: TextureFilter::Nearest,
            mag_filter: TextureFilter::Nearest,
            ..Self::empty(1, 1, TextureFormat::Rgba8)
        }
    }

    /// Builder pattern: set the sampling filters
    pub fn with_filters(mut self, min_filter: TextureFilter, mag_filter: TextureFilter) -> Self {
        self.min_filter = min_filter;
        self.mag_filter = mag_filter;
        self
    }

    /// Width in texels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in texels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Internal storage format
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// Minification filter
    pub fn min_filter(&self) -> TextureFilter {
        self.min_filter
    }

    /// Magnification filter
    pub fn mag_filter(&self) -> TextureFilter {
        self.mag_filter
    }

    /// Pixel data, `None` for render-target storage
    pub fn pixels(&self) -> Option<&[u8]> {
        self.pixels.as_deref()
    }

    /// API texture name, `INVALID` until first upload
    pub fn handle(&self) -> Handle {
        self.handle.get()
    }

    /// Whether the texture has been uploaded
    pub fn is_uploaded(&self) -> bool {
        self.handle.get().is_valid()
    }

    pub(crate) fn set_handle(&self, handle: Handle) {
        self.handle.set(handle);
    }
}
