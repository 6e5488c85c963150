//! GPU-side resources
//!
//! Resources are client-side descriptions (geometry, pixels, shader sources)
//! paired with the API handles created for them on first use. Handles live in
//! `Cell`s and start out `INVALID`; [`crate::graphics::DataBinder`] creates and
//! uploads them lazily and is the only component that fills them in.

pub mod context;
pub mod framebuffer;
pub mod mesh;
pub mod shader;
pub mod texture;
pub mod uniform;

pub use context::ResourceContext;
pub use framebuffer::{FrameBuffer, RenderTarget};
pub use mesh::{BufferTriple, Mesh, MeshData, Vertex};
pub use shader::{ResolvedUniform, Shader, StructDef, UniformDecl, UniformType};
pub use texture::Texture;
pub use uniform::UniformValue;

use thiserror::Error;

use crate::assets::ObjError;
use crate::graphics::StateError;

/// Resource creation and binding errors
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The graphics context failed to create an object
    #[error("Graphics context returned an invalid handle while creating {0}")]
    InvalidHandle(&'static str),

    /// A buffer triple is already attached to the mesh
    #[error("Mesh already owns a buffer triple (vertex array {0})")]
    BuffersAlreadyAttached(u32),

    /// A uniform was set that the bound shader does not declare
    #[error("Uniform '{name}' is not declared by shader '{shader}'")]
    UndeclaredUniform {
        /// Shader name
        shader: String,
        /// Uniform name
        name: String,
    },

    /// A value does not fit the declared type of the uniform it is written to
    #[error("Uniform '{name}' of shader '{shader}' expects {expected:?}")]
    UniformTypeMismatch {
        /// Shader name
        shader: String,
        /// Leaf uniform name
        name: String,
        /// Declared type
        expected: UniformType,
    },

    /// A uniform was set on a shader that is not the active program
    #[error("Shader '{shader}' is not bound while setting uniform '{name}'")]
    NoShaderBound {
        /// Shader name
        shader: String,
        /// Uniform name
        name: String,
    },

    /// A declared uniform refers to a struct the shader does not define
    #[error("Unknown uniform struct type '{0}'")]
    UnknownStruct(String),

    /// Client-side data is inconsistent
    #[error("Invalid resource data: {0}")]
    InvalidData(String),

    /// A named resource is not registered
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// State cache error
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Model loading error
    #[error("Model error: {0}")]
    Obj(#[from] ObjError),

    /// Image decoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Result type for resource operations
pub type ResourceResult<T> = Result<T, ResourceError>;
