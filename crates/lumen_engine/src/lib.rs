//! # Lumen Engine
//!
//! A scene-graph driven, multi-pass forward renderer over an immediate-mode
//! graphics API.
//!
//! ## Features
//!
//! - **Scene Graph**: Named node hierarchy with transforms and pluggable entities
//! - **Forward Rendering**: One additive pass per light, shadow maps through pass filters
//! - **State Cache**: Redundant API state changes are skipped or reported
//! - **Lazy Resources**: Meshes, textures, shaders and framebuffers upload on first use
//! - **OBJ Import**: Face-indexed models converted to indexed vertex buffers
//! - **Headless Backend**: Call-recording graphics context for tests and tools
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::rc::Rc;
//! use lumen_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ambient = Rc::new(
//!         Shader::new("ambient")
//!             .with_stage(ShaderStage::Vertex, "uniform mat4 mvp; void main() {}")
//!             .with_stage(ShaderStage::Fragment, "uniform vec3 ambient; void main() {}")
//!             .with_uniform("mvp", UniformType::Mat4)
//!             .with_uniform("ambient", UniformType::Vec3),
//!     );
//!     let mut engine = ForwardEngine::new(
//!         Box::new(HeadlessApi::new()),
//!         EngineConfig::default(),
//!         Rc::clone(&ambient),
//!         800,
//!         600,
//!     )?;
//!     engine.add_render_pass(RenderPass::ambient(ambient, Vec3::new(0.2, 0.2, 0.2)));
//!
//!     let mut scene = SceneGraph::new();
//!     let cube = scene.create_node("cube");
//!     scene.add_entity(cube, Box::new(Figure::new(Mesh::new(MeshData::cube()), Material::new())))?;
//!     scene.add_child(scene.root(), cube)?;
//!
//!     scene.update(1.0 / 60.0);
//!     engine.render(&scene)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod assets;
pub mod config;
pub mod foundation;
pub mod graphics;
pub mod render;
pub mod resources;
pub mod scene;

#[cfg(test)]
mod tests;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{MeshIndexer, ObjLoader},
        config::{Config, EngineConfig, RenderConfig, StateConfig},
        foundation::math::{Color, Mat4, Quat, Vec2, Vec3, Vec4},
        graphics::{
            api::{Capability, ShaderStage},
            DataBinder, GraphicsApi, GraphicsState, HeadlessApi,
        },
        render::{
            BaseLight, DirectionalLight, ForwardEngine, PointLight, RenderError, RenderPass,
            RenderResult, ShadowInfo, ShadowMapFilter, SolidDraw, SpotLight, WireframeDraw,
        },
        resources::{Mesh, MeshData, ResourceContext, Shader, Texture, UniformType, UniformValue},
        scene::{Camera, Controller, Entity, Figure, Material, NodeId, SceneGraph, Transform},
    };
}
