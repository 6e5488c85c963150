//! Resource context
//!
//! Named registry of the meshes, textures, shaders and offscreen framebuffers
//! an application loads.
//! The context is created explicitly, passed to whatever needs to look
//! resources up, and disposed explicitly with the binder that uploaded them:
//!
//! ```text
//! ResourceContext::new()  ->  load_* / insert_*  ->  get_*  ->  dispose(binder)
//! ```
//!
//! Disposing releases every API object the binder created for the registered
//! resources and empties the registry. Resources still referenced elsewhere
//! stay valid on the client side and are uploaded again on their next bind.

use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use crate::assets::{MeshIndexer, ObjLoader};
use crate::graphics::DataBinder;
use crate::resources::{
    FrameBuffer, Mesh, MeshData, ResourceError, ResourceResult, Shader, Texture,
};

/// Registry of named resources
#[derive(Debug, Default)]
pub struct ResourceContext {
    meshes: HashMap<String, Mesh>,
    textures: HashMap<String, Rc<Texture>>,
    shaders: HashMap<String, Rc<Shader>>,
    framebuffers: HashMap<String, Rc<FrameBuffer>>,
}

impl ResourceContext {
    /// Create an empty context
    pub fn new() -> Self {
        log::info!("Resource context created");
        Self::default()
    }

    // Meshes

    /// Index OBJ text and register the resulting mesh
    pub fn load_mesh_from_str(&mut self, name: &str, obj: &str) -> ResourceResult<Mesh> {
        let model = ObjLoader::parse(obj)?;
        let mesh = Mesh::new(MeshData::from_indexed(&MeshIndexer::index(&model)?));
        Ok(self.insert_mesh(name, mesh))
    }

    /// Load and index an OBJ file and register the resulting mesh
    ///
    /// A mesh already registered under `name` is returned without reloading.
    pub fn load_mesh<P: AsRef<Path>>(&mut self, name: &str, path: P) -> ResourceResult<Mesh> {
        if let Some(mesh) = self.meshes.get(name) {
            return Ok(mesh.clone());
        }
        let model = ObjLoader::load_obj(path)?;
        let mesh = Mesh::new(MeshData::from_indexed(&MeshIndexer::index(&model)?));
        Ok(self.insert_mesh(name, mesh))
    }

    /// Register a mesh, replacing any mesh of the same name
    pub fn insert_mesh(&mut self, name: &str, mesh: Mesh) -> Mesh {
        if self.meshes.insert(name.to_string(), mesh.clone()).is_some() {
            log::warn!("Mesh '{}' replaced", name);
        }
        mesh
    }

    /// Registered mesh
    pub fn get_mesh(&self, name: &str) -> ResourceResult<Mesh> {
        self.meshes
            .get(name)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound(format!("mesh '{}'", name)))
    }

    /// Unregister a mesh
    pub fn remove_mesh(&mut self, name: &str) -> Option<Mesh> {
        self.meshes.remove(name)
    }

    // Textures

    /// Decode an image file and register the texture
    pub fn load_texture<P: AsRef<Path>>(&mut self, name: &str, path: P) -> ResourceResult<Rc<Texture>> {
        if let Some(texture) = self.textures.get(name) {
            return Ok(Rc::clone(texture));
        }
        let texture = Texture::load(path)?;
        Ok(self.insert_texture(name, texture))
    }

    /// Register a texture, replacing any texture of the same name
    pub fn insert_texture(&mut self, name: &str, texture: Texture) -> Rc<Texture> {
        let texture = Rc::new(texture);
        if self.textures.insert(name.to_string(), Rc::clone(&texture)).is_some() {
            log::warn!("Texture '{}' replaced", name);
        }
        texture
    }

    /// Registered texture
    pub fn get_texture(&self, name: &str) -> ResourceResult<Rc<Texture>> {
        self.textures
            .get(name)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound(format!("texture '{}'", name)))
    }

    /// Unregister a texture
    pub fn remove_texture(&mut self, name: &str) -> Option<Rc<Texture>> {
        self.textures.remove(name)
    }

    // Shaders

    /// Register a shader under its own name, replacing any shader of that name
    pub fn insert_shader(&mut self, shader: Shader) -> Rc<Shader> {
        let shader = Rc::new(shader);
        if self
            .shaders
            .insert(shader.name().to_string(), Rc::clone(&shader))
            .is_some()
        {
            log::warn!("Shader '{}' replaced", shader.name());
        }
        shader
    }

    /// Registered shader
    pub fn get_shader(&self, name: &str) -> ResourceResult<Rc<Shader>> {
        self.shaders
            .get(name)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound(format!("shader '{}'", name)))
    }

    /// Unregister a shader
    pub fn remove_shader(&mut self, name: &str) -> Option<Rc<Shader>> {
        self.shaders.remove(name)
    }

    // Framebuffers

    /// Register an offscreen framebuffer, replacing any of the same name
    pub fn insert_framebuffer(&mut self, name: &str, framebuffer: Rc<FrameBuffer>) -> Rc<FrameBuffer> {
        if self
            .framebuffers
            .insert(name.to_string(), Rc::clone(&framebuffer))
            .is_some()
        {
            log::warn!("Framebuffer '{}' replaced", name);
        }
        framebuffer
    }

    /// Registered framebuffer
    pub fn get_framebuffer(&self, name: &str) -> ResourceResult<Rc<FrameBuffer>> {
        self.framebuffers
            .get(name)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound(format!("framebuffer '{}'", name)))
    }

    /// Unregister a framebuffer
    pub fn remove_framebuffer(&mut self, name: &str) -> Option<Rc<FrameBuffer>> {
        self.framebuffers.remove(name)
    }

    /// Number of registered resources of every kind
    pub fn len(&self) -> usize {
        self.meshes.len() + self.textures.len() + self.shaders.len() + self.framebuffers.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release every registered resource's API objects and empty the registry
    pub fn dispose(&mut self, binder: &mut DataBinder) {
        let count = self.len();
        for (_, mesh) in self.meshes.drain() {
            binder.release_mesh(&mesh);
        }
        for (_, texture) in self.textures.drain() {
            binder.release_texture(&texture);
        }
        for (_, shader) in self.shaders.drain() {
            binder.release_shader(&shader);
        }
        for (_, framebuffer) in self.framebuffers.drain() {
            binder.release_framebuffer_with_attachments(&framebuffer);
        }
        log::info!("Resource context disposed ({} resources released)", count);
    }
}
