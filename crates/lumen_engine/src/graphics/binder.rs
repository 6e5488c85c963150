//! Resource binder
//!
//! [`DataBinder`] uploads textures, meshes, shaders and framebuffers the first
//! time they are used and binds them afterwards. Before every bind it asks the
//! [`GraphicsState`] what is already bound, so binding the same resource twice
//! in a row costs a single API call.
//!
//! Shader build failures and incomplete framebuffers are logged and rendering
//! continues. A context that cannot create an object is a hard error.

use std::collections::HashMap;

use crate::graphics::api::{Attachment, FramebufferStatus, Handle, TextureUpload, Viewport};
use crate::graphics::state::GraphicsState;
use crate::resources::{
    BufferTriple, FrameBuffer, Mesh, RenderTarget, ResolvedUniform, ResourceError,
    ResourceResult, Shader, Texture, UniformValue, Vertex,
};

/// Lazily uploading, redundancy-skipping resource binder
#[derive(Debug)]
pub struct DataBinder {
    state: GraphicsState,
    active_shader: Option<String>,
}

impl DataBinder {
    /// Create a binder over a state cache
    pub fn new(state: GraphicsState) -> Self {
        Self {
            state,
            active_shader: None,
        }
    }

    /// State cache
    pub fn state(&self) -> &GraphicsState {
        &self.state
    }

    /// Mutable state cache
    pub fn state_mut(&mut self) -> &mut GraphicsState {
        &mut self.state
    }

    fn checked(handle: Handle, what: &'static str) -> ResourceResult<Handle> {
        if handle.is_valid() {
            Ok(handle)
        } else {
            log::error!("Graphics context failed to create {}", what);
            Err(ResourceError::InvalidHandle(what))
        }
    }

    // Textures

    /// Upload a texture if needed and bind it to a slot
    pub fn bind_texture(&mut self, texture: &Texture, slot: u32) -> ResourceResult<()> {
        if !texture.is_uploaded() {
            self.upload_texture(texture, slot)?;
        }

        let handle = texture.handle();
        if self.state.bound_texture(slot) != handle {
            log::trace!("Binding texture {:?} to slot {}", handle, slot);
            let api = self.state.api_mut();
            api.active_texture(slot);
            api.bind_texture(handle);
            self.state.set_bound_texture(slot, handle)?;
        }
        Ok(())
    }

    fn upload_texture(&mut self, texture: &Texture, slot: u32) -> ResourceResult<()> {
        let api = self.state.api_mut();
        let handle = Self::checked(api.gen_texture(), "texture")?;

        api.active_texture(slot);
        api.bind_texture(handle);
        api.tex_image_2d(&TextureUpload {
            width: texture.width(),
            height: texture.height(),
            format: texture.format(),
            min_filter: texture.min_filter(),
            mag_filter: texture.mag_filter(),
            pixels: texture.pixels(),
        });
        self.state.set_bound_texture(slot, handle)?;
        texture.set_handle(handle);

        log::debug!(
            "Uploaded {}x{} {:?} texture as {:?}",
            texture.width(),
            texture.height(),
            texture.format(),
            handle
        );
        Ok(())
    }

    /// Unbind whatever texture occupies a slot
    pub fn unbind_texture(&mut self, slot: u32) -> ResourceResult<()> {
        if self.state.bound_texture(slot) != Handle::NONE {
            let api = self.state.api_mut();
            api.active_texture(slot);
            api.bind_texture(Handle::NONE);
            self.state.set_bound_texture(slot, Handle::NONE)?;
        }
        Ok(())
    }

    /// Delete a texture's API object
    pub fn release_texture(&mut self, texture: &Texture) {
        let handle = texture.handle();
        if handle.is_valid() {
            self.state.api_mut().delete_texture(handle);
            self.state.forget_handle(handle);
            texture.set_handle(Handle::INVALID);
        }
    }

    // Meshes

    /// Upload a mesh if needed and bind its vertex array; `None` unbinds
    pub fn bind_mesh(&mut self, mesh: Option<&Mesh>) -> ResourceResult<()> {
        let vertex_array = match mesh {
            Some(mesh) => {
                if mesh.data().needs_upload() {
                    self.upload_mesh(mesh)?;
                }
                match mesh.data().buffers() {
                    Some(buffers) => buffers.vertex_array,
                    None => return Err(ResourceError::InvalidHandle("vertex array")),
                }
            }
            None => Handle::NONE,
        };

        if self.state.bound_mesh() != vertex_array {
            log::trace!("Binding vertex array {:?}", vertex_array);
            self.state.api_mut().bind_vertex_array(vertex_array);
            self.state.set_bound_mesh(vertex_array)?;
        }
        Ok(())
    }

    fn upload_mesh(&mut self, mesh: &Mesh) -> ResourceResult<()> {
        let data = mesh.data();
        if data.buffers().is_some() {
            log::debug!("Regenerating buffers for re-supplied mesh geometry");
            self.release_mesh(mesh);
        }

        let buffers = self.gen_buffer_triple()?;
        if let Err(err) = data.attach_buffers(buffers) {
            self.delete_buffer_triple(buffers);
            return Err(err);
        }

        let api = self.state.api_mut();
        api.bind_vertex_array(buffers.vertex_array);
        {
            let vertices = data.vertices();
            api.vertex_buffer_data(
                buffers.vertex_buffer,
                bytemuck::cast_slice::<Vertex, u8>(&vertices),
                &Vertex::LAYOUT,
            );
            api.index_buffer_data(buffers.index_buffer, &data.indices());
            log::debug!(
                "Uploaded mesh: {} vertices, {} indices into {:?}",
                vertices.len(),
                data.index_count(),
                buffers.vertex_array
            );
        }
        self.state.set_bound_mesh(buffers.vertex_array)?;
        data.mark_uploaded();
        Ok(())
    }

    /// Generate a vertex array and two buffers, deleting the partial set on failure
    fn gen_buffer_triple(&mut self) -> ResourceResult<BufferTriple> {
        let api = self.state.api_mut();
        let vertex_array = Self::checked(api.gen_vertex_array(), "vertex array")?;

        let vertex_buffer = match Self::checked(api.gen_buffer(), "vertex buffer") {
            Ok(handle) => handle,
            Err(err) => {
                api.delete_vertex_array(vertex_array);
                return Err(err);
            }
        };
        let index_buffer = match Self::checked(api.gen_buffer(), "index buffer") {
            Ok(handle) => handle,
            Err(err) => {
                api.delete_buffer(vertex_buffer);
                api.delete_vertex_array(vertex_array);
                return Err(err);
            }
        };

        Ok(BufferTriple {
            vertex_array,
            vertex_buffer,
            index_buffer,
        })
    }

    fn delete_buffer_triple(&mut self, buffers: BufferTriple) {
        let api = self.state.api_mut();
        api.delete_vertex_array(buffers.vertex_array);
        api.delete_buffer(buffers.vertex_buffer);
        api.delete_buffer(buffers.index_buffer);
        self.state.forget_handle(buffers.vertex_array);
    }

    /// Bind a mesh and issue its indexed draw call
    pub fn draw(&mut self, mesh: &Mesh) -> ResourceResult<()> {
        self.bind_mesh(Some(mesh))?;
        let data = mesh.data();
        let count = u32::try_from(data.index_count())
            .map_err(|_| ResourceError::InvalidData("index count exceeds u32".to_string()))?;
        self.state.api_mut().draw_elements(data.draw_mode(), count);
        Ok(())
    }

    /// Delete a mesh's buffer triple; the next bind uploads it again
    pub fn release_mesh(&mut self, mesh: &Mesh) {
        if let Some(buffers) = mesh.data().detach_buffers() {
            self.delete_buffer_triple(buffers);
            log::debug!("Released mesh buffers {:?}", buffers);
        }
    }

    // Shaders

    /// Build a shader if needed, make it current and resolve its uniforms
    pub fn bind_shader(&mut self, shader: &Shader) -> ResourceResult<()> {
        if !shader.program().is_valid() {
            self.build_shader(shader)?;
        }

        let program = shader.program();
        if self.state.bound_shader() != program {
            log::trace!("Using program {:?} ({})", program, shader.name());
            self.state.api_mut().use_program(program);
            self.state.set_bound_shader(program)?;
        }
        self.active_shader = Some(shader.name().to_string());

        if !shader.locations_resolved() {
            self.resolve_uniforms(shader)?;
        }
        Ok(())
    }

    fn build_shader(&mut self, shader: &Shader) -> ResourceResult<()> {
        let api = self.state.api_mut();
        let program = Self::checked(api.create_program(), "program")?;
        let mut failed = false;

        for (stage, source) in shader.stages() {
            if let Err(info) = api.compile_shader(program, *stage, source) {
                log::error!("Shader '{}' {:?} stage failed to compile: {}", shader.name(), stage, info);
                failed = true;
            }
        }
        if let Err(info) = api.link_program(program) {
            log::error!("Shader '{}' failed to link: {}", shader.name(), info);
            failed = true;
        }
        if let Err(info) = api.validate_program(program) {
            log::error!("Shader '{}' failed validation: {}", shader.name(), info);
            failed = true;
        }

        shader.set_program(program, failed);
        if failed {
            log::warn!("Continuing with broken shader '{}'", shader.name());
        } else {
            log::debug!("Built shader '{}' as {:?}", shader.name(), program);
        }
        Ok(())
    }

    fn resolve_uniforms(&mut self, shader: &Shader) -> ResourceResult<()> {
        let program = shader.program();
        let api = self.state.api_mut();
        let mut locations = HashMap::new();

        for (name, ty) in shader.expanded_uniforms()? {
            let location = api.uniform_location(program, &name);
            if location.is_none() {
                log::debug!("Uniform '{}' of shader '{}' is not active", name, shader.name());
            }
            locations.insert(name, ResolvedUniform { location, ty });
        }
        shader.store_locations(locations);
        Ok(())
    }

    /// Set a uniform of the bound shader
    ///
    /// The shader must be the active program. Every leaf of `value` must be
    /// declared with a matching type; struct values are written leaf by leaf.
    pub fn set_uniform(&mut self, shader: &Shader, name: &str, value: &UniformValue) -> ResourceResult<()> {
        let program = shader.program();
        if !program.is_valid() || self.state.bound_shader() != program {
            return Err(ResourceError::NoShaderBound {
                shader: shader.name().to_string(),
                name: name.to_string(),
            });
        }
        value.try_for_each_leaf(name, |leaf, leaf_value| self.write_leaf(shader, leaf, leaf_value))
    }

    fn write_leaf(&mut self, shader: &Shader, leaf: &str, value: &UniformValue) -> ResourceResult<()> {
        let resolved = shader
            .resolved(leaf)
            .ok_or_else(|| ResourceError::UndeclaredUniform {
                shader: shader.name().to_string(),
                name: leaf.to_string(),
            })?;
        if !value.matches(&resolved.ty) {
            return Err(ResourceError::UniformTypeMismatch {
                shader: shader.name().to_string(),
                name: leaf.to_string(),
                expected: resolved.ty,
            });
        }

        let Some(location) = resolved.location else {
            log::trace!("Skipping inactive uniform '{}'", leaf);
            return Ok(());
        };
        let data = value
            .to_data()
            .ok_or_else(|| ResourceError::InvalidData(format!("uniform '{}' has no encodable value", leaf)))?;
        self.state.api_mut().set_uniform(location, data);
        Ok(())
    }

    /// Set a uniform if the bound shader declares it; returns whether it did
    pub fn set_uniform_if_present(
        &mut self,
        shader: &Shader,
        name: &str,
        value: &UniformValue,
    ) -> ResourceResult<bool> {
        let declared = value
            .try_for_each_leaf(name, |leaf, _| if shader.declares(leaf) { Ok(()) } else { Err(()) })
            .is_ok();
        if !declared {
            return Ok(false);
        }
        self.set_uniform(shader, name, value)?;
        Ok(true)
    }

    /// Name of the shader most recently bound through this binder
    pub fn active_shader(&self) -> Option<&str> {
        self.active_shader.as_deref()
    }

    /// Delete a shader's program object
    pub fn release_shader(&mut self, shader: &Shader) {
        let program = shader.program();
        if program.is_valid() {
            self.state.api_mut().delete_program(program);
            self.state.forget_handle(program);
            shader.reset_program();
        }
    }

    // Render targets

    /// Direct rendering into the default surface or a framebuffer
    pub fn bind_as_render_target(&mut self, target: &RenderTarget) -> ResourceResult<()> {
        let (width, height) = target.size();
        match target {
            RenderTarget::Default { .. } => {
                if self.state.bound_framebuffer() != Handle::NONE {
                    self.state.api_mut().bind_framebuffer(Handle::NONE);
                    self.state.set_bound_framebuffer(Handle::NONE)?;
                }
                if !self.state.color_write() {
                    self.state.set_color_write(true)?;
                }
            }
            RenderTarget::FrameBuffer(framebuffer) => {
                if !framebuffer.handle().is_valid() {
                    self.create_framebuffer(framebuffer)?;
                }
                let handle = framebuffer.handle();
                if self.state.bound_framebuffer() != handle {
                    self.state.api_mut().bind_framebuffer(handle);
                    self.state.set_bound_framebuffer(handle)?;
                    self.check_framebuffer();
                }
                let writes_color = !framebuffer.color_attachments().is_empty();
                if self.state.color_write() != writes_color {
                    self.state.set_color_write(writes_color)?;
                }
            }
        }

        let viewport = Viewport::full(width, height);
        if self.state.viewport() != viewport {
            self.state.set_viewport(viewport)?;
        }
        Ok(())
    }

    fn create_framebuffer(&mut self, framebuffer: &FrameBuffer) -> ResourceResult<()> {
        for texture in framebuffer.color_attachments() {
            if !texture.is_uploaded() {
                self.upload_texture(texture, 0)?;
            }
        }
        if let Some(depth) = framebuffer.depth_attachment() {
            if !depth.is_uploaded() {
                self.upload_texture(depth, 0)?;
            }
        }

        let handle = Self::checked(self.state.api_mut().gen_framebuffer(), "framebuffer")?;
        self.state.api_mut().bind_framebuffer(handle);
        self.state.set_bound_framebuffer(handle)?;

        let color_count = u32::try_from(framebuffer.color_attachments().len())
            .map_err(|_| ResourceError::InvalidData("too many color attachments".to_string()))?;
        let api = self.state.api_mut();
        for (index, texture) in (0..color_count).zip(framebuffer.color_attachments()) {
            api.framebuffer_texture(Attachment::Color(index), texture.handle());
        }
        if let Some(depth) = framebuffer.depth_attachment() {
            api.framebuffer_texture(Attachment::Depth, depth.handle());
        }
        api.draw_buffers(color_count);
        framebuffer.set_handle(handle);

        log::debug!(
            "Created {}x{} framebuffer {:?} with {} color attachment(s)",
            framebuffer.width(),
            framebuffer.height(),
            handle,
            framebuffer.color_attachments().len()
        );
        self.check_framebuffer();
        Ok(())
    }

    fn check_framebuffer(&mut self) -> FramebufferStatus {
        let status = self.state.api_mut().check_framebuffer_status();
        match status {
            FramebufferStatus::Complete => {}
            FramebufferStatus::IncompleteAttachment => {
                log::error!("Framebuffer incomplete: an attachment is not renderable")
            }
            FramebufferStatus::MissingAttachment => {
                log::error!("Framebuffer incomplete: no image is attached")
            }
            FramebufferStatus::IncompleteDrawBuffer => {
                log::error!("Framebuffer incomplete: a draw buffer has no attachment")
            }
            FramebufferStatus::IncompleteReadBuffer => {
                log::error!("Framebuffer incomplete: the read buffer has no attachment")
            }
            FramebufferStatus::IncompleteMultisample => {
                log::error!("Framebuffer incomplete: attachments disagree on sample count")
            }
            FramebufferStatus::Unsupported => {
                log::error!("Framebuffer incomplete: attachment formats are unsupported")
            }
        }
        status
    }

    /// Delete a framebuffer's API object; attachments are left alone
    pub fn release_framebuffer(&mut self, framebuffer: &FrameBuffer) {
        let handle = framebuffer.handle();
        if handle.is_valid() {
            self.state.api_mut().delete_framebuffer(handle);
            self.state.forget_handle(handle);
            framebuffer.set_handle(Handle::INVALID);
        }
    }

    /// Delete a framebuffer together with its attachment textures
    pub fn release_framebuffer_with_attachments(&mut self, framebuffer: &FrameBuffer) {
        self.release_framebuffer(framebuffer);
        for texture in framebuffer.color_attachments() {
            self.release_texture(texture);
        }
        if let Some(depth) = framebuffer.depth_attachment() {
            self.release_texture(depth);
        }
        log::debug!(
            "Released {}x{} framebuffer and its attachments",
            framebuffer.width(),
            framebuffer.height()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use crate::config::StateConfig;
    use crate::graphics::api::{Capability, DrawMode, ShaderStage, TextureFormat};
    use crate::graphics::headless::{ApiCall, CallLog, HeadlessApi};
    use crate::foundation::math::Vec3;
    use crate::resources::{MeshData, StructDef, UniformType};

    fn binder_with(api: HeadlessApi, strict: bool) -> (DataBinder, CallLog) {
        let log = api.call_log();
        let state = GraphicsState::new(Box::new(api), &StateConfig { strict });
        (DataBinder::new(state), log)
    }

    fn binder() -> (DataBinder, CallLog) {
        binder_with(HeadlessApi::new(), false)
    }

    fn is_vertex_array_bind(call: &ApiCall) -> bool {
        matches!(call, ApiCall::BindVertexArray(_))
    }

    #[test]
    fn test_binding_same_mesh_twice_binds_once() {
        let (mut binder, log) = binder();
        let mesh = Mesh::new(MeshData::cube());

        binder.bind_mesh(Some(&mesh)).unwrap();
        binder.bind_mesh(Some(&mesh)).unwrap();

        assert_eq!(log.count(is_vertex_array_bind), 1);
        assert_eq!(log.count(|c| matches!(c, ApiCall::GenVertexArray(_))), 1);
    }

    #[test]
    fn test_unbinding_mesh() {
        let (mut binder, log) = binder();
        let mesh = Mesh::new(MeshData::quad());
        binder.bind_mesh(Some(&mesh)).unwrap();
        binder.bind_mesh(None).unwrap();
        binder.bind_mesh(None).unwrap();

        assert!(log.contains(&ApiCall::BindVertexArray(Handle::NONE)));
        assert_eq!(binder.state().bound_mesh(), Handle::NONE);
        assert_eq!(log.count(is_vertex_array_bind), 2);
    }

    #[test]
    fn test_draw_issues_indexed_draw() {
        let (mut binder, log) = binder();
        let mesh = Mesh::new(MeshData::cube());
        binder.draw(&mesh).unwrap();
        binder.draw(&mesh).unwrap();

        let draw = ApiCall::DrawElements { mode: DrawMode::Triangles, count: 36 };
        assert_eq!(log.count_of(&draw), 2);
        assert_eq!(log.count(is_vertex_array_bind), 1);
    }

    #[test]
    fn test_resupplied_geometry_regenerates_buffers() {
        let (mut binder, log) = binder();
        let mesh = Mesh::new(MeshData::quad());
        binder.bind_mesh(Some(&mesh)).unwrap();
        let first = mesh.data().buffers().unwrap();

        mesh.data().set_geometry(vec![Vertex::default(); 3], vec![0, 1, 2]);
        binder.draw(&mesh).unwrap();

        let second = mesh.data().buffers().unwrap();
        assert_ne!(first.vertex_array, second.vertex_array);
        assert!(log.contains(&ApiCall::DeleteVertexArray(first.vertex_array)));
        assert!(log.contains(&ApiCall::DrawElements { mode: DrawMode::Triangles, count: 3 }));
    }

    #[test]
    fn test_exhausted_context_is_a_hard_error() {
        let (mut binder, _log) = binder_with(HeadlessApi::exhausted(), false);
        let mesh = Mesh::new(MeshData::quad());
        assert!(matches!(
            binder.bind_mesh(Some(&mesh)),
            Err(ResourceError::InvalidHandle(_))
        ));
        assert!(matches!(
            binder.bind_texture(&Texture::solid([255; 4]), 0),
            Err(ResourceError::InvalidHandle("texture"))
        ));
    }

    #[test]
    fn test_texture_upload_and_slot_tracking() {
        let (mut binder, log) = binder();
        let a = Texture::solid([255, 0, 0, 255]);
        let b = Texture::solid([0, 255, 0, 255]);

        binder.bind_texture(&a, 0).unwrap();
        binder.bind_texture(&a, 0).unwrap();
        binder.bind_texture(&b, 1).unwrap();
        binder.bind_texture(&a, 1).unwrap();

        assert_eq!(log.count(|c| matches!(c, ApiCall::TexImage2D { .. })), 2);
        assert_eq!(log.count_of(&ApiCall::BindTexture(a.handle())), 2);
        assert_eq!(binder.state().bound_texture(1), a.handle());

        binder.unbind_texture(1).unwrap();
        assert_eq!(binder.state().bound_texture(1), Handle::NONE);
    }

    fn lit_shader(fragment: &str) -> Shader {
        Shader::new("lit")
            .with_stage(ShaderStage::Vertex, "uniform mat4 mvp;")
            .with_stage(ShaderStage::Fragment, fragment)
            .with_uniform("mvp", UniformType::Mat4)
            .with_uniform("ambient", UniformType::Vec3)
            .with_uniform("unused", UniformType::Float)
    }

    #[test]
    fn test_shader_is_built_once_and_used_conditionally() {
        let (mut binder, log) = binder();
        let shader = lit_shader("uniform vec3 ambient;");

        binder.bind_shader(&shader).unwrap();
        binder.bind_shader(&shader).unwrap();

        assert_eq!(log.count(|c| matches!(c, ApiCall::CreateProgram(_))), 1);
        assert_eq!(log.count(|c| matches!(c, ApiCall::UseProgram(_))), 1);
        assert_eq!(log.count(|c| matches!(c, ApiCall::UniformLocation { .. })), 3);
        assert!(!shader.build_failed());
        assert_eq!(binder.active_shader(), Some("lit"));
    }

    #[test]
    fn test_broken_shader_is_still_bound() {
        let (mut binder, log) = binder();
        let shader = lit_shader("");

        binder.bind_shader(&shader).unwrap();

        assert!(shader.build_failed());
        assert!(log.contains(&ApiCall::UseProgram(shader.program())));
    }

    #[test]
    fn test_uniform_setting() {
        let (mut binder, log) = binder();
        let shader = lit_shader("uniform vec3 ambient;");
        binder.bind_shader(&shader).unwrap();
        log.clear();

        let ambient = UniformValue::Vec3(Vec3::new(0.1, 0.1, 0.1));
        binder.set_uniform(&shader, "ambient", &ambient).unwrap();
        // declared but eliminated by the driver: silently skipped
        binder.set_uniform(&shader, "unused", &UniformValue::Float(1.0)).unwrap();
        assert_eq!(log.count(|c| matches!(c, ApiCall::SetUniform { .. })), 1);

        assert!(matches!(
            binder.set_uniform(&shader, "fog", &UniformValue::Float(1.0)),
            Err(ResourceError::UndeclaredUniform { .. })
        ));
        assert!(!binder
            .set_uniform_if_present(&shader, "fog", &UniformValue::Float(1.0))
            .unwrap());
    }

    #[test]
    fn test_uniform_type_mismatch_is_rejected() {
        let (mut binder, log) = binder();
        let shader = lit_shader("uniform vec3 ambient;");
        binder.bind_shader(&shader).unwrap();
        log.clear();

        let result = binder.set_uniform(&shader, "mvp", &UniformValue::Float(1.0));
        assert!(matches!(
            result,
            Err(ResourceError::UniformTypeMismatch { ref name, expected: UniformType::Mat4, .. })
                if name == "mvp"
        ));
        // eliminated uniforms are still type checked
        assert!(matches!(
            binder.set_uniform(&shader, "unused", &UniformValue::Vec3(Vec3::zeros())),
            Err(ResourceError::UniformTypeMismatch { .. })
        ));
        assert!(log.is_empty());
    }

    #[test]
    fn test_struct_uniform_fields_are_type_checked() {
        let (mut binder, log) = binder();
        let shader = Shader::new("sun")
            .with_stage(ShaderStage::Fragment, "uniform Sun sun;")
            .with_struct(
                StructDef::new("Sun")
                    .field("color", UniformType::Vec3)
                    .field("intensity", UniformType::Float),
            )
            .with_uniform("sun", UniformType::Struct("Sun".to_string()));
        binder.bind_shader(&shader).unwrap();
        log.clear();

        let sun = UniformValue::structure([
            ("color", UniformValue::Vec3(Vec3::new(1.0, 1.0, 0.9))),
            ("intensity", UniformValue::Float(0.7)),
        ]);
        binder.set_uniform(&shader, "sun", &sun).unwrap();
        assert_eq!(log.count(|c| matches!(c, ApiCall::SetUniform { .. })), 2);

        let wrong = UniformValue::structure([("intensity", UniformValue::Int(1))]);
        assert!(matches!(
            binder.set_uniform(&shader, "sun", &wrong),
            Err(ResourceError::UniformTypeMismatch { ref name, .. }) if name == "sun.intensity"
        ));
    }

    #[test]
    fn test_uniform_on_unbound_shader_is_rejected() {
        let (mut binder, log) = binder();
        let first = lit_shader("uniform vec3 ambient;");
        let second = lit_shader("uniform vec3 ambient;");
        let ambient = UniformValue::Vec3(Vec3::new(0.2, 0.2, 0.2));

        assert!(matches!(
            binder.set_uniform(&first, "ambient", &ambient),
            Err(ResourceError::NoShaderBound { .. })
        ));

        binder.bind_shader(&first).unwrap();
        binder.bind_shader(&second).unwrap();
        log.clear();
        assert!(matches!(
            binder.set_uniform(&first, "ambient", &ambient),
            Err(ResourceError::NoShaderBound { ref shader, .. }) if shader == "lit"
        ));
        binder.set_uniform(&second, "ambient", &ambient).unwrap();
        assert_eq!(log.count(|c| matches!(c, ApiCall::SetUniform { .. })), 1);
    }

    #[test]
    fn test_partial_buffer_allocation_is_released() {
        let (mut binder, log) = binder_with(HeadlessApi::with_handle_budget(2), false);
        let mesh = Mesh::new(MeshData::quad());

        assert!(matches!(
            binder.bind_mesh(Some(&mesh)),
            Err(ResourceError::InvalidHandle("index buffer"))
        ));
        assert!(log.contains(&ApiCall::DeleteVertexArray(Handle(1))));
        assert!(log.contains(&ApiCall::DeleteBuffer(Handle(2))));
        assert!(mesh.data().buffers().is_none());
        assert_eq!(binder.state().bound_mesh(), Handle::NONE);
    }

    #[test]
    fn test_depth_only_target_disables_color_writes() {
        let (mut binder, log) = binder_with(HeadlessApi::new(), true);
        let shadow = RenderTarget::FrameBuffer(Rc::new(FrameBuffer::depth_only(64)));
        let screen = RenderTarget::Default { width: 320, height: 240 };

        binder.bind_as_render_target(&shadow).unwrap();
        assert!(!binder.state().color_write());
        assert!(log.contains(&ApiCall::DrawBuffers(0)));
        assert!(log.contains(&ApiCall::CheckFramebufferStatus(FramebufferStatus::Complete)));

        binder.bind_as_render_target(&screen).unwrap();
        assert!(binder.state().color_write());
        assert_eq!(binder.state().bound_framebuffer(), Handle::NONE);
        assert_eq!(binder.state().viewport(), Viewport::full(320, 240));

        // a second bind of the same target is free, even in strict mode
        log.clear();
        binder.bind_as_render_target(&screen).unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn test_incomplete_framebuffer_is_logged_not_raised() {
        let (mut binder, log) = binder();
        let empty = RenderTarget::FrameBuffer(Rc::new(FrameBuffer::new(16, 16)));
        assert!(binder.bind_as_render_target(&empty).is_ok());
        assert!(log.contains(&ApiCall::CheckFramebufferStatus(
            FramebufferStatus::MissingAttachment
        )));
    }

    #[test]
    fn test_color_framebuffer_keeps_color_writes() {
        let (mut binder, _log) = binder();
        let color = Rc::new(Texture::empty(32, 32, TextureFormat::Rgba8));
        let target = RenderTarget::FrameBuffer(Rc::new(FrameBuffer::new(32, 32).with_color(color)));
        binder.bind_as_render_target(&target).unwrap();
        assert!(binder.state().color_write());
        assert!(!binder.state().is_enabled(Capability::Blend));
    }

    #[test]
    fn test_release_resets_handles() {
        let (mut binder, log) = binder();
        let mesh = Mesh::new(MeshData::quad());
        let shader = lit_shader("uniform vec3 ambient;");
        binder.bind_mesh(Some(&mesh)).unwrap();
        binder.bind_shader(&shader).unwrap();

        binder.release_mesh(&mesh);
        binder.release_shader(&shader);

        assert!(mesh.data().buffers().is_none());
        assert_eq!(shader.program(), Handle::INVALID);
        assert_eq!(binder.state().bound_mesh(), Handle::NONE);
        assert_eq!(log.count(|c| matches!(c, ApiCall::DeleteBuffer(_))), 2);
    }

    #[test]
    fn test_release_framebuffer_unbinds_it() {
        let (mut binder, log) = binder();
        let shadow = Rc::new(FrameBuffer::depth_only(32));
        binder.bind_as_render_target(&RenderTarget::FrameBuffer(Rc::clone(&shadow))).unwrap();
        let handle = shadow.handle();

        binder.release_framebuffer(&shadow);
        binder.release_framebuffer(&shadow);

        assert_eq!(log.count_of(&ApiCall::DeleteFramebuffer(handle)), 1);
        assert_eq!(shadow.handle(), Handle::INVALID);
        assert_eq!(binder.state().bound_framebuffer(), Handle::NONE);
    }
}
