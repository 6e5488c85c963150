//! Headless graphics backend
//!
//! [`HeadlessApi`] implements [`GraphicsApi`] without a GPU. Every call is
//! appended to a shared [`CallLog`], so tests and tools can count exactly which
//! driver calls a frame produced. The backend also simulates the parts of
//! driver behavior the engine reacts to:
//!
//! - shader stages with empty source fail to compile
//! - uniforms not referenced by any stage source have no location
//! - framebuffers without attachments, or with more draw buffers than color
//!   attachments, are incomplete

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::foundation::math::Color;
use crate::graphics::api::{
    Attachment, BlendFunction, Capability, ClearFlags, CullFace, DepthFunction, DrawMode,
    FramebufferStatus, FrontFace, GraphicsApi, Handle, PolygonMode, ShaderStage, TextureFilter,
    TextureFormat, TextureUpload, UniformData, VertexLayout, Viewport,
};

/// One recorded driver call
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum ApiCall {
    Enable(Capability),
    Disable(Capability),
    ClearColor(Color),
    Clear(ClearFlags),
    DepthFunc(DepthFunction),
    DepthMask(bool),
    ColorMask(bool),
    BlendFunc(BlendFunction),
    FrontFace(FrontFace),
    CullFace(CullFace),
    PolygonMode(PolygonMode),
    Viewport(Viewport),
    GenTexture(Handle),
    ActiveTexture(u32),
    BindTexture(Handle),
    TexImage2D {
        width: u32,
        height: u32,
        format: TextureFormat,
        min_filter: TextureFilter,
        mag_filter: TextureFilter,
        bytes: usize,
    },
    DeleteTexture(Handle),
    GenVertexArray(Handle),
    GenBuffer(Handle),
    BindVertexArray(Handle),
    VertexBufferData { buffer: Handle, bytes: usize, stride: usize },
    IndexBufferData { buffer: Handle, count: usize },
    DeleteVertexArray(Handle),
    DeleteBuffer(Handle),
    DrawElements { mode: DrawMode, count: u32 },
    CreateProgram(Handle),
    CompileShader { program: Handle, stage: ShaderStage },
    LinkProgram(Handle),
    ValidateProgram(Handle),
    UseProgram(Handle),
    UniformLocation { program: Handle, name: String },
    SetUniform { location: i32, value: UniformData },
    DeleteProgram(Handle),
    GenFramebuffer(Handle),
    BindFramebuffer(Handle),
    FramebufferTexture { attachment: Attachment, texture: Handle },
    DrawBuffers(u32),
    CheckFramebufferStatus(FramebufferStatus),
    DeleteFramebuffer(Handle),
}

/// Shared, cloneable view of the calls recorded by a [`HeadlessApi`]
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Rc<RefCell<Vec<ApiCall>>>,
}

impl CallLog {
    fn push(&self, call: ApiCall) {
        log::trace!("headless: {:?}", call);
        self.calls.borrow_mut().push(call);
    }

    /// Snapshot of every call recorded so far
    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.borrow().clone()
    }

    /// Number of recorded calls
    pub fn len(&self) -> usize {
        self.calls.borrow().len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.calls.borrow().is_empty()
    }

    /// Number of recorded calls matching a predicate
    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&ApiCall) -> bool,
    {
        self.calls.borrow().iter().filter(|c| predicate(c)).count()
    }

    /// Number of recorded calls equal to `call`
    pub fn count_of(&self, call: &ApiCall) -> usize {
        self.count(|c| c == call)
    }

    /// Whether at least one recorded call equals `call`
    pub fn contains(&self, call: &ApiCall) -> bool {
        self.calls.borrow().iter().any(|c| c == call)
    }

    /// Index of the first recorded call equal to `call`
    pub fn position(&self, call: &ApiCall) -> Option<usize> {
        self.calls.borrow().iter().position(|c| c == call)
    }

    /// Index of the first recorded call matching a predicate
    pub fn position_where<F>(&self, predicate: F) -> Option<usize>
    where
        F: Fn(&ApiCall) -> bool,
    {
        self.calls.borrow().iter().position(|c| predicate(c))
    }

    /// Forget every recorded call
    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

#[derive(Debug, Default)]
struct ProgramRecord {
    sources: Vec<String>,
    compile_failed: bool,
    linked: bool,
    locations: HashMap<String, i32>,
}

#[derive(Debug, Default)]
struct FramebufferRecord {
    color_attachments: u32,
    depth_attachment: bool,
    draw_buffers: u32,
}

/// Graphics context that records calls instead of rendering
#[derive(Debug)]
pub struct HeadlessApi {
    log: CallLog,
    next_handle: u32,
    next_location: i32,
    handle_budget: Option<u32>,
    programs: HashMap<Handle, ProgramRecord>,
    framebuffers: HashMap<Handle, FramebufferRecord>,
    bound_framebuffer: Handle,
}

impl Default for HeadlessApi {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessApi {
    /// Create a headless context with a fresh call log
    pub fn new() -> Self {
        Self {
            log: CallLog::default(),
            next_handle: 1,
            next_location: 0,
            handle_budget: None,
            programs: HashMap::new(),
            framebuffers: HashMap::new(),
            bound_framebuffer: Handle::NONE,
        }
    }

    /// Create a context whose object creation always fails
    pub fn exhausted() -> Self {
        Self::with_handle_budget(0)
    }

    /// Create a context that runs out of object names after `budget` allocations
    pub fn with_handle_budget(budget: u32) -> Self {
        Self {
            handle_budget: Some(budget),
            ..Self::new()
        }
    }

    /// Shared handle to the call log; stays valid after the API is boxed
    pub fn call_log(&self) -> CallLog {
        self.log.clone()
    }

    fn allocate(&mut self) -> Handle {
        match &mut self.handle_budget {
            Some(0) => return Handle::INVALID,
            Some(remaining) => *remaining -= 1,
            None => {}
        }
        let handle = Handle(self.next_handle);
        self.next_handle += 1;
        handle
    }
}

/// Name of the variable a uniform path starts with: `light.base.color` → `light`
fn root_identifier(name: &str) -> &str {
    name.split(|c: char| c == '.' || c == '[')
        .next()
        .unwrap_or(name)
}

impl GraphicsApi for HeadlessApi {
    fn enable(&mut self, capability: Capability) {
        self.log.push(ApiCall::Enable(capability));
    }

    fn disable(&mut self, capability: Capability) {
        self.log.push(ApiCall::Disable(capability));
    }

    fn clear_color(&mut self, color: Color) {
        self.log.push(ApiCall::ClearColor(color));
    }

    fn clear(&mut self, flags: ClearFlags) {
        self.log.push(ApiCall::Clear(flags));
    }

    fn depth_func(&mut self, function: DepthFunction) {
        self.log.push(ApiCall::DepthFunc(function));
    }

    fn depth_mask(&mut self, write: bool) {
        self.log.push(ApiCall::DepthMask(write));
    }

    fn color_mask(&mut self, write: bool) {
        self.log.push(ApiCall::ColorMask(write));
    }

    fn blend_func(&mut self, function: BlendFunction) {
        self.log.push(ApiCall::BlendFunc(function));
    }

    fn front_face(&mut self, winding: FrontFace) {
        self.log.push(ApiCall::FrontFace(winding));
    }

    fn cull_face(&mut self, face: CullFace) {
        self.log.push(ApiCall::CullFace(face));
    }

    fn polygon_mode(&mut self, mode: PolygonMode) {
        self.log.push(ApiCall::PolygonMode(mode));
    }

    fn viewport(&mut self, viewport: Viewport) {
        self.log.push(ApiCall::Viewport(viewport));
    }

    fn gen_texture(&mut self) -> Handle {
        let handle = self.allocate();
        self.log.push(ApiCall::GenTexture(handle));
        handle
    }

    fn active_texture(&mut self, slot: u32) {
        self.log.push(ApiCall::ActiveTexture(slot));
    }

    fn bind_texture(&mut self, texture: Handle) {
        self.log.push(ApiCall::BindTexture(texture));
    }

    fn tex_image_2d(&mut self, upload: &TextureUpload<'_>) {
        self.log.push(ApiCall::TexImage2D {
            width: upload.width,
            height: upload.height,
            format: upload.format,
            min_filter: upload.min_filter,
            mag_filter: upload.mag_filter,
            bytes: upload.pixels.map_or(0, <[u8]>::len),
        });
    }

    fn delete_texture(&mut self, texture: Handle) {
        self.log.push(ApiCall::DeleteTexture(texture));
    }

    fn gen_vertex_array(&mut self) -> Handle {
        let handle = self.allocate();
        self.log.push(ApiCall::GenVertexArray(handle));
        handle
    }

    fn gen_buffer(&mut self) -> Handle {
        let handle = self.allocate();
        self.log.push(ApiCall::GenBuffer(handle));
        handle
    }

    fn bind_vertex_array(&mut self, vertex_array: Handle) {
        self.log.push(ApiCall::BindVertexArray(vertex_array));
    }

    fn vertex_buffer_data(&mut self, buffer: Handle, data: &[u8], layout: &VertexLayout) {
        self.log.push(ApiCall::VertexBufferData {
            buffer,
            bytes: data.len(),
            stride: layout.stride,
        });
    }

    fn index_buffer_data(&mut self, buffer: Handle, indices: &[u32]) {
        self.log.push(ApiCall::IndexBufferData {
            buffer,
            count: indices.len(),
        });
    }

    fn delete_vertex_array(&mut self, vertex_array: Handle) {
        self.log.push(ApiCall::DeleteVertexArray(vertex_array));
    }

    fn delete_buffer(&mut self, buffer: Handle) {
        self.log.push(ApiCall::DeleteBuffer(buffer));
    }

    fn draw_elements(&mut self, mode: DrawMode, count: u32) {
        self.log.push(ApiCall::DrawElements { mode, count });
    }

    fn create_program(&mut self) -> Handle {
        let handle = self.allocate();
        if handle.is_valid() {
            self.programs.insert(handle, ProgramRecord::default());
        }
        self.log.push(ApiCall::CreateProgram(handle));
        handle
    }

    fn compile_shader(&mut self, program: Handle, stage: ShaderStage, source: &str) -> Result<(), String> {
        self.log.push(ApiCall::CompileShader { program, stage });
        let record = self
            .programs
            .get_mut(&program)
            .ok_or_else(|| format!("{:?} is not a program object", program))?;

        if source.trim().is_empty() {
            record.compile_failed = true;
            return Err(format!("{:?} shader: empty source", stage));
        }
        record.sources.push(source.to_string());
        Ok(())
    }

    fn link_program(&mut self, program: Handle) -> Result<(), String> {
        self.log.push(ApiCall::LinkProgram(program));
        let record = self
            .programs
            .get_mut(&program)
            .ok_or_else(|| format!("{:?} is not a program object", program))?;

        if record.compile_failed {
            return Err("one or more attached shaders failed to compile".to_string());
        }
        if record.sources.is_empty() {
            return Err("no shaders attached".to_string());
        }
        record.linked = true;
        Ok(())
    }

    fn validate_program(&mut self, program: Handle) -> Result<(), String> {
        self.log.push(ApiCall::ValidateProgram(program));
        match self.programs.get(&program) {
            Some(record) if record.linked => Ok(()),
            Some(_) => Err("program is not linked".to_string()),
            None => Err(format!("{:?} is not a program object", program)),
        }
    }

    fn use_program(&mut self, program: Handle) {
        self.log.push(ApiCall::UseProgram(program));
    }

    fn uniform_location(&mut self, program: Handle, name: &str) -> Option<i32> {
        self.log.push(ApiCall::UniformLocation {
            program,
            name: name.to_string(),
        });

        let record = self.programs.get_mut(&program).filter(|r| r.linked)?;
        if let Some(&location) = record.locations.get(name) {
            return Some(location);
        }

        let root = root_identifier(name);
        if !record.sources.iter().any(|source| source.contains(root)) {
            return None;
        }

        let location = self.next_location;
        self.next_location += 1;
        record.locations.insert(name.to_string(), location);
        Some(location)
    }

    fn set_uniform(&mut self, location: i32, value: UniformData) {
        self.log.push(ApiCall::SetUniform { location, value });
    }

    fn delete_program(&mut self, program: Handle) {
        self.programs.remove(&program);
        self.log.push(ApiCall::DeleteProgram(program));
    }

    fn gen_framebuffer(&mut self) -> Handle {
        let handle = self.allocate();
        if handle.is_valid() {
            self.framebuffers.insert(handle, FramebufferRecord::default());
        }
        self.log.push(ApiCall::GenFramebuffer(handle));
        handle
    }

    fn bind_framebuffer(&mut self, framebuffer: Handle) {
        self.bound_framebuffer = framebuffer;
        self.log.push(ApiCall::BindFramebuffer(framebuffer));
    }

    fn framebuffer_texture(&mut self, attachment: Attachment, texture: Handle) {
        if let Some(record) = self.framebuffers.get_mut(&self.bound_framebuffer) {
            match attachment {
                Attachment::Color(index) => {
                    record.color_attachments = record.color_attachments.max(index + 1);
                }
                Attachment::Depth => record.depth_attachment = true,
            }
        }
        self.log.push(ApiCall::FramebufferTexture { attachment, texture });
    }

    fn draw_buffers(&mut self, color_attachments: u32) {
        if let Some(record) = self.framebuffers.get_mut(&self.bound_framebuffer) {
            record.draw_buffers = color_attachments;
        }
        self.log.push(ApiCall::DrawBuffers(color_attachments));
    }

    fn check_framebuffer_status(&mut self) -> FramebufferStatus {
        let status = match self.framebuffers.get(&self.bound_framebuffer) {
            None => FramebufferStatus::Complete,
            Some(record) if record.color_attachments == 0 && !record.depth_attachment => {
                FramebufferStatus::MissingAttachment
            }
            Some(record) if record.draw_buffers > record.color_attachments => {
                FramebufferStatus::IncompleteDrawBuffer
            }
            Some(_) => FramebufferStatus::Complete,
        };
        self.log.push(ApiCall::CheckFramebufferStatus(status));
        status
    }

    fn delete_framebuffer(&mut self, framebuffer: Handle) {
        self.framebuffers.remove(&framebuffer);
        if self.bound_framebuffer == framebuffer {
            self.bound_framebuffer = Handle::NONE;
        }
        self.log.push(ApiCall::DeleteFramebuffer(framebuffer));
    }
}
