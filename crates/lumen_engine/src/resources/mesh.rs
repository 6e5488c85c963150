//! Mesh geometry and its GPU buffers
//!
//! [`MeshData`] holds interleaved vertices, `u32` indices and a draw mode, and
//! owns at most one [`BufferTriple`] (vertex array, vertex buffer, index
//! buffer). [`Mesh`] is the cheap, cloneable handle entities hold.

use std::cell::{Cell, Ref, RefCell};
use std::mem::size_of;
use std::rc::Rc;

use bytemuck::{Pod, Zeroable};

use crate::assets::{IndexedModel, MeshIndexer, ObjIndex, ObjModel};
use crate::foundation::math::{Vec2, Vec3};
use crate::graphics::api::{DrawMode, Handle, VertexAttribute, VertexLayout};
use crate::resources::{ResourceError, ResourceResult};

/// Interleaved vertex uploaded to the vertex buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    /// Position in model space
    pub position: [f32; 3],

    /// Texture coordinates
    pub tex_coord: [f32; 2],

    /// Unit normal
    pub normal: [f32; 3],

    /// Unit tangent for normal mapping
    pub tangent: [f32; 3],
}

impl Vertex {
    /// Attribute layout: position (0), tex coord (1), normal (2), tangent (3)
    pub const LAYOUT: VertexLayout = VertexLayout {
        stride: size_of::<Vertex>(),
        attributes: &[
            VertexAttribute { location: 0, components: 3, offset: 0 },
            VertexAttribute { location: 1, components: 2, offset: 12 },
            VertexAttribute { location: 2, components: 3, offset: 20 },
            VertexAttribute { location: 3, components: 3, offset: 32 },
        ],
    };

    /// Create a vertex without a tangent
    pub fn new(position: Vec3, tex_coord: Vec2, normal: Vec3) -> Self {
        Self {
            position: position.into(),
            tex_coord: tex_coord.into(),
            normal: normal.into(),
            tangent: [0.0; 3],
        }
    }
}

/// Names of the three API objects backing one mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferTriple {
    /// Vertex array object
    pub vertex_array: Handle,
    /// Vertex buffer
    pub vertex_buffer: Handle,
    /// Index buffer
    pub index_buffer: Handle,
}

#[derive(Debug, Default)]
struct Geometry {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

/// Client-side geometry plus the buffers it was uploaded to
#[derive(Debug)]
pub struct MeshData {
    geometry: RefCell<Geometry>,
    draw_mode: Cell<DrawMode>,
    revision: Cell<u64>,
    uploaded_revision: Cell<Option<u64>>,
    buffers: Cell<Option<BufferTriple>>,
}

impl MeshData {
    /// Create mesh data from vertices and indices
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>, draw_mode: DrawMode) -> Self {
        Self {
            geometry: RefCell::new(Geometry { vertices, indices }),
            draw_mode: Cell::new(draw_mode),
            revision: Cell::new(0),
            uploaded_revision: Cell::new(None),
            buffers: Cell::new(None),
        }
    }

    /// Create triangle mesh data from an indexed model
    pub fn from_indexed(model: &IndexedModel) -> Self {
        Self::new(model.to_vertices(), model.indices.clone(), DrawMode::Triangles)
    }

    /// Unit cube centered on the origin with per-face normals and UVs
    pub fn cube() -> Self {
        let positions = [
            [-0.5, -0.5, -0.5],
            [0.5, -0.5, -0.5],
            [0.5, 0.5, -0.5],
            [-0.5, 0.5, -0.5],
            [-0.5, -0.5, 0.5],
            [0.5, -0.5, 0.5],
            [0.5, 0.5, 0.5],
            [-0.5, 0.5, 0.5],
        ];
        let normals = [
            [0.0, 0.0, -1.0],
            [0.0, 0.0, 1.0],
            [-1.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.0, 1.0, 0.0],
        ];
        // Each face lists its corners counter-clockwise seen from outside
        let faces: [([usize; 4], usize); 6] = [
            ([1, 0, 3, 2], 0),
            ([4, 5, 6, 7], 1),
            ([0, 4, 7, 3], 2),
            ([5, 1, 2, 6], 3),
            ([0, 1, 5, 4], 4),
            ([7, 6, 2, 3], 5),
        ];

        let mut model = ObjModel {
            positions: positions.iter().map(|p| Vec3::from(*p)).collect(),
            tex_coords: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
            normals: normals.iter().map(|n| Vec3::from(*n)).collect(),
            ..ObjModel::default()
        };
        for (corners, normal) in faces {
            let corner = |i: usize| ObjIndex {
                position: corners[i],
                tex_coord: Some(i),
                normal: Some(normal),
            };
            model.faces.push([corner(0), corner(1), corner(2)]);
            model.faces.push([corner(0), corner(2), corner(3)]);
        }

        Self::from_builtin(&model)
    }

    fn from_builtin(model: &ObjModel) -> Self {
        match MeshIndexer::index(model) {
            Ok(indexed) => Self::from_indexed(&indexed),
            Err(err) => {
                log::error!("Built-in mesh failed to index: {}", err);
                Self::new(Vec::new(), Vec::new(), DrawMode::Triangles)
            }
        }
    }

    /// Unit quad in the XY plane facing +Z
    pub fn quad() -> Self {
        let mut model = ObjModel {
            positions: vec![
                Vec3::new(-0.5, -0.5, 0.0),
                Vec3::new(0.5, -0.5, 0.0),
                Vec3::new(0.5, 0.5, 0.0),
                Vec3::new(-0.5, 0.5, 0.0),
            ],
            tex_coords: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
            normals: vec![Vec3::z()],
            ..ObjModel::default()
        };
        let corner = |i: usize| ObjIndex {
            position: i,
            tex_coord: Some(i),
            normal: Some(0),
        };
        model.faces.push([corner(0), corner(1), corner(2)]);
        model.faces.push([corner(0), corner(2), corner(3)]);

        Self::from_builtin(&model)
    }

    /// Vertices
    pub fn vertices(&self) -> Ref<'_, [Vertex]> {
        Ref::map(self.geometry.borrow(), |g| g.vertices.as_slice())
    }

    /// Indices
    pub fn indices(&self) -> Ref<'_, [u32]> {
        Ref::map(self.geometry.borrow(), |g| g.indices.as_slice())
    }

    /// Number of indices drawn by one draw call
    pub fn index_count(&self) -> usize {
        self.geometry.borrow().indices.len()
    }

    /// Primitive topology
    pub fn draw_mode(&self) -> DrawMode {
        self.draw_mode.get()
    }

    /// Change the primitive topology; takes effect on the next draw
    pub fn set_draw_mode(&self, draw_mode: DrawMode) {
        self.draw_mode.set(draw_mode);
    }

    /// Replace the geometry
    ///
    /// Meshes that were already uploaded get a fresh buffer triple on their
    /// next bind.
    pub fn set_geometry(&self, vertices: Vec<Vertex>, indices: Vec<u32>) {
        if self.buffers.get().is_some() {
            log::warn!(
                "Re-supplying geometry to an uploaded mesh ({} vertices); its buffers will be regenerated",
                vertices.len()
            );
        }
        *self.geometry.borrow_mut() = Geometry { vertices, indices };
        self.revision.set(self.revision.get() + 1);
    }

    /// Whether the current geometry still has to be uploaded
    pub fn needs_upload(&self) -> bool {
        self.buffers.get().is_none() || self.uploaded_revision.get() != Some(self.revision.get())
    }

    /// Buffers the geometry lives in, if uploaded
    pub fn buffers(&self) -> Option<BufferTriple> {
        self.buffers.get()
    }

    /// Attach a newly created buffer triple
    pub fn attach_buffers(&self, buffers: BufferTriple) -> ResourceResult<()> {
        if let Some(existing) = self.buffers.get() {
            return Err(ResourceError::BuffersAlreadyAttached(existing.vertex_array.raw()));
        }
        self.buffers.set(Some(buffers));
        Ok(())
    }

    /// Detach the buffer triple, returning it for deletion
    pub fn detach_buffers(&self) -> Option<BufferTriple> {
        self.uploaded_revision.set(None);
        self.buffers.take()
    }

    pub(crate) fn mark_uploaded(&self) {
        self.uploaded_revision.set(Some(self.revision.get()));
    }
}

/// Shared handle to mesh data
#[derive(Debug, Clone)]
pub struct Mesh {
    data: Rc<MeshData>,
}

impl Mesh {
    /// Wrap mesh data in a shareable handle
    pub fn new(data: MeshData) -> Self {
        Self { data: Rc::new(data) }
    }

    /// Underlying mesh data
    pub fn data(&self) -> &MeshData {
        &self.data
    }

    /// Whether two handles refer to the same mesh data
    pub fn ptr_eq(&self, other: &Mesh) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl From<MeshData> for Mesh {
    fn from(data: MeshData) -> Self {
        Self::new(data)
    }
}
