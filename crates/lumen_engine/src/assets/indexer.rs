//! Mesh indexer
//!
//! Converts a face-indexed [`ObjModel`] (separate position, UV and normal
//! indices per corner) into a vertex-indexed [`IndexedModel`] with one index
//! list shared by every attribute. Corners with the same (position, UV,
//! normal) triple collapse into one vertex. Missing normals are rebuilt by
//! averaging face normals over every corner sharing a position, and tangents
//! are derived from UV gradients.

use std::collections::HashMap;

use crate::assets::obj_loader::{ObjError, ObjIndex, ObjModel};
use crate::foundation::math::{Vec2, Vec3};
use crate::resources::Vertex;

/// Smallest UV-space determinant that still yields a usable tangent
const UV_EPSILON: f32 = 1e-8;

/// Vertex-indexed model ready for upload
#[derive(Debug, Clone, Default)]
pub struct IndexedModel {
    /// Positions
    pub positions: Vec<Vec3>,
    /// Texture coordinates
    pub tex_coords: Vec<Vec2>,
    /// Normals
    pub normals: Vec<Vec3>,
    /// Tangents
    pub tangents: Vec<Vec3>,
    /// Triangle list indices
    pub indices: Vec<u32>,
}

impl IndexedModel {
    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Whether all attribute lists line up and every index is in range
    pub fn is_valid(&self) -> bool {
        let n = self.positions.len();
        self.tex_coords.len() == n
            && self.normals.len() == n
            && self.tangents.len() == n
            && self.indices.len() % 3 == 0
            && self.indices.iter().all(|&i| (i as usize) < n)
    }

    /// Triangles whose three indices are all in range
    fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        let n = self.positions.len();
        self.indices
            .chunks_exact(3)
            .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
            .filter(move |t| t.iter().all(|&i| i < n))
    }

    /// Replace normals with the normalized sum of adjacent face normals
    pub fn calc_normals(&mut self) {
        self.normals = vec![Vec3::zeros(); self.positions.len()];
        let triangles: Vec<_> = self.triangles().collect();

        for [i0, i1, i2] in triangles {
            let p0 = self.positions[i0];
            let face_normal = (self.positions[i1] - p0).cross(&(self.positions[i2] - p0));
            // Degenerate faces contribute nothing
            if let Some(normal) = face_normal.try_normalize(f32::EPSILON) {
                self.normals[i0] += normal;
                self.normals[i1] += normal;
                self.normals[i2] += normal;
            }
        }

        for normal in &mut self.normals {
            *normal = normal.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros);
        }
    }

    /// Recompute tangents from texture coordinate gradients
    pub fn calc_tangents(&mut self) {
        let triangles: Vec<_> = self.triangles().collect();
        let uv = |i: usize| self.tex_coords.get(i).copied().unwrap_or_else(Vec2::zeros);

        let mut tangents = vec![Vec3::zeros(); self.positions.len()];
        for [i0, i1, i2] in triangles {
            let edge1 = self.positions[i1] - self.positions[i0];
            let edge2 = self.positions[i2] - self.positions[i0];
            let delta_uv1 = uv(i1) - uv(i0);
            let delta_uv2 = uv(i2) - uv(i0);

            let det = delta_uv1.x * delta_uv2.y - delta_uv2.x * delta_uv1.y;
            if det.abs() < UV_EPSILON {
                continue;
            }
            let tangent = (edge1 * delta_uv2.y - edge2 * delta_uv1.y) / det;

            tangents[i0] += tangent;
            tangents[i1] += tangent;
            tangents[i2] += tangent;
        }

        for tangent in &mut tangents {
            *tangent = tangent.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros);
        }
        self.tangents = tangents;
    }

    /// Interleave the attributes into upload-ready vertices
    ///
    /// Attributes missing for a vertex are written as zeros.
    pub fn to_vertices(&self) -> Vec<Vertex> {
        (0..self.positions.len())
            .map(|i| Vertex {
                position: self.positions[i].into(),
                tex_coord: self.tex_coords.get(i).copied().unwrap_or_else(Vec2::zeros).into(),
                normal: self.normals.get(i).copied().unwrap_or_else(Vec3::zeros).into(),
                tangent: self.tangents.get(i).copied().unwrap_or_else(Vec3::zeros).into(),
            })
            .collect()
    }
}

/// Face-indexed to vertex-indexed conversion
pub struct MeshIndexer;

impl MeshIndexer {
    /// Index a model
    ///
    /// Corners that reference no normal, or a normal the model does not have,
    /// get the average of the face normals around their position. Supplied
    /// normals are kept as they are.
    pub fn index(model: &ObjModel) -> Result<IndexedModel, ObjError> {
        let mut result = IndexedModel::default();
        let mut vertex_map: HashMap<ObjIndex, u32> = HashMap::new();
        let mut has_source_normal: Vec<bool> = Vec::new();

        // Position-only model used to average normals across UV seams
        let mut normal_model = IndexedModel::default();
        let mut position_map: HashMap<usize, u32> = HashMap::new();
        let mut result_to_normal: Vec<u32> = Vec::new();

        for (face, corners) in model.faces.iter().enumerate() {
            for corner in corners {
                let position = model.positions.get(corner.position).copied().ok_or(
                    ObjError::PositionOutOfRange {
                        face,
                        index: corner.position,
                        count: model.positions.len(),
                    },
                )?;

                let index = match vertex_map.get(corner) {
                    Some(&index) => index,
                    None => {
                        let index = next_index(result.positions.len())?;
                        let normal = corner.normal.and_then(|n| model.normals.get(n).copied());
                        result.positions.push(position);
                        result.tex_coords.push(
                            corner
                                .tex_coord
                                .and_then(|t| model.tex_coords.get(t).copied())
                                .unwrap_or_else(Vec2::zeros),
                        );
                        result.normals.push(normal.unwrap_or_else(Vec3::zeros));
                        has_source_normal.push(normal.is_some());
                        vertex_map.insert(*corner, index);
                        index
                    }
                };

                let normal_index = match position_map.get(&corner.position) {
                    Some(&shared) => shared,
                    None => {
                        let shared = next_index(normal_model.positions.len())?;
                        normal_model.positions.push(position);
                        position_map.insert(corner.position, shared);
                        shared
                    }
                };

                if index as usize == result_to_normal.len() {
                    result_to_normal.push(normal_index);
                }
                result.indices.push(index);
                normal_model.indices.push(normal_index);
            }
        }

        if has_source_normal.iter().any(|supplied| !supplied) {
            normal_model.calc_normals();
            let vertices = result.normals.iter_mut().zip(&result_to_normal).zip(&has_source_normal);
            for ((normal, &shared), &supplied) in vertices {
                if !supplied {
                    *normal = normal_model.normals[shared as usize];
                }
            }
        }

        result.calc_tangents();

        log::debug!(
            "Indexed {} face corners into {} vertices",
            result.indices.len(),
            result.vertex_count()
        );
        Ok(result)
    }
}

fn next_index(len: usize) -> Result<u32, ObjError> {
    u32::try_from(len).map_err(|_| ObjError::TooManyVertices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::ObjLoader;
    use approx::assert_relative_eq;

    const CUBE: &str = "\
v -1 -1 -1
v  1 -1 -1
v  1  1 -1
v -1  1 -1
v -1 -1  1
v  1 -1  1
v  1  1  1
v -1  1  1
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 2/1 1/2 4/3 3/4
f 5/1 6/2 7/3 8/4
f 1/1 5/2 8/3 4/4
f 6/1 2/2 3/3 7/4
f 1/1 2/2 6/3 5/4
f 8/1 7/2 3/3 4/4
";

    fn triangle_area(a: Vec3, b: Vec3, c: Vec3) -> f32 {
        (b - a).cross(&(c - a)).norm() * 0.5
    }

    fn source_area(model: &ObjModel) -> f32 {
        model
            .faces
            .iter()
            .map(|f| {
                triangle_area(
                    model.positions[f[0].position],
                    model.positions[f[1].position],
                    model.positions[f[2].position],
                )
            })
            .sum()
    }

    fn indexed_area(model: &IndexedModel) -> f32 {
        model
            .indices
            .chunks_exact(3)
            .map(|t| {
                triangle_area(
                    model.positions[t[0] as usize],
                    model.positions[t[1] as usize],
                    model.positions[t[2] as usize],
                )
            })
            .sum()
    }

    #[test]
    fn test_cube_indexing() {
        let source = ObjLoader::parse(CUBE).unwrap();
        let indexed = MeshIndexer::index(&source).unwrap();

        assert!(indexed.vertex_count() <= 24);
        assert!(indexed.is_valid());
        assert_eq!(indexed.indices.len(), 36);
        assert_relative_eq!(indexed_area(&indexed), source_area(&source), epsilon = 1e-4);
        assert_relative_eq!(indexed_area(&indexed), 24.0, epsilon = 1e-4);
    }

    #[test]
    fn test_generated_normals_are_unit_length() {
        let source = ObjLoader::parse(CUBE).unwrap();
        let indexed = MeshIndexer::index(&source).unwrap();

        for normal in &indexed.normals {
            assert_relative_eq!(normal.norm(), 1.0, epsilon = 1e-5);
        }
        // Corner normals point away from the center of the convex cube
        for (position, normal) in indexed.positions.iter().zip(&indexed.normals) {
            assert!(position.dot(normal) > 0.0);
        }
    }

    #[test]
    fn test_positions_only_collapse_to_shared_vertices() {
        let source = ObjLoader::parse(
            "v -1 -1 -1\nv 1 -1 -1\nv 1 1 -1\nv -1 1 -1\nv -1 -1 1\nv 1 -1 1\nv 1 1 1\nv -1 1 1\n\
             f 2 1 4 3\nf 5 6 7 8\nf 1 5 8 4\nf 6 2 3 7\nf 1 2 6 5\nf 8 7 3 4\n",
        )
        .unwrap();
        let indexed = MeshIndexer::index(&source).unwrap();

        assert_eq!(indexed.vertex_count(), 8);
        // Face normals are summed per triangle: the +Z face's fan touches this corner twice
        let expected = Vec3::new(1.0, 1.0, 2.0).normalize();
        let corner = indexed
            .positions
            .iter()
            .position(|p| *p == Vec3::new(1.0, 1.0, 1.0))
            .unwrap();
        assert_relative_eq!(indexed.normals[corner], expected, epsilon = 1e-5);
        assert_eq!(indexed.tex_coords[corner], Vec2::zeros());
    }

    #[test]
    fn test_source_normals_are_kept() {
        let source = ObjLoader::parse(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 -1\nf 1//1 2//1 3//1\n",
        )
        .unwrap();
        let indexed = MeshIndexer::index(&source).unwrap();
        for normal in &indexed.normals {
            assert_relative_eq!(*normal, Vec3::new(0.0, 0.0, -1.0));
        }
    }

    fn corner(position: usize, normal: Option<usize>) -> ObjIndex {
        ObjIndex {
            position,
            tex_coord: None,
            normal,
        }
    }

    #[test]
    fn test_out_of_range_position_is_an_error() {
        let source = ObjModel {
            positions: vec![Vec3::zeros(), Vec3::x(), Vec3::y()],
            faces: vec![[corner(0, None), corner(1, None), corner(5, None)]],
            ..ObjModel::default()
        };

        let result = MeshIndexer::index(&source);
        assert!(matches!(
            result,
            Err(ObjError::PositionOutOfRange { face: 0, index: 5, count: 3 })
        ));
    }

    #[test]
    fn test_partial_normals_keep_supplied_corners() {
        // Only the first corner carries a normal, and it disagrees with the face
        let source = ObjModel {
            positions: vec![Vec3::zeros(), Vec3::x(), Vec3::y()],
            normals: vec![Vec3::new(0.0, 0.0, -1.0)],
            faces: vec![[corner(0, Some(0)), corner(1, None), corner(2, None)]],
            ..ObjModel::default()
        };
        let indexed = MeshIndexer::index(&source).unwrap();

        assert_relative_eq!(indexed.normals[0], Vec3::new(0.0, 0.0, -1.0));
        assert_relative_eq!(indexed.normals[1], Vec3::z(), epsilon = 1e-6);
        assert_relative_eq!(indexed.normals[2], Vec3::z(), epsilon = 1e-6);
    }

    #[test]
    fn test_missing_normal_reference_is_rebuilt() {
        let source = ObjModel {
            positions: vec![Vec3::zeros(), Vec3::x(), Vec3::y()],
            faces: vec![[corner(0, Some(7)), corner(1, None), corner(2, None)]],
            ..ObjModel::default()
        };
        let indexed = MeshIndexer::index(&source).unwrap();
        assert_relative_eq!(indexed.normals[0], Vec3::z(), epsilon = 1e-6);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_vertex_count_beyond_u32_is_rejected() {
        assert_eq!(next_index(7).unwrap(), 7);
        assert!(matches!(
            next_index(u32::MAX as usize + 1),
            Err(ObjError::TooManyVertices)
        ));
    }

    #[test]
    fn test_degenerate_faces_contribute_nothing() {
        let source = ObjLoader::parse(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 2 0 0\nf 1 2 3\nf 1 2 4\n",
        )
        .unwrap();
        let indexed = MeshIndexer::index(&source).unwrap();

        assert_relative_eq!(indexed.normals[0], Vec3::z(), epsilon = 1e-6);
        // only touched by the zero-area face
        let collinear = indexed
            .positions
            .iter()
            .position(|p| *p == Vec3::new(2.0, 0.0, 0.0))
            .unwrap();
        assert_eq!(indexed.normals[collinear], Vec3::zeros());
        // no UVs anywhere: every UV determinant is zero
        assert!(indexed.tangents.iter().all(|t| *t == Vec3::zeros()));
    }

    #[test]
    fn test_tangents_follow_u_direction() {
        let source = ObjLoader::parse(
            "v 0 0 0\nv 2 0 0\nv 2 2 0\nv 0 2 0\nvt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\nf 1/1 2/2 3/3 4/4\n",
        )
        .unwrap();
        let indexed = MeshIndexer::index(&source).unwrap();
        for tangent in &indexed.tangents {
            assert_relative_eq!(*tangent, Vec3::x(), epsilon = 1e-5);
        }
    }
}
