//! OBJ file loader for 3D models
//!
//! Parses the subset of the Wavefront OBJ format the engine uses into an
//! [`ObjModel`]: positions, texture coordinates, normals and triangulated
//! faces that still index those three lists separately. Turning that into a
//! renderable buffer is the job of [`crate::assets::MeshIndexer`].

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

use crate::foundation::math::{Vec2, Vec3};

/// OBJ loading errors
#[derive(Error, Debug)]
pub enum ObjError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be parsed
    #[error("Parse error on line {line}: {message}")]
    ParseError {
        /// 1-based line number
        line: usize,
        /// What went wrong
        message: String,
    },

    /// The file parsed but does not describe a usable model
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A face corner refers to a position the model does not have
    #[error("Face {face} references position {index}, but the model has {count}")]
    PositionOutOfRange {
        /// 0-based triangle index
        face: usize,
        /// Offending position index
        index: usize,
        /// Number of positions in the model
        count: usize,
    },

    /// The model needs more vertices than 32-bit indices can address
    #[error("Model needs more than {} vertices", u32::MAX)]
    TooManyVertices,
}

/// One corner of a face: 0-based indices into the model's lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjIndex {
    /// Position index
    pub position: usize,
    /// Texture coordinate index
    pub tex_coord: Option<usize>,
    /// Normal index
    pub normal: Option<usize>,
}

/// Face-indexed model as read from an OBJ file
#[derive(Debug, Clone, Default)]
pub struct ObjModel {
    /// Vertex positions
    pub positions: Vec<Vec3>,
    /// Texture coordinates
    pub tex_coords: Vec<Vec2>,
    /// Normals
    pub normals: Vec<Vec3>,
    /// Triangles
    pub faces: Vec<[ObjIndex; 3]>,
    /// Names of the `o`/`g` objects in file order
    pub objects: Vec<String>,
}

/// OBJ parser
pub struct ObjLoader;

impl ObjLoader {
    /// Load an OBJ file
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<ObjModel, ObjError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let model = Self::from_reader(BufReader::new(file))?;
        log::info!(
            "Loaded {}: {} positions, {} triangles",
            path.display(),
            model.positions.len(),
            model.faces.len()
        );
        Ok(model)
    }

    /// Parse OBJ text
    pub fn parse(text: &str) -> Result<ObjModel, ObjError> {
        Self::from_reader(text.as_bytes())
    }

    /// Parse OBJ records from any buffered reader
    pub fn from_reader<R: BufRead>(reader: R) -> Result<ObjModel, ObjError> {
        let mut model = ObjModel::default();

        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let number = number + 1;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts[0] {
                "v" => {
                    let [x, y, z] = parse_floats::<3>(&parts[1..], number, "vertex")?;
                    model.positions.push(Vec3::new(x, y, z));
                }
                "vt" => {
                    let [u, v] = parse_floats::<2>(&parts[1..], number, "texture coordinate")?;
                    model.tex_coords.push(Vec2::new(u, v));
                }
                "vn" => {
                    let [x, y, z] = parse_floats::<3>(&parts[1..], number, "normal")?;
                    model.normals.push(Vec3::new(x, y, z));
                }
                "f" => {
                    if parts.len() < 4 {
                        return Err(ObjError::ParseError {
                            line: number,
                            message: format!("face needs at least 3 vertices, got {}", parts.len() - 1),
                        });
                    }
                    let corners = parts[1..]
                        .iter()
                        .map(|corner| parse_corner(corner, &model, number))
                        .collect::<Result<Vec<_>, _>>()?;

                    // Fan triangulation around the first corner
                    for i in 1..corners.len() - 1 {
                        model.faces.push([corners[0], corners[i], corners[i + 1]]);
                    }
                }
                "o" | "g" => {
                    let name = parts[1..].join(" ");
                    model.objects.push(name);
                }
                _ => {
                    // Materials, smoothing groups and other records are ignored
                }
            }
        }

        if model.faces.is_empty() {
            return Err(ObjError::InvalidFormat("No faces found in OBJ data".to_string()));
        }
        if model.objects.len() > 1 {
            log::warn!(
                "OBJ data contains {} objects; texture coordinates are not renumbered per object",
                model.objects.len()
            );
        }

        Ok(model)
    }
}

fn parse_floats<const N: usize>(values: &[&str], line: usize, what: &str) -> Result<[f32; N], ObjError> {
    if values.len() < N {
        return Err(ObjError::ParseError {
            line,
            message: format!("{} needs {} components, got {}", what, N, values.len()),
        });
    }
    let mut out = [0.0; N];
    for (slot, value) in out.iter_mut().zip(values) {
        *slot = value.parse().map_err(|_| ObjError::ParseError {
            line,
            message: format!("invalid {} component '{}'", what, value),
        })?;
    }
    Ok(out)
}

/// Resolve a 1-based or negative (relative to the end) OBJ index
fn resolve_index(raw: &str, count: usize, line: usize, what: &str) -> Result<usize, ObjError> {
    let index: i64 = raw.parse().map_err(|_| ObjError::ParseError {
        line,
        message: format!("invalid {} index '{}'", what, raw),
    })?;

    let resolved = match index {
        0 => None,
        i if i > 0 => Some(i - 1),
        i => Some(count as i64 + i),
    };

    match resolved {
        Some(i) if i >= 0 && (i as usize) < count => Ok(i as usize),
        _ => Err(ObjError::ParseError {
            line,
            message: format!("{} index {} out of range (have {})", what, index, count),
        }),
    }
}

/// Parse `p`, `p/t`, `p//n` or `p/t/n`
fn parse_corner(corner: &str, model: &ObjModel, line: usize) -> Result<ObjIndex, ObjError> {
    let mut fields = corner.split('/');
    let position = match fields.next() {
        Some(p) if !p.is_empty() => resolve_index(p, model.positions.len(), line, "position")?,
        _ => {
            return Err(ObjError::ParseError {
                line,
                message: format!("face corner '{}' has no position", corner),
            })
        }
    };

    let tex_coord = match fields.next() {
        Some(t) if !t.is_empty() => Some(resolve_index(t, model.tex_coords.len(), line, "texture coordinate")?),
        _ => None,
    };
    let normal = match fields.next() {
        Some(n) if !n.is_empty() => Some(resolve_index(n, model.normals.len(), line, "normal")?),
        _ => None,
    };

    Ok(ObjIndex {
        position,
        tex_coord,
        normal,
    })
}
