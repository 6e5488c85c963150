//! Uniform values
//!
//! A [`UniformValue`] is either a leaf the API understands directly or a
//! struct of named fields. Struct values are written leaf by leaf using dotted
//! names, so `light` with a nested `base.color` field becomes
//! `light.base.color`.

use crate::foundation::math::{Color, Mat4, Vec2, Vec3, Vec4};
use crate::graphics::api::UniformData;
use crate::resources::UniformType;

/// Value assigned to a shader uniform
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    /// `float`
    Float(f32),
    /// `int`
    Int(i32),
    /// `bool`
    Bool(bool),
    /// `vec2`
    Vec2(Vec2),
    /// `vec3`
    Vec3(Vec3),
    /// `vec4`
    Vec4(Vec4),
    /// Color written as `vec4`
    Color(Color),
    /// `mat4`
    Mat4(Mat4),
    /// Sampler bound to a texture slot
    Sampler(u32),
    /// Struct with named fields
    Struct(Vec<(String, UniformValue)>),
}

impl UniformValue {
    /// Build a struct value from `(field, value)` pairs
    pub fn structure<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, UniformValue)>,
        S: Into<String>,
    {
        Self::Struct(fields.into_iter().map(|(n, v)| (n.into(), v)).collect())
    }

    /// Field of a struct value
    pub fn field(&self, name: &str) -> Option<&UniformValue> {
        match self {
            Self::Struct(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Raw data for a leaf value, `None` for structs
    pub fn to_data(&self) -> Option<UniformData> {
        let data = match self {
            Self::Float(v) => UniformData::Float(*v),
            Self::Int(v) => UniformData::Int(*v),
            Self::Bool(v) => UniformData::Int(i32::from(*v)),
            Self::Vec2(v) => UniformData::Vec2([v.x, v.y]),
            Self::Vec3(v) => UniformData::Vec3([v.x, v.y, v.z]),
            Self::Vec4(v) => UniformData::Vec4([v.x, v.y, v.z, v.w]),
            Self::Color(c) => UniformData::Vec4([c.r, c.g, c.b, c.a]),
            Self::Sampler(slot) => UniformData::Int(i32::try_from(*slot).ok()?),
            Self::Mat4(m) => {
                let mut columns = [0.0; 16];
                columns.copy_from_slice(m.as_slice());
                UniformData::Mat4(columns)
            }
            Self::Struct(_) => return None,
        };
        Some(data)
    }

    /// Whether a leaf value can be written to a uniform of the given type
    ///
    /// Colors are `vec4`s and sampler slots may also be given as plain ints.
    pub fn matches(&self, ty: &UniformType) -> bool {
        matches!(
            (self, ty),
            (Self::Float(_), UniformType::Float)
                | (Self::Int(_), UniformType::Int)
                | (Self::Bool(_), UniformType::Bool)
                | (Self::Vec2(_), UniformType::Vec2)
                | (Self::Vec3(_), UniformType::Vec3)
                | (Self::Vec4(_) | Self::Color(_), UniformType::Vec4)
                | (Self::Mat4(_), UniformType::Mat4)
                | (Self::Sampler(_) | Self::Int(_), UniformType::Sampler2D)
        )
    }

    /// Visit every leaf with its dotted name, stopping at the first error
    ///
    /// The name buffer is reused across leaves, so walking a struct value
    /// allocates once.
    pub fn try_for_each_leaf<E, F>(&self, name: &str, mut visit: F) -> Result<(), E>
    where
        F: FnMut(&str, &UniformValue) -> Result<(), E>,
    {
        let mut path = String::with_capacity(name.len() + 32);
        path.push_str(name);
        self.visit_leaves(&mut path, &mut visit)
    }

    fn visit_leaves<E, F>(&self, path: &mut String, visit: &mut F) -> Result<(), E>
    where
        F: FnMut(&str, &UniformValue) -> Result<(), E>,
    {
        match self {
            Self::Struct(fields) => {
                for (field, value) in fields {
                    let len = path.len();
                    path.push('.');
                    path.push_str(field);
                    let result = value.visit_leaves(path, visit);
                    path.truncate(len);
                    result?;
                }
                Ok(())
            }
            leaf => visit(path, leaf),
        }
    }

    /// Expand into `(dotted name, data)` leaves
    #[cfg(test)]
    pub(crate) fn leaves(&self, name: &str) -> Vec<(String, UniformData)> {
        let mut out = Vec::new();
        let walked: Result<(), ()> = self.try_for_each_leaf(name, |leaf, value| {
            if let Some(data) = value.to_data() {
                out.push((leaf.to_string(), data));
            }
            Ok(())
        });
        assert!(walked.is_ok());
        out
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        Self::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        Self::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        Self::Vec4(v)
    }
}

impl From<Color> for UniformValue {
    fn from(c: Color) -> Self {
        Self::Color(c)
    }
}

impl From<Mat4> for UniformValue {
    fn from(m: Mat4) -> Self {
        Self::Mat4(m)
    }
}
