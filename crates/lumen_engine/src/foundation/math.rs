//! Math utilities and types
//!
//! Provides the fundamental math types used by the scene graph, the mesh
//! indexer and the renderer. All matrices are column-major and follow the
//! right-handed, Y-up conventions of the immediate-mode graphics API.

pub use nalgebra::{Matrix3, Matrix4, Quaternion, Unit, Vector2, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Unit quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Linear RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red channel
    pub r: f32,
    /// Green channel
    pub g: f32,
    /// Blue channel
    pub b: f32,
    /// Alpha channel
    pub a: f32,
}

impl Color {
    /// Opaque black
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);

    /// Opaque white
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);

    /// Fully transparent black, the API's initial clear color
    pub const TRANSPARENT: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);

    /// Create a color from all four channels
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    /// Create an opaque gray with the same value in every channel
    pub const fn gray(value: f32) -> Self {
        Self::rgb(value, value, value)
    }

    /// RGB channels as a vector
    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.r, self.g, self.b)
    }

    /// RGBA channels as a vector
    pub fn to_vec4(self) -> Vec4 {
        Vec4::new(self.r, self.g, self.b, self.a)
    }

    /// Whether every channel lies in `[0, 1]`
    pub fn is_normalized(self) -> bool {
        [self.r, self.g, self.b, self.a]
            .iter()
            .all(|c| (0.0..=1.0).contains(c))
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl From<[f32; 4]> for Color {
    fn from(c: [f32; 4]) -> Self {
        Self::rgba(c[0], c[1], c[2], c[3])
    }
}

impl From<[f32; 3]> for Color {
    fn from(c: [f32; 3]) -> Self {
        Self::rgb(c[0], c[1], c[2])
    }
}

/// Math utility functions
pub mod utils {
    use super::{Mat4, Point3, Vec3};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees.to_radians()
    }

    /// Right-handed perspective projection mapping depth to `[-1, 1]`
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_perspective(aspect, fov_y, near, far)
    }

    /// Right-handed orthographic projection
    pub fn orthographic(half_width: f32, half_height: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_orthographic(-half_width, half_width, -half_height, half_height, near, far)
    }

    /// Right-handed look-at view matrix
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
    }

    /// Transform a point by a homogeneous matrix
    pub fn transform_point(matrix: &Mat4, point: Vec3) -> Vec3 {
        matrix.transform_point(&Point3::from(point)).coords
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_color_conversions() {
        let color = Color::from([0.25, 0.5, 0.75]);
        assert_eq!(color.a, 1.0);
        assert_relative_eq!(color.to_vec3(), Vec3::new(0.25, 0.5, 0.75));
        assert!(color.is_normalized());
        assert!(!Color::rgb(1.5, 0.0, 0.0).is_normalized());
    }

    #[test]
    fn test_look_at_moves_eye_to_origin() {
        let view = utils::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros(), Vec3::y());
        let eye = utils::transform_point(&view, Vec3::new(0.0, 0.0, 5.0));
        assert_relative_eq!(eye, Vec3::zeros(), epsilon = 1e-6);
    }
}
