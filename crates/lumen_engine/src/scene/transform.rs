//! Node transforms
//!
//! A [`Transform`] stores position, rotation and scale relative to its parent
//! node. World matrices are computed on demand from the chain of parent
//! transforms, `parent_world * T * R * S`, and never cached.

use crate::foundation::math::{Mat4, Quat, Vec3};

/// Local position, rotation and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position relative to the parent
    pub position: Vec3,

    /// Rotation relative to the parent
    pub rotation: Quat,

    /// Per-axis scale
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create from position only
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create from position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Builder pattern: set the scale
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Move by an offset in parent space
    pub fn translate(&mut self, offset: Vec3) {
        self.position += offset;
    }

    /// Apply an additional rotation
    pub fn rotate(&mut self, rotation: Quat) {
        self.rotation = rotation * self.rotation;
    }

    /// Rotate so that local -Z points from `position` towards `target`
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let direction = target - self.position;
        if direction.norm_squared() <= f32::EPSILON {
            return;
        }
        // face_towards aligns local +Z with the direction; flip it for a -Z forward
        self.rotation = Quat::face_towards(&-direction, &up);
    }

    /// Local matrix `T * R * S`
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// World matrix given the parent's world matrix
    pub fn world_matrix(&self, parent_world: Option<&Mat4>) -> Mat4 {
        match parent_world {
            Some(parent) => parent * self.local_matrix(),
            None => self.local_matrix(),
        }
    }

    /// Local forward direction (-Z) in parent space
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::z()
    }

    /// Local up direction (+Y) in parent space
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::y()
    }

    /// Local right direction (+X) in parent space
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::x()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::utils;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_local_matrix_applies_scale_rotation_translation() {
        let transform = Transform::from_position_rotation(
            Vec3::new(1.0, 0.0, 0.0),
            Quat::from_axis_angle(&Vec3::y_axis(), FRAC_PI_2),
        )
        .with_scale(Vec3::new(2.0, 2.0, 2.0));

        // (1,0,0) scaled to (2,0,0), rotated about Y to (0,0,-2), moved by +X
        let p = utils::transform_point(&transform.local_matrix(), Vec3::x());
        assert_relative_eq!(p, Vec3::new(1.0, 0.0, -2.0), epsilon = 1e-6);
    }

    #[test]
    fn test_world_matrix_composes_with_parent() {
        let parent = Transform::from_position(Vec3::new(0.0, 5.0, 0.0));
        let child = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
        let world = child.world_matrix(Some(&parent.local_matrix()));
        let origin = utils::transform_point(&world, Vec3::zeros());
        assert_relative_eq!(origin, Vec3::new(1.0, 5.0, 0.0));
    }

    #[test]
    fn test_look_at_points_forward_at_target() {
        let mut transform = Transform::from_position(Vec3::new(0.0, 0.0, 5.0));
        transform.look_at(Vec3::new(5.0, 0.0, 5.0), Vec3::y());
        assert_relative_eq!(transform.forward(), Vec3::x(), epsilon = 1e-6);
        assert_relative_eq!(transform.up(), Vec3::y(), epsilon = 1e-6);
    }
}
