//! Camera entity
//!
//! A camera only describes a projection. Its position and orientation come
//! from the node that owns it: the view matrix is the inverse of that node's
//! world matrix, so a camera is moved by moving its node.

use std::any::Any;

use crate::foundation::math::{utils, Mat4};
use crate::scene::Entity;

/// Projection model
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Perspective frustum
    Perspective {
        /// Vertical field of view in radians
        fov_y: f32,
        /// Width over height
        aspect: f32,
        /// Near clip distance
        near: f32,
        /// Far clip distance
        far: f32,
    },
    /// Axis-aligned box
    Orthographic {
        /// Half of the visible width
        half_width: f32,
        /// Half of the visible height
        half_height: f32,
        /// Near clip distance
        near: f32,
        /// Far clip distance
        far: f32,
    },
}

/// Camera entity providing the projection for a render
#[derive(Debug, Clone)]
pub struct Camera {
    projection: Projection,
}

impl Camera {
    /// Perspective camera; the field of view is given in degrees
    pub fn perspective(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Perspective {
                fov_y: utils::deg_to_rad(fov_degrees),
                aspect,
                near,
                far,
            },
        }
    }

    /// Orthographic camera showing `half_width` x `half_height` around its axis
    pub fn orthographic(half_width: f32, half_height: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Orthographic {
                half_width,
                half_height,
                near,
                far,
            },
        }
    }

    /// Projection model
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective {
                fov_y,
                aspect,
                near,
                far,
            } => utils::perspective(fov_y, aspect, near, far),
            Projection::Orthographic {
                half_width,
                half_height,
                near,
                far,
            } => utils::orthographic(half_width, half_height, near, far),
        }
    }

    /// Adapt to a new surface aspect ratio
    ///
    /// Orthographic cameras keep their height and recompute their width.
    pub fn set_aspect(&mut self, new_aspect: f32) {
        match &mut self.projection {
            Projection::Perspective { aspect, .. } => *aspect = new_aspect,
            Projection::Orthographic {
                half_width,
                half_height,
                ..
            } => *half_width = *half_height * new_aspect,
        }
    }
}

impl Entity for Camera {
    fn name(&self) -> &str {
        "camera"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
