//! Scene graph
//!
//! Nodes form a tree under a permanent root; each node owns a [`Transform`]
//! and an ordered list of [`Entity`] values. Entities opt into per-frame
//! updates and per-pass rendering.

pub mod camera;
pub mod entity;
pub mod figure;
pub mod material;
pub mod node;
pub mod transform;

pub use camera::{Camera, Projection};
pub use entity::{Controller, Entity, EntityId, Renderable, Updatable};
pub use figure::Figure;
pub use material::Material;
pub use node::{Node, NodeId, SceneGraph};
pub use transform::Transform;

use thiserror::Error;

/// Scene graph errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// The node id does not refer to a node of this graph
    #[error("Node not found")]
    NodeNotFound,

    /// The node already has a parent
    #[error("Node '{0}' is already attached to a parent")]
    AlreadyAttached(String),

    /// Attaching would make a node its own ancestor
    #[error("Attaching node '{0}' would create a cycle")]
    Cycle(String),

    /// The entity is not owned by the node
    #[error("Entity {0} not found")]
    EntityNotFound(EntityId),

    /// The entity is not owned by any node, so it has no transform
    #[error("Entity {0} has no parent node")]
    DetachedEntity(EntityId),
}

/// Result type for scene graph operations
pub type SceneResult<T> = Result<T, SceneError>;
