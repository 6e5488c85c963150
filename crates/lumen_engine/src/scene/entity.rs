//! Scene entities
//!
//! Entities are the behavior attached to scene nodes. An entity opts into the
//! per-frame update and the per-pass render walk by returning itself from
//! [`Entity::as_updatable`] or [`Entity::as_renderable`]. Every entity shares
//! the [`Transform`] of the node that owns it.

use std::any::Any;
use std::fmt;

use crate::foundation::math::Mat4;
use crate::render::{RenderContext, RenderResult};
use crate::scene::{NodeId, Transform};

/// Identifier of an entity, unique within one scene graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub(crate) u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Per-frame behavior
pub trait Updatable {
    /// Advance by `delta` seconds; `transform` is the owning node's transform
    fn update(&mut self, delta: f32, transform: &mut Transform);
}

/// Per-pass drawing
pub trait Renderable {
    /// Draw with the pass shader already bound
    fn render(&self, world: &Mat4, ctx: &mut RenderContext<'_>) -> RenderResult<()>;
}

/// Component owned by a scene node
pub trait Entity: Any {
    /// Name used in logs
    fn name(&self) -> &str {
        "entity"
    }

    /// Called when the entity becomes part of the live scene
    fn attached(&mut self, _node: NodeId) {}

    /// Called before the entity leaves the live scene
    fn removed(&mut self) {}

    /// Update capability
    fn as_updatable(&mut self) -> Option<&mut dyn Updatable> {
        None
    }

    /// Render capability
    fn as_renderable(&self) -> Option<&dyn Renderable> {
        None
    }

    /// Downcasting support
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcasting support
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Entity that runs a closure every frame, handy for simple controllers
pub struct Controller<F>
where
    F: FnMut(f32, &mut Transform) + 'static,
{
    name: String,
    behavior: F,
}

impl<F> Controller<F>
where
    F: FnMut(f32, &mut Transform) + 'static,
{
    /// Create a controller
    pub fn new(name: impl Into<String>, behavior: F) -> Self {
        Self {
            name: name.into(),
            behavior,
        }
    }
}

impl<F> Updatable for Controller<F>
where
    F: FnMut(f32, &mut Transform) + 'static,
{
    fn update(&mut self, delta: f32, transform: &mut Transform) {
        (self.behavior)(delta, transform);
    }
}

impl<F> Entity for Controller<F>
where
    F: FnMut(f32, &mut Transform) + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn as_updatable(&mut self) -> Option<&mut dyn Updatable> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
