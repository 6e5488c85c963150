//! Asset loading
//!
//! Loads model files from disk and converts them into renderable geometry.

pub mod indexer;
pub mod obj_loader;

pub use indexer::{IndexedModel, MeshIndexer};
pub use obj_loader::{ObjError, ObjIndex, ObjLoader, ObjModel};
