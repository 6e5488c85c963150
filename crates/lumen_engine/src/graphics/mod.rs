//! Graphics context access
//!
//! - [`api`]: the immediate-mode context trait and its value types
//! - [`headless`]: a recording context for tests and tools
//! - [`state`]: the state cache that owns the context
//! - [`binder`]: lazy upload and redundancy-free binding of resources

pub mod api;
pub mod binder;
pub mod headless;
pub mod state;

pub use api::{GraphicsApi, Handle};
pub use binder::DataBinder;
pub use headless::{ApiCall, CallLog, HeadlessApi};
pub use state::{GraphicsState, StateError, StateResult};
