//! Shared identifiers, errors, and per-container state for treegate.
//!
//! This crate provides the building blocks shared by the version index, the
//! caches, and the object layer: strongly typed container, owner, node and
//! content identifiers, plus a concurrent per-container state store.

mod error;
mod state;
mod types;

pub use error::{CoreError, CoreResult};
pub use state::ContainerMap;
pub use types::{ContainerId, ContentId, NodeId, UserId};
