//! Object layer operation handlers.
//!
//! Each submodule adds a group of public methods to
//! [`crate::provider::ObjectLayer`]. Handlers validate their input, delegate
//! to the state managers in [`crate::state`], and keep the caches coherent
//! with their own writes.

pub mod container;
pub mod list;
pub mod lock;
pub mod multipart;
pub mod object;
