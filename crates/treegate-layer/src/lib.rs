//! Versioned object layer for treegate.
//!
//! Objects live in a container and are addressed by key. Every write becomes
//! a version node in a signed, remotely hosted tree index, and payloads are
//! kept in a content-addressed store. The layer resolves the live version of
//! a key, lists prefixes with their full version history, assembles multipart
//! uploads, and enforces retention and legal holds on individual versions.
//!
//! # Architecture
//!
//! ```text
//! ObjectLayer (ops: object, list, multipart, lock, container)
//!        |
//!        +--> ListingCache / NodeCache (bounded LRU with TTL)
//!        |
//!        v
//!   VersionIndex / MultipartState / LockState
//!        |                         |
//!        v                         v
//!   TreeClient (signed requests)  ContentStore (in-memory + spillover)
//!        |
//!        v
//!   TreeService (remote index)
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod info;
mod ops;
pub mod provider;
pub mod state;
pub mod storage;
pub mod tree;
pub mod utils;

pub use config::LayerConfig;
pub use error::{LayerError, LayerResult};
pub use provider::ObjectLayer;
