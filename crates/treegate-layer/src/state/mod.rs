//! Persisted object-layer state.
//!
//! Everything here is backed by the tree service. Nodes are never mutated in
//! place; current state is derived on read.
//!
//! - [`VersionIndex`] -- per-key version history, latest resolution, prefix
//!   enumeration
//! - [`MultipartState`] -- in-progress uploads and their parts
//! - [`LockState`] -- legal holds and retention on versions
//! - [`ContainerSettings`] -- per-container versioning status (held locally)
//!
//! # Thread Safety
//!
//! All types are `Send + Sync`. The index, multipart, and lock state hold no
//! mutable state of their own beyond the completion guards of
//! [`MultipartState`]; settings use `parking_lot::RwLock`.

pub(crate) mod index;
pub(crate) mod lock;
pub(crate) mod multipart;
pub(crate) mod node;
pub(crate) mod settings;

pub use index::{VersionIndex, reduce_history, reduce_latest};
pub use lock::{LockRecord, LockState};
pub use multipart::{
    MAX_PART_NUMBER, MultipartState, MultipartUpload, PartMeta, PartRecord, UploadMeta,
};
pub use node::{DeleteMarkerInfo, VersionMeta, VersionNode, VersionRecord, VersionState};
pub use settings::{ContainerSettings, VersioningStatus};
