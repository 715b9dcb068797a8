//! Tree-service contract.
//!
//! The tree service persists index nodes. Each container has two trees:
//!
//! - [`TreeKind::Version`] holds one node per object version
//! - [`TreeKind::System`] holds multipart uploads, parts, and lock records
//!
//! Nodes are never mutated in place. A change appends a new node and removes
//! the superseded one. Every mutating call carries a [`Signed`] request whose
//! signature covers the serialized body.
//!
//! [`MemoryTree`] is the in-process implementation; [`TreeClient`] is what
//! the rest of the crate talks to.

pub mod client;
pub mod memory;
pub mod signer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use treegate_core::{ContainerId, NodeId};

pub use client::TreeClient;
pub use memory::MemoryTree;
pub use signer::{RequestSigner, SignatureError, Signed};

use crate::state::lock::LockRecord;
use crate::state::multipart::{PartMeta, UploadMeta};
use crate::state::node::VersionMeta;

/// Which of a container's trees a node lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TreeKind {
    /// Object versions.
    Version,
    /// Uploads, parts, and lock records.
    System,
}

/// Typed body of a tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "camelCase")]
pub enum NodePayload {
    /// An object version.
    Version(VersionMeta),
    /// An in-progress multipart upload.
    Upload(UploadMeta),
    /// One part of a multipart upload.
    Part(PartMeta),
    /// Lock annotations of an object version.
    Lock(LockRecord),
}

/// A node as stored by the tree service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Node ID assigned on creation.
    pub id: NodeId,
    /// Path-like key the node is filed under.
    pub key: String,
    /// Node body.
    pub payload: NodePayload,
}

/// Request to append a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddNodeRequest {
    /// Target container.
    pub container: ContainerId,
    /// Target tree.
    pub tree: TreeKind,
    /// Key to file the node under.
    pub key: String,
    /// Node body.
    pub payload: NodePayload,
}

/// Request to remove a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveNodeRequest {
    /// Target container.
    pub container: ContainerId,
    /// Target tree.
    pub tree: TreeKind,
    /// Node to remove.
    pub id: NodeId,
}

/// Failures reported by a tree service.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// The service cannot be reached.
    #[error("tree service unavailable: {0}")]
    Unavailable(String),
    /// The request envelope failed verification.
    #[error("rejected request: {0}")]
    Signature(#[from] SignatureError),
    /// The addressed node does not exist.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
}

/// Remote index of tree nodes.
#[async_trait]
pub trait TreeService: Send + Sync + std::fmt::Debug {
    /// Append a node and return its ID.
    async fn add_node(&self, request: Signed<AddNodeRequest>) -> Result<NodeId, TreeError>;

    /// Remove a node.
    async fn remove_node(&self, request: Signed<RemoveNodeRequest>) -> Result<(), TreeError>;

    /// All nodes of one tree whose key starts with `prefix`, in node ID order.
    async fn list_nodes(
        &self,
        container: &ContainerId,
        tree: TreeKind,
        prefix: &str,
    ) -> Result<Vec<TreeNode>, TreeError>;

    /// A single node by ID.
    async fn get_node(
        &self,
        container: &ContainerId,
        tree: TreeKind,
        id: NodeId,
    ) -> Result<Option<TreeNode>, TreeError>;
}
