//! Resolved object views returned by the object layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use treegate_core::{ContentId, NodeId, UserId};

use crate::state::VersionNode;
use crate::storage::ContentHeader;
use crate::utils::time_of;

/// A content version resolved against the content store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectInfo {
    /// Version node the object was resolved from.
    pub version: NodeId,
    /// Object key.
    pub key: String,
    /// Payload reference.
    pub content_id: ContentId,
    /// Payload size in bytes.
    pub size: u64,
    /// When the version was written.
    pub created: DateTime<Utc>,
    /// Writer of the version.
    pub owner: UserId,
}

impl ObjectInfo {
    /// Build the info of a content version from its payload header. Returns
    /// `None` for delete markers.
    #[must_use]
    pub fn resolve(node: &VersionNode, header: &ContentHeader) -> Option<Self> {
        Some(Self {
            version: node.id,
            key: node.key.clone(),
            content_id: *node.content_id()?,
            size: header.size,
            created: time_of(node.timestamp()),
            owner: node.owner().clone(),
        })
    }
}

/// A version node paired with its resolved object, as shown in version
/// listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedVersionInfo {
    /// Resolved object; `None` for delete markers and for versions whose
    /// payload could not be resolved.
    pub object: Option<ObjectInfo>,
    /// The version node.
    pub node: VersionNode,
    /// Whether this is the newest version of its key.
    pub is_latest: bool,
}
