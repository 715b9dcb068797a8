//! Version node types.
//!
//! A [`VersionNode`] is one immutable entry in a key's history. It either
//! points at a payload or is a delete marker; the [`VersionState`] enum makes
//! the two cases mutually exclusive by construction.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use treegate_core::{ContentId, NodeId, UserId};

/// Annotation carried only by delete markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMarkerInfo {
    /// Logical path (object key) the marker hides.
    pub file_path: String,
    /// When the marker was created.
    pub created: DateTime<Utc>,
    /// Who deleted the object.
    pub owner: UserId,
}

/// What a version node holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VersionState {
    /// A live payload.
    Content {
        /// ID of the payload in the content store.
        content_id: ContentId,
    },
    /// A tombstone that makes the key resolve as not found.
    DeleteMarker(DeleteMarkerInfo),
}

/// Node body as persisted in the version tree. The tree supplies the node ID
/// and the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionMeta {
    /// Logical write time in microseconds since the Unix epoch.
    pub timestamp: u64,
    /// Writer of the version.
    pub owner: UserId,
    /// Payload reference or delete marker.
    pub state: VersionState,
    /// Written while the container was not versioning-enabled.
    #[serde(default)]
    pub unversioned: bool,
    /// Upload that produced this version, for completed multipart uploads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_id: Option<String>,
}

/// One version of a logical key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionNode {
    /// Node ID assigned by the tree service. Doubles as the version ID.
    pub id: NodeId,
    /// Object key.
    pub key: String,
    /// Persisted body.
    pub meta: VersionMeta,
}

/// Wire shape of a version node: `{id, contentId?, timestamp, deleteMarker?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    /// Node ID.
    pub id: NodeId,
    /// Payload reference, absent on delete markers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<ContentId>,
    /// Logical write time in microseconds.
    pub timestamp: u64,
    /// Delete-marker annotation, absent on content versions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_marker: Option<DeleteMarkerInfo>,
}

impl VersionNode {
    /// Payload reference, or `None` for a delete marker.
    #[must_use]
    pub fn content_id(&self) -> Option<&ContentId> {
        match &self.meta.state {
            VersionState::Content { content_id } => Some(content_id),
            VersionState::DeleteMarker(_) => None,
        }
    }

    /// Delete-marker annotation, or `None` for a content version.
    #[must_use]
    pub fn delete_marker(&self) -> Option<&DeleteMarkerInfo> {
        match &self.meta.state {
            VersionState::DeleteMarker(info) => Some(info),
            VersionState::Content { .. } => None,
        }
    }

    /// Whether this node is a delete marker.
    #[must_use]
    pub fn is_delete_marker(&self) -> bool {
        self.delete_marker().is_some()
    }

    /// Logical write time in microseconds.
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        self.meta.timestamp
    }

    /// Writer of the version.
    #[must_use]
    pub fn owner(&self) -> &UserId {
        &self.meta.owner
    }

    /// Whether the version was written to a non-versioning container.
    #[must_use]
    pub fn is_unversioned(&self) -> bool {
        self.meta.unversioned
    }

    /// Recency order: greater timestamp first, ties broken by the higher node
    /// ID. `Ordering::Greater` means `self` is newer.
    #[must_use]
    pub fn recency_cmp(&self, other: &Self) -> Ordering {
        (self.meta.timestamp, self.id).cmp(&(other.meta.timestamp, other.id))
    }

    /// Persisted wire shape.
    #[must_use]
    pub fn record(&self) -> VersionRecord {
        VersionRecord {
            id: self.id,
            content_id: self.content_id().copied(),
            timestamp: self.meta.timestamp,
            delete_marker: self.delete_marker().cloned(),
        }
    }
}
