//! Version index.
//!
//! Each container's version tree is a flat, append-only collection of
//! [`VersionNode`]s. Nothing in it is ever marked "current" or "deleted":
//! both are derived on read by reducing the nodes of a key.
//!
//! Recency is decided by the logical timestamp, ties broken by the higher
//! node ID. A key whose newest node is a delete marker resolves as not found.
//! In a non-versioning container only the newest unversioned node is live;
//! older unversioned nodes stay in the tree as history but never show up in
//! listings or resolution.

use std::cmp::Ordering;

use chrono::Utc;
use tracing::{debug, warn};
use treegate_core::{ContainerId, ContentId, NodeId, UserId};

use super::node::{DeleteMarkerInfo, VersionMeta, VersionNode, VersionState};
use crate::error::LayerResult;
use crate::tree::{NodePayload, TreeClient, TreeKind, TreeNode};
use crate::utils::timestamp_micros;

/// Ordered, derived view over a container's version tree.
#[derive(Debug, Clone)]
pub struct VersionIndex {
    client: TreeClient,
}

impl VersionIndex {
    /// Create an index over the given tree client.
    #[must_use]
    pub fn new(client: TreeClient) -> Self {
        Self { client }
    }

    /// Record a new content version of `key`.
    pub async fn create_version(
        &self,
        container: &ContainerId,
        key: &str,
        content_id: ContentId,
        owner: UserId,
        unversioned: bool,
    ) -> LayerResult<VersionNode> {
        self.append(
            container,
            key,
            VersionMeta {
                timestamp: timestamp_micros(),
                owner,
                state: VersionState::Content { content_id },
                unversioned,
                upload_id: None,
            },
        )
        .await
    }

    /// Record a delete marker for `key`.
    pub async fn create_delete_marker(
        &self,
        container: &ContainerId,
        key: &str,
        owner: UserId,
    ) -> LayerResult<VersionNode> {
        let marker = DeleteMarkerInfo {
            file_path: key.to_owned(),
            created: Utc::now(),
            owner: owner.clone(),
        };
        self.append(
            container,
            key,
            VersionMeta {
                timestamp: timestamp_micros(),
                owner,
                state: VersionState::DeleteMarker(marker),
                unversioned: false,
                upload_id: None,
            },
        )
        .await
    }

    /// Append a fully formed version body.
    pub(crate) async fn append(
        &self,
        container: &ContainerId,
        key: &str,
        meta: VersionMeta,
    ) -> LayerResult<VersionNode> {
        let id = self
            .client
            .add(
                container,
                TreeKind::Version,
                key,
                NodePayload::Version(meta.clone()),
            )
            .await?;
        debug!(
            container = %container,
            key,
            %id,
            delete_marker = matches!(meta.state, VersionState::DeleteMarker(_)),
            "created version node"
        );
        Ok(VersionNode {
            id,
            key: key.to_owned(),
            meta,
        })
    }

    /// Every node whose key starts with `prefix`.
    ///
    /// With `latest_only` the result holds one node per key, the newest, and
    /// delete-marker winners are kept so the caller can tell "deleted" from
    /// "never written". Without it the result holds every live version,
    /// ordered by key and then newest first.
    pub async fn list_by_prefix(
        &self,
        container: &ContainerId,
        prefix: &str,
        latest_only: bool,
    ) -> LayerResult<Vec<VersionNode>> {
        let nodes = self.raw_nodes(container, prefix).await?;
        Ok(if latest_only {
            reduce_latest(nodes)
        } else {
            reduce_history(nodes)
        })
    }

    /// The live version of `key`, or `None` if the key was never written or
    /// its newest node is a delete marker.
    pub async fn resolve_latest(
        &self,
        container: &ContainerId,
        key: &str,
    ) -> LayerResult<Option<VersionNode>> {
        Ok(self
            .latest_node(container, key)
            .await?
            .filter(|node| !node.is_delete_marker()))
    }

    /// The newest node of `key`, delete markers included.
    pub async fn latest_node(
        &self,
        container: &ContainerId,
        key: &str,
    ) -> LayerResult<Option<VersionNode>> {
        Ok(self
            .exact_nodes(container, key)
            .await?
            .into_iter()
            .max_by(VersionNode::recency_cmp))
    }

    /// One version of `key` by node ID, or `None` if it does not exist or
    /// belongs to another key.
    pub async fn get_version(
        &self,
        container: &ContainerId,
        key: &str,
        id: NodeId,
    ) -> LayerResult<Option<VersionNode>> {
        let node = self.client.get(container, TreeKind::Version, id).await?;
        Ok(node
            .and_then(version_of)
            .filter(|node| node.key == key))
    }

    /// The version committed by multipart upload `upload_id`, if any.
    pub(crate) async fn committed_upload(
        &self,
        container: &ContainerId,
        key: &str,
        upload_id: &str,
    ) -> LayerResult<Option<VersionNode>> {
        Ok(self
            .exact_nodes(container, key)
            .await?
            .into_iter()
            .find(|node| node.meta.upload_id.as_deref() == Some(upload_id)))
    }

    /// Remove a single version from the tree. Returns `false` if it was
    /// already gone.
    pub async fn remove_version(
        &self,
        container: &ContainerId,
        node: &VersionNode,
    ) -> LayerResult<bool> {
        let removed = self
            .client
            .remove(container, TreeKind::Version, node.id)
            .await?;
        debug!(container = %container, key = %node.key, id = %node.id, removed, "removed version node");
        Ok(removed)
    }

    async fn exact_nodes(
        &self,
        container: &ContainerId,
        key: &str,
    ) -> LayerResult<Vec<VersionNode>> {
        let mut nodes = self.raw_nodes(container, key).await?;
        nodes.retain(|node| node.key == key);
        Ok(nodes)
    }

    async fn raw_nodes(
        &self,
        container: &ContainerId,
        prefix: &str,
    ) -> LayerResult<Vec<VersionNode>> {
        let nodes = self
            .client
            .list(container, TreeKind::Version, prefix)
            .await?;
        Ok(nodes.into_iter().filter_map(version_of).collect())
    }
}

fn version_of(node: TreeNode) -> Option<VersionNode> {
    match node.payload {
        NodePayload::Version(meta) => Some(VersionNode {
            id: node.id,
            key: node.key,
            meta,
        }),
        other => {
            warn!(id = %node.id, payload = ?other, "unexpected payload in version tree");
            None
        }
    }
}

/// Key ascending, then newest first.
fn listing_order(a: &VersionNode, b: &VersionNode) -> Ordering {
    a.key.cmp(&b.key).then_with(|| b.recency_cmp(a))
}

/// Keep the newest node of every key, ordered by key.
#[must_use]
pub fn reduce_latest(mut nodes: Vec<VersionNode>) -> Vec<VersionNode> {
    nodes.sort_by(listing_order);
    nodes.dedup_by(|later, first| later.key == first.key);
    nodes
}

/// Keep every live version, ordered by key and then newest first. Of the
/// unversioned nodes of a key only the newest survives.
#[must_use]
pub fn reduce_history(mut nodes: Vec<VersionNode>) -> Vec<VersionNode> {
    nodes.sort_by(listing_order);
    let mut out: Vec<VersionNode> = Vec::with_capacity(nodes.len());
    let mut seen_unversioned: Option<String> = None;
    for node in nodes {
        if node.is_unversioned() {
            if seen_unversioned.as_deref() == Some(node.key.as_str()) {
                continue;
            }
            seen_unversioned = Some(node.key.clone());
        }
        out.push(node);
    }
    out
}
