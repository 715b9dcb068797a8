//! Object operation handlers.
//!
//! Implements `put_object`, `get_object`, `head_object`,
//! `get_object_version`, `delete_object`, and `delete_object_version`.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use treegate_core::{ContainerId, NodeId, UserId};

use crate::error::{LayerError, LayerResult};
use crate::info::ObjectInfo;
use crate::provider::ObjectLayer;
use crate::state::VersionNode;
use crate::storage::{ContentStore, fetch_required};
use crate::utils::{time_of, validate_object_key};

impl ObjectLayer {
    /// Store `payload` as a new version of `key`.
    ///
    /// In a container that is not versioning-enabled the new version replaces
    /// the live one.
    pub async fn put_object(
        &self,
        container: &ContainerId,
        key: &str,
        payload: Bytes,
        owner: UserId,
    ) -> LayerResult<ObjectInfo> {
        validate_object_key(key)?;
        let size = payload.len() as u64;
        let content_id = self.content.put(payload).await?;
        let unversioned = self.settings_of(container).versioning().writes_unversioned();

        let node = self
            .index
            .create_version(container, key, content_id, owner, unversioned)
            .await?;
        self.record_write(container, &node);
        debug!(container = %container, key, version = %node.id, size, "put object");

        Ok(ObjectInfo {
            version: node.id,
            key: node.key.clone(),
            content_id,
            size,
            created: time_of(node.timestamp()),
            owner: node.owner().clone(),
        })
    }

    /// The live version of `key` and its payload.
    ///
    /// # Errors
    ///
    /// [`LayerError::NoSuchKey`] if the key was never written or its newest
    /// version is a delete marker.
    pub async fn get_object(
        &self,
        container: &ContainerId,
        key: &str,
    ) -> LayerResult<(ObjectInfo, Bytes)> {
        let node = self.live_version(container, key).await?;
        self.read_version(&node).await
    }

    /// The live version of `key`, without its payload.
    pub async fn head_object(&self, container: &ContainerId, key: &str) -> LayerResult<ObjectInfo> {
        let node = self.live_version(container, key).await?;
        self.object_info(&node)
            .await?
            .ok_or_else(|| missing_payload(&node))
    }

    /// One specific version of `key` and its payload.
    ///
    /// # Errors
    ///
    /// [`LayerError::NoSuchVersion`] if the version does not exist for the
    /// key, [`LayerError::NoSuchKey`] if it is a delete marker.
    pub async fn get_object_version(
        &self,
        container: &ContainerId,
        key: &str,
        version: NodeId,
    ) -> LayerResult<(ObjectInfo, Bytes)> {
        let node = self.version_node(container, key, version).await?;
        if node.is_delete_marker() {
            return Err(LayerError::NoSuchKey {
                key: key.to_owned(),
            });
        }
        self.read_version(&node).await
    }

    /// Hide `key` behind a new delete marker. Older versions are kept and
    /// remain reachable by version ID.
    pub async fn delete_object(
        &self,
        container: &ContainerId,
        key: &str,
        owner: UserId,
    ) -> LayerResult<VersionNode> {
        validate_object_key(key)?;
        let marker = self
            .index
            .create_delete_marker(container, key, owner)
            .await?;
        self.record_write(container, &marker);
        debug!(container = %container, key, version = %marker.id, "created delete marker");
        Ok(marker)
    }

    /// Permanently remove one version of `key`.
    ///
    /// # Errors
    ///
    /// [`LayerError::RetentionLocked`] if a legal hold or an unexpired
    /// retention protects the version at `now`; nothing is removed.
    pub async fn delete_object_version(
        &self,
        container: &ContainerId,
        key: &str,
        version: NodeId,
        now: DateTime<Utc>,
    ) -> LayerResult<VersionNode> {
        let node = self.version_node(container, key, version).await?;
        if let Some(lock) = self.locks.get_lock(container, version).await? {
            if !lock.is_deletable(now) {
                warn!(container = %container, key, %version, "refused to delete locked version");
                return Err(LayerError::RetentionLocked {
                    version,
                    until: lock.until_date,
                });
            }
        }

        self.index.remove_version(container, &node).await?;
        self.locks.forget(container, version).await?;
        self.record_removal(container, &node);
        debug!(container = %container, key, %version, "deleted object version");
        Ok(node)
    }

    // -----------------------------------------------------------------------
    // Shared helpers
    // -----------------------------------------------------------------------

    async fn live_version(&self, container: &ContainerId, key: &str) -> LayerResult<VersionNode> {
        validate_object_key(key)?;
        self.index
            .resolve_latest(container, key)
            .await?
            .ok_or_else(|| LayerError::NoSuchKey {
                key: key.to_owned(),
            })
    }

    /// A version of `key` by ID, through the node cache.
    pub(crate) async fn version_node(
        &self,
        container: &ContainerId,
        key: &str,
        version: NodeId,
    ) -> LayerResult<VersionNode> {
        if let Some(node) = self.node_cache.get(container, version) {
            if node.key == key {
                return Ok(node);
            }
        }
        let node = self
            .index
            .get_version(container, key, version)
            .await?
            .ok_or_else(|| LayerError::NoSuchVersion {
                key: key.to_owned(),
                version,
            })?;
        self.node_cache.put(container, node.clone());
        Ok(node)
    }

    /// Resolve a content version against the content store. `None` for
    /// delete markers and for payloads the store does not hold.
    pub(crate) async fn object_info(&self, node: &VersionNode) -> LayerResult<Option<ObjectInfo>> {
        let Some(content_id) = node.content_id() else {
            return Ok(None);
        };
        let Some(header) = self.content.head(content_id).await? else {
            warn!(key = %node.key, version = %node.id, %content_id, "version payload not found");
            return Ok(None);
        };
        Ok(ObjectInfo::resolve(node, &header))
    }

    async fn read_version(&self, node: &VersionNode) -> LayerResult<(ObjectInfo, Bytes)> {
        let info = self
            .object_info(node)
            .await?
            .ok_or_else(|| missing_payload(node))?;
        let data = fetch_required(self.content.as_ref(), &info.content_id).await?;
        Ok((info, data))
    }
}

fn missing_payload(node: &VersionNode) -> LayerError {
    LayerError::Internal(anyhow::anyhow!(
        "payload of version {} of {} is missing",
        node.id,
        node.key
    ))
}
