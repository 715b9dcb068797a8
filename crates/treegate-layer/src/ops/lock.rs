//! Object lock operation handlers.
//!
//! Implements `put_object_retention`, `remove_object_retention`,
//! `put_object_legal_hold`, and `get_object_lock`. Every handler first checks
//! that the addressed version exists for the key.

use chrono::{DateTime, Utc};
use treegate_core::{ContainerId, NodeId};

use crate::error::LayerResult;
use crate::provider::ObjectLayer;
use crate::state::LockRecord;

impl ObjectLayer {
    /// Set or extend the retention of a version.
    pub async fn put_object_retention(
        &self,
        container: &ContainerId,
        key: &str,
        version: NodeId,
        until: DateTime<Utc>,
        compliance: bool,
        now: DateTime<Utc>,
    ) -> LayerResult<LockRecord> {
        self.version_node(container, key, version).await?;
        self.locks
            .apply_retention(container, version, until, compliance, now)
            .await
    }

    /// Clear the retention of a version.
    pub async fn remove_object_retention(
        &self,
        container: &ContainerId,
        key: &str,
        version: NodeId,
        now: DateTime<Utc>,
    ) -> LayerResult<LockRecord> {
        self.version_node(container, key, version).await?;
        self.locks.remove_retention(container, version, now).await
    }

    /// Turn the legal hold of a version on or off.
    pub async fn put_object_legal_hold(
        &self,
        container: &ContainerId,
        key: &str,
        version: NodeId,
        on: bool,
    ) -> LayerResult<LockRecord> {
        self.version_node(container, key, version).await?;
        self.locks.apply_legal_hold(container, version, on).await
    }

    /// Lock annotations of a version, if any were ever set.
    pub async fn get_object_lock(
        &self,
        container: &ContainerId,
        key: &str,
        version: NodeId,
    ) -> LayerResult<Option<LockRecord>> {
        self.version_node(container, key, version).await?;
        self.locks.get_lock(container, version).await
    }
}
