//! Object lock state: legal holds and retention periods on object versions.
//!
//! Lock annotations are stored as `lock/{version}` nodes in the container's
//! system tree. The annotations themselves (who set what, and when) are
//! written to the content store and the [`LockRecord`] references them by
//! content ID.
//!
//! A compliance-mode retention cannot be relaxed by anyone before it expires:
//! the retain-until date cannot move earlier, the mode cannot be downgraded,
//! and the retention cannot be removed. A legal hold can always be toggled.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use treegate_core::{ContainerId, ContentId, NodeId};

use crate::error::{LayerError, LayerResult};
use crate::storage::ContentStore;
use crate::tree::{NodePayload, TreeClient, TreeKind};

const LOCK_PREFIX: &str = "lock/";

/// Lock annotations of one object version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockRecord {
    /// Version node the record applies to.
    pub id: NodeId,
    /// Legal-hold annotation, present while the hold is on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_hold_id: Option<ContentId>,
    /// Retention annotation, present while a retention is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_id: Option<ContentId>,
    /// Retain-until date of the retention.
    pub until_date: Option<DateTime<Utc>>,
    /// Whether the retention is in compliance mode.
    pub compliance: bool,
}

impl LockRecord {
    /// An empty record for `id`.
    #[must_use]
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            legal_hold_id: None,
            retention_id: None,
            until_date: None,
            compliance: false,
        }
    }

    /// Whether a legal hold is on.
    #[must_use]
    pub fn has_legal_hold(&self) -> bool {
        self.legal_hold_id.is_some()
    }

    /// Whether a retention is in force at `now`.
    #[must_use]
    pub fn is_retained(&self, now: DateTime<Utc>) -> bool {
        self.retention_id.is_some() && self.until_date.is_some_and(|until| now < until)
    }

    /// Whether the version may be removed at `now`.
    #[must_use]
    pub fn is_deletable(&self, now: DateTime<Utc>) -> bool {
        !self.has_legal_hold() && !self.is_retained(now)
    }

    /// Reject a retention change that relaxes an active compliance lock.
    /// `until = None` stands for removing the retention.
    fn check_retention_change(
        &self,
        until: Option<DateTime<Utc>>,
        compliance: bool,
        now: DateTime<Utc>,
    ) -> LayerResult<()> {
        if !self.compliance || !self.is_retained(now) {
            return Ok(());
        }
        let shortened = match (until, self.until_date) {
            (Some(requested), Some(current)) => requested < current,
            (None, _) => true,
            (Some(_), None) => false,
        };
        if shortened || !compliance {
            return Err(LayerError::RetentionLocked {
                version: self.id,
                until: self.until_date,
            });
        }
        Ok(())
    }
}

/// Annotation objects written to the content store.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum LockObject {
    LegalHold {
        version: NodeId,
        created: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    Retention {
        version: NodeId,
        until_date: DateTime<Utc>,
        compliance: bool,
        created: DateTime<Utc>,
    },
}

/// Legal-hold and retention annotations on object versions.
#[derive(Debug)]
pub struct LockState {
    client: TreeClient,
    content: Arc<dyn ContentStore>,
}

impl LockState {
    /// Create lock state over the given tree client and content store.
    #[must_use]
    pub fn new(client: TreeClient, content: Arc<dyn ContentStore>) -> Self {
        Self { client, content }
    }

    /// The lock record of `version`, if any annotation was ever set.
    pub async fn get_lock(
        &self,
        container: &ContainerId,
        version: NodeId,
    ) -> LayerResult<Option<LockRecord>> {
        Ok(self
            .lock_nodes(container, version)
            .await?
            .into_iter()
            .max_by_key(|(id, _)| *id)
            .map(|(_, record)| record))
    }

    /// Set or extend the retention of `version`.
    pub async fn apply_retention(
        &self,
        container: &ContainerId,
        version: NodeId,
        until: DateTime<Utc>,
        compliance: bool,
        now: DateTime<Utc>,
    ) -> LayerResult<LockRecord> {
        let mut record = self.current(container, version).await?;
        record.check_retention_change(Some(until), compliance, now)?;

        let annotation = self
            .write_annotation(&LockObject::Retention {
                version,
                until_date: until,
                compliance,
                created: now,
            })
            .await?;
        record.retention_id = Some(annotation);
        record.until_date = Some(until);
        record.compliance = compliance;

        debug!(container = %container, %version, %until, compliance, "applied retention");
        self.store(container, record).await
    }

    /// Clear the retention of `version`.
    pub async fn remove_retention(
        &self,
        container: &ContainerId,
        version: NodeId,
        now: DateTime<Utc>,
    ) -> LayerResult<LockRecord> {
        let mut record = self.current(container, version).await?;
        record.check_retention_change(None, false, now)?;

        record.retention_id = None;
        record.until_date = None;
        record.compliance = false;

        debug!(container = %container, %version, "removed retention");
        self.store(container, record).await
    }

    /// Turn the legal hold of `version` on or off.
    pub async fn apply_legal_hold(
        &self,
        container: &ContainerId,
        version: NodeId,
        on: bool,
    ) -> LayerResult<LockRecord> {
        let mut record = self.current(container, version).await?;
        record.legal_hold_id = if on {
            Some(
                self.write_annotation(&LockObject::LegalHold {
                    version,
                    created: Utc::now(),
                })
                .await?,
            )
        } else {
            None
        };

        debug!(container = %container, %version, on, "applied legal hold");
        self.store(container, record).await
    }

    /// Whether `version` may be removed at `now`.
    pub async fn is_deletable(
        &self,
        container: &ContainerId,
        version: NodeId,
        now: DateTime<Utc>,
    ) -> LayerResult<bool> {
        Ok(self
            .get_lock(container, version)
            .await?
            .is_none_or(|record| record.is_deletable(now)))
    }

    /// Drop every lock node of a removed version.
    pub async fn forget(&self, container: &ContainerId, version: NodeId) -> LayerResult<()> {
        for (id, _) in self.lock_nodes(container, version).await? {
            self.client
                .remove_quietly(container, TreeKind::System, id)
                .await;
        }
        debug!(container = %container, %version, "forgot lock annotations");
        Ok(())
    }

    async fn current(&self, container: &ContainerId, version: NodeId) -> LayerResult<LockRecord> {
        Ok(self
            .get_lock(container, version)
            .await?
            .unwrap_or_else(|| LockRecord::new(version)))
    }

    async fn write_annotation(&self, object: &LockObject) -> LayerResult<ContentId> {
        let body = serde_json::to_vec(object)
            .map_err(|e| anyhow::anyhow!("failed to encode lock annotation: {e}"))?;
        self.content.put(Bytes::from(body)).await
    }

    async fn store(&self, container: &ContainerId, record: LockRecord) -> LayerResult<LockRecord> {
        let version = record.id;
        let previous = self.lock_nodes(container, version).await?;
        let id = self
            .client
            .add(
                container,
                TreeKind::System,
                &lock_key(version),
                NodePayload::Lock(record.clone()),
            )
            .await?;
        for (stale, _) in previous.into_iter().filter(|(stale, _)| *stale < id) {
            self.client
                .remove_quietly(container, TreeKind::System, stale)
                .await;
        }
        Ok(record)
    }

    async fn lock_nodes(
        &self,
        container: &ContainerId,
        version: NodeId,
    ) -> LayerResult<Vec<(NodeId, LockRecord)>> {
        let node_key = lock_key(version);
        let nodes = self
            .client
            .list(container, TreeKind::System, &node_key)
            .await?;
        Ok(nodes
            .into_iter()
            .filter(|node| node.key == node_key)
            .filter_map(|node| match node.payload {
                NodePayload::Lock(record) if record.id == version => Some((node.id, record)),
                other => {
                    warn!(id = %node.id, payload = ?other, "unexpected payload under lock key");
                    None
                }
            })
            .collect())
    }
}

fn lock_key(version: NodeId) -> String {
    format!("{LOCK_PREFIX}{version}")
}
