//! Multipart upload state.
//!
//! Uploads and their parts live in the container's system tree and are
//! therefore invisible to listings until completion commits a version node.
//!
//! System-tree layout:
//!
//! - `upload/{key}` holds one [`UploadMeta`] node per in-progress upload
//! - `part/{upload_id}/{key}` holds one [`PartMeta`] node per uploaded part
//!
//! Re-uploading a part number appends a new node; readers keep the node with
//! the highest ID and the superseded node is removed best-effort.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use bytes::BytesMut;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use treegate_core::{ContainerId, ContentId, NodeId, UserId};

use super::index::VersionIndex;
use super::node::{VersionMeta, VersionNode, VersionState};
use crate::error::{LayerError, LayerResult};
use crate::storage::ContentStore;
use crate::tree::{NodePayload, TreeClient, TreeKind, TreeNode};
use crate::utils::{generate_upload_id, key_has_prefix, timestamp_micros};

/// Highest part number a multipart upload accepts.
pub const MAX_PART_NUMBER: u32 = 10_000;

const UPLOAD_PREFIX: &str = "upload/";
const PART_PREFIX: &str = "part/";

/// Upload body as persisted in the system tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMeta {
    /// Upload ID handed to the client.
    pub upload_id: String,
    /// Who initiated the upload.
    pub owner: UserId,
    /// When the upload was initiated.
    pub created: DateTime<Utc>,
    /// User metadata captured at initiation.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Part body as persisted in the system tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartMeta {
    /// Upload the part belongs to.
    pub upload_id: String,
    /// Part number, 1 to [`MAX_PART_NUMBER`].
    pub number: u32,
    /// Payload of the part.
    pub content_id: ContentId,
}

/// An in-progress multipart upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipartUpload {
    /// System-tree node holding the upload.
    pub id: NodeId,
    /// Object key the upload will create.
    pub key: String,
    /// Upload ID, unique per key.
    pub upload_id: String,
    /// Who initiated the upload.
    pub owner: UserId,
    /// When the upload was initiated.
    pub created: DateTime<Utc>,
    /// User metadata captured at initiation.
    pub metadata: BTreeMap<String, String>,
}

/// One uploaded part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartRecord {
    /// Object key of the upload.
    pub key: String,
    /// Upload the part belongs to.
    pub upload_id: String,
    /// Part number.
    pub number: u32,
    /// Payload of the part.
    pub content_id: ContentId,
}

type CompletionKey = (ContainerId, String, String);

/// In-progress uploads and their parts.
#[derive(Debug)]
pub struct MultipartState {
    client: TreeClient,
    index: VersionIndex,
    content: Arc<dyn ContentStore>,
    completions: DashMap<CompletionKey, Arc<tokio::sync::Mutex<()>>>,
}

impl MultipartState {
    /// Create multipart state over the given tree client, version index, and
    /// content store.
    #[must_use]
    pub fn new(client: TreeClient, index: VersionIndex, content: Arc<dyn ContentStore>) -> Self {
        Self {
            client,
            index,
            content,
            completions: DashMap::new(),
        }
    }

    /// Start a new upload for `key` with a fresh upload ID.
    pub async fn begin_upload(
        &self,
        container: &ContainerId,
        key: &str,
        owner: UserId,
        metadata: BTreeMap<String, String>,
    ) -> LayerResult<MultipartUpload> {
        let meta = UploadMeta {
            upload_id: generate_upload_id(),
            owner,
            created: Utc::now(),
            metadata,
        };
        let id = self
            .client
            .add(
                container,
                TreeKind::System,
                &upload_key(key),
                NodePayload::Upload(meta.clone()),
            )
            .await?;
        info!(container = %container, key, upload_id = %meta.upload_id, "began multipart upload");
        Ok(upload_from(id, key.to_owned(), meta))
    }

    /// The in-progress upload `upload_id` of `key`, if any.
    pub async fn find_upload(
        &self,
        container: &ContainerId,
        key: &str,
        upload_id: &str,
    ) -> LayerResult<Option<MultipartUpload>> {
        let node_key = upload_key(key);
        let nodes = self
            .client
            .list(container, TreeKind::System, &node_key)
            .await?;
        Ok(nodes.into_iter().find_map(|node| match node.payload {
            NodePayload::Upload(meta) if node.key == node_key && meta.upload_id == upload_id => {
                Some(upload_from(node.id, key.to_owned(), meta))
            }
            _ => None,
        }))
    }

    /// Record part `number` of an upload. The last write for a number wins.
    pub async fn put_part(
        &self,
        container: &ContainerId,
        key: &str,
        upload_id: &str,
        number: u32,
        content_id: ContentId,
    ) -> LayerResult<PartRecord> {
        validate_part_number(number)?;
        self.require_upload(container, key, upload_id).await?;

        let node_key = part_key(key, upload_id);
        let id = self
            .client
            .add(
                container,
                TreeKind::System,
                &node_key,
                NodePayload::Part(PartMeta {
                    upload_id: upload_id.to_owned(),
                    number,
                    content_id,
                }),
            )
            .await?;
        debug!(container = %container, key, upload_id, number, %id, "stored part");

        for (stale, _) in self
            .part_nodes(container, key, upload_id)
            .await?
            .into_iter()
            .filter(|(node, meta)| meta.number == number && *node < id)
        {
            self.client
                .remove_quietly(container, TreeKind::System, stale)
                .await;
        }

        Ok(PartRecord {
            key: key.to_owned(),
            upload_id: upload_id.to_owned(),
            number,
            content_id,
        })
    }

    /// Parts of an upload, one per number, in ascending order.
    pub async fn list_parts(
        &self,
        container: &ContainerId,
        key: &str,
        upload_id: &str,
    ) -> LayerResult<Vec<PartRecord>> {
        self.require_upload(container, key, upload_id).await?;
        Ok(self
            .current_parts(container, key, upload_id)
            .await?
            .into_iter()
            .map(|(_, meta)| PartRecord {
                key: key.to_owned(),
                upload_id: meta.upload_id,
                number: meta.number,
                content_id: meta.content_id,
            })
            .collect())
    }

    /// In-progress uploads whose key starts with `prefix`, ordered by key and
    /// then initiation time.
    pub async fn list_uploads(
        &self,
        container: &ContainerId,
        prefix: &str,
    ) -> LayerResult<Vec<MultipartUpload>> {
        let nodes = self
            .client
            .list(container, TreeKind::System, &upload_key(prefix))
            .await?;
        let mut uploads: Vec<MultipartUpload> = nodes
            .into_iter()
            .filter_map(|node| {
                let key = node.key.strip_prefix(UPLOAD_PREFIX)?.to_owned();
                match node.payload {
                    NodePayload::Upload(meta) if key_has_prefix(&key, prefix) => {
                        Some(upload_from(node.id, key, meta))
                    }
                    _ => None,
                }
            })
            .collect();
        uploads.sort_by(|a, b| a.key.cmp(&b.key).then(a.created.cmp(&b.created)));
        Ok(uploads)
    }

    /// Assemble the parts of an upload in ascending order, commit the result
    /// as a new version of `key`, and remove the upload and its parts.
    ///
    /// Completion is idempotent: the committed version records the upload
    /// ID, so a retry after a partial failure finds it, finishes the cleanup,
    /// and returns the same version instead of committing again.
    ///
    /// On [`LayerError::MissingParts`], [`LayerError::InvalidPartOrder`], and
    /// [`LayerError::InvalidPart`] nothing is committed and the upload stays
    /// pending.
    pub async fn complete(
        &self,
        container: &ContainerId,
        key: &str,
        upload_id: &str,
        unversioned: bool,
    ) -> LayerResult<VersionNode> {
        let completion_key = (container.clone(), key.to_owned(), upload_id.to_owned());
        let lock = self
            .completions
            .entry(completion_key.clone())
            .or_default()
            .clone();
        let result = {
            let _guard = lock.lock().await;
            self.complete_exclusive(container, key, upload_id, unversioned)
                .await
        };
        self.completions
            .remove_if(&completion_key, |_, held| Arc::strong_count(held) <= 2);
        result
    }

    async fn complete_exclusive(
        &self,
        container: &ContainerId,
        key: &str,
        upload_id: &str,
        unversioned: bool,
    ) -> LayerResult<VersionNode> {
        let upload = self.find_upload(container, key, upload_id).await?;
        let parts = self.current_parts(container, key, upload_id).await?;

        if let Some(committed) = self.index.committed_upload(container, key, upload_id).await? {
            debug!(container = %container, key, upload_id, id = %committed.id, "upload already committed");
            self.cleanup(container, upload.as_ref(), &parts).await?;
            return Ok(committed);
        }

        let Some(upload) = upload else {
            return Err(LayerError::NoSuchUpload {
                upload_id: upload_id.to_owned(),
            });
        };
        if parts.is_empty() {
            return Err(LayerError::MissingParts {
                upload_id: upload_id.to_owned(),
            });
        }
        if let Some(missing) = first_gap(parts.iter().map(|(_, meta)| meta.number)) {
            return Err(LayerError::InvalidPartOrder {
                upload_id: upload_id.to_owned(),
                missing,
            });
        }

        let mut combined = BytesMut::new();
        for (_, part) in &parts {
            let data = self
                .content
                .get(&part.content_id)
                .await?
                .ok_or(LayerError::InvalidPart {
                    number: part.number,
                })?;
            combined.extend_from_slice(&data);
        }
        let size = combined.len();
        let content_id = self.content.put(combined.freeze()).await?;

        let node = self
            .index
            .append(
                container,
                key,
                VersionMeta {
                    timestamp: timestamp_micros(),
                    owner: upload.owner.clone(),
                    state: VersionState::Content { content_id },
                    unversioned,
                    upload_id: Some(upload_id.to_owned()),
                },
            )
            .await?;
        info!(
            container = %container,
            key,
            upload_id,
            parts = parts.len(),
            size,
            id = %node.id,
            "completed multipart upload"
        );

        self.cleanup(container, Some(&upload), &parts).await?;
        Ok(node)
    }

    /// Drop an upload and its parts without committing anything.
    pub async fn abort(
        &self,
        container: &ContainerId,
        key: &str,
        upload_id: &str,
    ) -> LayerResult<()> {
        let upload = self.require_upload(container, key, upload_id).await?;
        let parts = self.part_nodes(container, key, upload_id).await?;
        self.cleanup(container, Some(&upload), &parts).await?;
        info!(container = %container, key, upload_id, "aborted multipart upload");
        Ok(())
    }

    async fn require_upload(
        &self,
        container: &ContainerId,
        key: &str,
        upload_id: &str,
    ) -> LayerResult<MultipartUpload> {
        self.find_upload(container, key, upload_id)
            .await?
            .ok_or_else(|| LayerError::NoSuchUpload {
                upload_id: upload_id.to_owned(),
            })
    }

    /// Every part node of an upload, superseded ones included.
    async fn part_nodes(
        &self,
        container: &ContainerId,
        key: &str,
        upload_id: &str,
    ) -> LayerResult<Vec<(NodeId, PartMeta)>> {
        let node_key = part_key(key, upload_id);
        let nodes = self
            .client
            .list(container, TreeKind::System, &node_key)
            .await?;
        Ok(nodes
            .into_iter()
            .filter(|node| node.key == node_key)
            .filter_map(|TreeNode { id, payload, .. }| match payload {
                NodePayload::Part(meta) if meta.upload_id == upload_id => Some((id, meta)),
                _ => None,
            })
            .collect())
    }

    /// The winning node of every part number, ascending by number.
    async fn current_parts(
        &self,
        container: &ContainerId,
        key: &str,
        upload_id: &str,
    ) -> LayerResult<Vec<(NodeId, PartMeta)>> {
        let mut latest: HashMap<u32, (NodeId, PartMeta)> = HashMap::new();
        for (id, meta) in self.part_nodes(container, key, upload_id).await? {
            match latest.get(&meta.number) {
                Some((current, _)) if *current > id => {}
                _ => {
                    latest.insert(meta.number, (id, meta));
                }
            }
        }
        let mut parts: Vec<_> = latest.into_values().collect();
        parts.sort_by_key(|(_, meta)| meta.number);
        Ok(parts)
    }

    async fn cleanup(
        &self,
        container: &ContainerId,
        upload: Option<&MultipartUpload>,
        parts: &[(NodeId, PartMeta)],
    ) -> LayerResult<()> {
        for (id, _) in parts {
            self.client.remove(container, TreeKind::System, *id).await?;
        }
        if let Some(upload) = upload {
            self.client
                .remove(container, TreeKind::System, upload.id)
                .await?;
        }
        Ok(())
    }
}

fn upload_key(key: &str) -> String {
    format!("{UPLOAD_PREFIX}{key}")
}

fn part_key(key: &str, upload_id: &str) -> String {
    format!("{PART_PREFIX}{upload_id}/{key}")
}

fn upload_from(id: NodeId, key: String, meta: UploadMeta) -> MultipartUpload {
    MultipartUpload {
        id,
        key,
        upload_id: meta.upload_id,
        owner: meta.owner,
        created: meta.created,
        metadata: meta.metadata,
    }
}

fn validate_part_number(number: u32) -> LayerResult<()> {
    if (1..=MAX_PART_NUMBER).contains(&number) {
        Ok(())
    } else {
        Err(LayerError::InvalidArgument {
            message: format!("Part number must be an integer between 1 and {MAX_PART_NUMBER}"),
        })
    }
}

/// First missing number of an ascending sequence expected to run 1, 2, 3, ...
fn first_gap(numbers: impl IntoIterator<Item = u32>) -> Option<u32> {
    (1u32..)
        .zip(numbers)
        .find(|(expected, actual)| expected != actual)
        .map(|(expected, _)| expected)
}
