//! Content-addressed payload storage.
//!
//! The object layer never stores payload bytes in the tree: a version node
//! only carries the [`ContentId`] of its payload, and the bytes live behind
//! the [`ContentStore`] trait.
//!
//! [`InMemoryStorage`] is the in-process implementation. Payloads below a
//! configurable threshold are kept in memory as [`Bytes`]. Larger payloads are
//! spilled to temporary files on disk, which are removed again when the entry
//! is dropped (via the [`Drop`] implementation on [`StoredData`]).

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::io::AsyncReadExt;
use tracing::{debug, trace, warn};
use treegate_core::ContentId;

use crate::config::DEFAULT_MAX_MEMORY_OBJECT_SIZE;
use crate::error::{LayerError, LayerResult};

/// Metadata about a stored payload, returned by [`ContentStore::head`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentHeader {
    /// Payload size in bytes.
    pub size: u64,
    /// When the payload was first stored.
    pub created: DateTime<Utc>,
}

/// Content-addressed payload store.
///
/// Implementations must be idempotent: putting the same bytes twice yields
/// the same [`ContentId`] and keeps a single copy.
#[async_trait]
pub trait ContentStore: Send + Sync + std::fmt::Debug {
    /// Store a payload and return its content ID.
    async fn put(&self, payload: Bytes) -> LayerResult<ContentId>;

    /// Fetch a payload, or `None` if the store does not hold it.
    async fn get(&self, id: &ContentId) -> LayerResult<Option<Bytes>>;

    /// Fetch payload metadata without reading the bytes.
    async fn head(&self, id: &ContentId) -> LayerResult<Option<ContentHeader>>;
}

// ---------------------------------------------------------------------------
// StoredData
// ---------------------------------------------------------------------------

/// Small payloads are kept in memory. Large payloads are spilled to a
/// temporary file that is removed when the value is dropped.
enum StoredData {
    InMemory {
        data: Bytes,
    },
    OnDisk {
        path: PathBuf,
        size: u64,
    },
}

impl std::fmt::Debug for StoredData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InMemory { data } => f
                .debug_struct("InMemory")
                .field("size", &data.len())
                .finish(),
            Self::OnDisk { path, size } => f
                .debug_struct("OnDisk")
                .field("path", path)
                .field("size", size)
                .finish(),
        }
    }
}

impl Drop for StoredData {
    fn drop(&mut self) {
        if let Self::OnDisk { path, .. } = self {
            if let Err(e) = std::fs::remove_file(path.as_path()) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "failed to remove temp file");
                }
            } else {
                trace!(path = %path.display(), "removed temp file");
            }
        }
    }
}

impl StoredData {
    fn size(&self) -> u64 {
        match self {
            Self::InMemory { data } => data.len() as u64,
            Self::OnDisk { size, .. } => *size,
        }
    }

    async fn read_all(&self) -> LayerResult<Bytes> {
        match self {
            Self::InMemory { data } => Ok(data.clone()),
            Self::OnDisk { path, size } => {
                let mut file = tokio::fs::File::open(path).await.map_err(|e| {
                    anyhow::anyhow!("failed to open temp file {}: {e}", path.display())
                })?;
                let capacity = usize::try_from(*size).unwrap_or(usize::MAX);
                let mut buf = BytesMut::with_capacity(capacity);
                while buf.len() < capacity {
                    let read = file.read_buf(&mut buf).await.map_err(|e| {
                        anyhow::anyhow!("failed to read temp file {}: {e}", path.display())
                    })?;
                    if read == 0 {
                        break;
                    }
                }
                Ok(buf.freeze())
            }
        }
    }
}

#[derive(Debug)]
struct StoredEntry {
    data: StoredData,
    created: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// InMemoryStorage
// ---------------------------------------------------------------------------

/// In-process [`ContentStore`] with spillover to temp files for large payloads.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use treegate_layer::storage::{ContentStore, InMemoryStorage};
///
/// # tokio_test::block_on(async {
/// let storage = InMemoryStorage::new(1024);
/// let id = storage.put(Bytes::from("hello")).await.unwrap();
/// let data = storage.get(&id).await.unwrap().unwrap();
/// assert_eq!(data.as_ref(), b"hello");
/// # });
/// ```
pub struct InMemoryStorage {
    objects: DashMap<ContentId, Arc<StoredEntry>>,
    max_memory_size: usize,
}

impl std::fmt::Debug for InMemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStorage")
            .field("objects_count", &self.objects.len())
            .field("max_memory_size", &self.max_memory_size)
            .finish()
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MEMORY_OBJECT_SIZE)
    }
}

impl InMemoryStorage {
    /// Create a store that spills payloads above `max_memory_size` bytes to disk.
    #[must_use]
    pub fn new(max_memory_size: usize) -> Self {
        debug!(max_memory_size, "creating InMemoryStorage");
        Self {
            objects: DashMap::new(),
            max_memory_size,
        }
    }

    /// Number of distinct payloads held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the store holds no payloads.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Drop a payload. Returns whether it was present.
    pub fn remove(&self, id: &ContentId) -> bool {
        self.objects.remove(id).is_some()
    }

    /// Remove every payload.
    pub fn reset(&self) {
        debug!("resetting content storage");
        self.objects.clear();
    }

    async fn store_data(&self, data: Bytes) -> LayerResult<StoredData> {
        if data.len() > self.max_memory_size {
            self.spill_to_disk(&data).await
        } else {
            Ok(StoredData::InMemory { data })
        }
    }

    async fn spill_to_disk(&self, data: &[u8]) -> LayerResult<StoredData> {
        let size = data.len() as u64;

        // Persisted so the handle does not delete it; StoredData::drop owns cleanup.
        let temp = tempfile::NamedTempFile::new()
            .map_err(|e| anyhow::anyhow!("failed to create temp file: {e}"))?;
        let path = temp.path().to_path_buf();
        temp.persist(&path).map_err(|e| {
            anyhow::anyhow!("failed to persist temp file {}: {e}", path.display())
        })?;

        tokio::fs::write(&path, data).await.map_err(|e| {
            anyhow::anyhow!("failed to write temp file {}: {e}", path.display())
        })?;

        trace!(path = %path.display(), size, "spilled payload to disk");
        Ok(StoredData::OnDisk { path, size })
    }

    fn entry(&self, id: &ContentId) -> Option<Arc<StoredEntry>> {
        self.objects.get(id).map(|e| Arc::clone(e.value()))
    }
}

#[async_trait]
impl ContentStore for InMemoryStorage {
    async fn put(&self, payload: Bytes) -> LayerResult<ContentId> {
        let id = ContentId::compute(&payload);
        if self.objects.contains_key(&id) {
            trace!(content_id = %id, "payload already stored");
            return Ok(id);
        }

        let size = payload.len();
        let data = self.store_data(payload).await?;
        self.objects.entry(id).or_insert_with(|| {
            Arc::new(StoredEntry {
                data,
                created: Utc::now(),
            })
        });
        trace!(content_id = %id, size, "stored payload");
        Ok(id)
    }

    async fn get(&self, id: &ContentId) -> LayerResult<Option<Bytes>> {
        match self.entry(id) {
            Some(entry) => entry.data.read_all().await.map(Some),
            None => Ok(None),
        }
    }

    async fn head(&self, id: &ContentId) -> LayerResult<Option<ContentHeader>> {
        Ok(self.entry(id).map(|entry| ContentHeader {
            size: entry.data.size(),
            created: entry.created,
        }))
    }
}

/// Fetch a payload that a version node references, treating absence as an
/// internal inconsistency.
pub(crate) async fn fetch_required(
    store: &dyn ContentStore,
    id: &ContentId,
) -> LayerResult<Bytes> {
    store
        .get(id)
        .await?
        .ok_or_else(|| LayerError::Internal(anyhow::anyhow!("payload {id} is missing")))
}
