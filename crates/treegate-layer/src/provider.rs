//! The object layer.
//!
//! [`ObjectLayer`] owns the version index, the multipart and lock state, both
//! caches, and the content store. Individual operations are implemented in
//! the [`crate::ops`] submodules as inherent methods on [`ObjectLayer`].

use std::sync::Arc;

use tracing::info;
use treegate_core::{ContainerId, ContainerMap};

use crate::cache::{ListingCache, NodeCache};
use crate::config::LayerConfig;
use crate::state::{ContainerSettings, LockState, MultipartState, VersionIndex, VersionNode};
use crate::storage::{ContentStore, InMemoryStorage};
use crate::tree::{MemoryTree, RequestSigner, TreeClient, TreeService};

/// Versioned object layer over a tree service and a content store.
///
/// All shared fields are `Arc`-wrapped so the layer can be shared across
/// request tasks behind an `Arc<ObjectLayer>`.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use treegate_core::{ContainerId, UserId};
/// use treegate_layer::{LayerConfig, ObjectLayer};
///
/// # tokio_test::block_on(async {
/// let layer = ObjectLayer::in_memory(LayerConfig::default());
/// let container = ContainerId::new("C1").unwrap();
///
/// layer
///     .put_object(&container, "a/1", Bytes::from("hello"), UserId::default())
///     .await
///     .unwrap();
/// let (info, data) = layer.get_object(&container, "a/1").await.unwrap();
/// assert_eq!(info.size, 5);
/// assert_eq!(data.as_ref(), b"hello");
/// # });
/// ```
#[derive(Debug)]
pub struct ObjectLayer {
    /// Version history of every key.
    pub(crate) index: VersionIndex,
    /// In-progress multipart uploads.
    pub(crate) multipart: Arc<MultipartState>,
    /// Legal holds and retention.
    pub(crate) locks: Arc<LockState>,
    /// Memoized prefix listings.
    pub(crate) listing_cache: Arc<ListingCache>,
    /// Memoized version nodes.
    pub(crate) node_cache: Arc<NodeCache>,
    /// Payload storage.
    pub(crate) content: Arc<dyn ContentStore>,
    /// Per-container versioning status.
    pub(crate) settings: Arc<ContainerMap<ContainerSettings>>,
    /// Layer configuration.
    pub(crate) config: Arc<LayerConfig>,
}

impl ObjectLayer {
    /// Create a layer over the given tree service and content store. Every
    /// mutating tree request is signed with `signer`.
    #[must_use]
    pub fn new(
        config: LayerConfig,
        tree: Arc<dyn TreeService>,
        content: Arc<dyn ContentStore>,
        signer: RequestSigner,
    ) -> Self {
        info!(
            listing_cache_size = config.listing_cache.size,
            listing_cache_lifetime = ?config.listing_cache.lifetime,
            request_timeout = ?config.request_timeout,
            "creating object layer"
        );
        let client = TreeClient::new(tree, Arc::new(signer), config.request_timeout);
        let index = VersionIndex::new(client.clone());
        Self {
            multipart: Arc::new(MultipartState::new(
                client.clone(),
                index.clone(),
                Arc::clone(&content),
            )),
            locks: Arc::new(LockState::new(client, Arc::clone(&content))),
            index,
            listing_cache: Arc::new(ListingCache::new(config.listing_cache)),
            node_cache: Arc::new(NodeCache::new(config.node_cache)),
            content,
            settings: Arc::new(ContainerMap::new()),
            config: Arc::new(config),
        }
    }

    /// Create a self-contained layer backed by an in-memory tree and content
    /// store, signing with a freshly generated key.
    #[must_use]
    pub fn in_memory(config: LayerConfig) -> Self {
        let content = Arc::new(InMemoryStorage::new(config.max_memory_object_size));
        Self::new(
            config,
            Arc::new(MemoryTree::new()),
            content,
            RequestSigner::generate(),
        )
    }

    /// Returns a reference to the layer configuration.
    #[must_use]
    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    /// Returns a reference to the version index.
    #[must_use]
    pub fn index(&self) -> &VersionIndex {
        &self.index
    }

    /// Returns a reference to the multipart state.
    #[must_use]
    pub fn multipart(&self) -> &MultipartState {
        &self.multipart
    }

    /// Returns a reference to the lock state.
    #[must_use]
    pub fn locks(&self) -> &LockState {
        &self.locks
    }

    /// Returns a reference to the listing cache.
    #[must_use]
    pub fn listing_cache(&self) -> &ListingCache {
        &self.listing_cache
    }

    /// Returns a reference to the node cache.
    #[must_use]
    pub fn node_cache(&self) -> &NodeCache {
        &self.node_cache
    }

    /// Returns a reference to the content store.
    #[must_use]
    pub fn content(&self) -> &dyn ContentStore {
        self.content.as_ref()
    }

    pub(crate) fn settings_of(&self, container: &ContainerId) -> Arc<ContainerSettings> {
        self.settings.get_or_create(container)
    }

    /// Publish a freshly created version: memoize it, then drop every cached
    /// listing it could appear in.
    pub(crate) fn record_write(&self, container: &ContainerId, node: &VersionNode) {
        self.node_cache.put(container, node.clone());
        self.listing_cache
            .invalidate_by_written_key(container, &node.key);
    }

    /// Forget a removed version.
    pub(crate) fn record_removal(&self, container: &ContainerId, node: &VersionNode) {
        self.node_cache.remove(container, node.id);
        self.listing_cache
            .invalidate_by_written_key(container, &node.key);
    }
}
