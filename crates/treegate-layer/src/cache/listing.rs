//! Prefix-listing cache.

use std::sync::Arc;

use tracing::{debug, trace};
use treegate_core::{ContainerId, NodeId};

use super::LruCache;
use crate::config::CacheConfig;
use crate::utils::key_has_prefix;

/// Identity of a cached listing.
///
/// Equality is structural over all three fields. The container ID is used in
/// its encoded form and the prefix is never normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListingKey {
    /// Listed container.
    pub container: ContainerId,
    /// Listed key prefix.
    pub prefix: String,
    /// Whether the listing holds only the latest version per key.
    pub latest_only: bool,
}

impl ListingKey {
    /// Build a listing key.
    #[must_use]
    pub fn new(container: ContainerId, prefix: impl Into<String>, latest_only: bool) -> Self {
        Self {
            container,
            prefix: prefix.into(),
            latest_only,
        }
    }
}

/// Errors local to the listing cache. Callers ignore them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// Empty listings are not cached.
    #[error("empty listing for prefix {prefix:?} in container {container} not cached")]
    EmptyResult {
        /// Container of the rejected entry.
        container: ContainerId,
        /// Prefix of the rejected entry.
        prefix: String,
    },
}

/// Memoized `(container, prefix, latest-only) -> [node ID]` listings.
///
/// Writers call [`ListingCache::invalidate_by_written_key`] after every
/// mutation. A repopulation that raced with the write may still store a
/// listing from before it; such an entry lives at most one lifetime.
#[derive(Debug)]
pub struct ListingCache {
    cache: LruCache<ListingKey, Arc<[NodeId]>>,
}

impl ListingCache {
    /// Create an empty listing cache.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            cache: LruCache::new(config),
        }
    }

    /// The cached node IDs for `key`, or `None` on a miss or expiry.
    pub fn get(&self, key: &ListingKey) -> Option<Arc<[NodeId]>> {
        let hit = self.cache.get(key);
        trace!(container = %key.container, prefix = %key.prefix, latest_only = key.latest_only, hit = hit.is_some(), "listing cache lookup");
        hit
    }

    /// Store a listing.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::EmptyResult`] for an empty listing; nothing is
    /// stored.
    pub fn put(&self, key: ListingKey, ids: Vec<NodeId>) -> Result<(), CacheError> {
        if ids.is_empty() {
            return Err(CacheError::EmptyResult {
                container: key.container,
                prefix: key.prefix,
            });
        }
        self.cache.insert(key, ids.into());
        Ok(())
    }

    /// Drop one listing. Returns whether it was present.
    pub fn remove(&self, key: &ListingKey) -> bool {
        self.cache.remove(key)
    }

    /// Drop every listing of `container` whose prefix is a prefix of
    /// `written_key`, in both latest-only modes. Returns how many were
    /// dropped.
    pub fn invalidate_by_written_key(&self, container: &ContainerId, written_key: &str) -> usize {
        let dropped = self.cache.remove_matching(|key| {
            &key.container == container && key_has_prefix(written_key, &key.prefix)
        });
        if dropped > 0 {
            debug!(container = %container, written_key, dropped, "invalidated cached listings");
        }
        dropped
    }

    /// Number of cached listings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether no listings are cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Drop every listing.
    pub fn clear(&self) {
        self.cache.clear();
    }
}
