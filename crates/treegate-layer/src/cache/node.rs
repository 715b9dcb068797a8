//! Version-node memo.

use treegate_core::{ContainerId, NodeId};

use super::LruCache;
use crate::config::CacheConfig;
use crate::state::VersionNode;

/// Memoized `(container, node ID) -> version node`.
///
/// Version nodes are immutable, so an entry only goes stale when its version
/// is removed, and removal evicts it.
#[derive(Debug)]
pub struct NodeCache {
    cache: LruCache<(ContainerId, NodeId), VersionNode>,
}

impl NodeCache {
    /// Create an empty node cache.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            cache: LruCache::new(config),
        }
    }

    /// The memoized node, if present and not expired.
    pub fn get(&self, container: &ContainerId, id: NodeId) -> Option<VersionNode> {
        self.cache.get(&(container.clone(), id))
    }

    /// Resolve every ID in order, or `None` if any of them is missing.
    pub fn get_all(&self, container: &ContainerId, ids: &[NodeId]) -> Option<Vec<VersionNode>> {
        ids.iter().map(|id| self.get(container, *id)).collect()
    }

    /// Memoize a node.
    pub fn put(&self, container: &ContainerId, node: VersionNode) {
        self.cache.insert((container.clone(), node.id), node);
    }

    /// Evict a node.
    pub fn remove(&self, container: &ContainerId, id: NodeId) -> bool {
        self.cache.remove(&(container.clone(), id))
    }

    /// Number of memoized nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether nothing is memoized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
