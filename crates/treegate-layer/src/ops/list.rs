//! Listing operation handlers.
//!
//! Implements `list_objects` and `list_object_versions`. Both read through
//! the listing cache: a hit is resolved to version nodes from the node cache,
//! a miss (or a hit that cannot be resolved) enumerates the version index and
//! writes the result back.

use tracing::{trace, warn};
use treegate_core::ContainerId;

use crate::cache::ListingKey;
use crate::error::LayerResult;
use crate::info::{ExtendedVersionInfo, ObjectInfo};
use crate::provider::ObjectLayer;
use crate::state::VersionNode;

impl ObjectLayer {
    /// The live version of every key under `prefix`, ordered by key. Keys
    /// whose newest version is a delete marker are omitted.
    pub async fn list_objects(
        &self,
        container: &ContainerId,
        prefix: &str,
    ) -> LayerResult<Vec<ObjectInfo>> {
        let nodes = self.listing(container, prefix, true).await?;
        let mut objects = Vec::with_capacity(nodes.len());
        for node in nodes.iter().filter(|node| !node.is_delete_marker()) {
            if let Some(info) = self.object_info(node).await? {
                objects.push(info);
            }
        }
        Ok(objects)
    }

    /// Every version under `prefix`, delete markers included, ordered by key
    /// and then newest first.
    pub async fn list_object_versions(
        &self,
        container: &ContainerId,
        prefix: &str,
    ) -> LayerResult<Vec<ExtendedVersionInfo>> {
        let nodes = self.listing(container, prefix, false).await?;
        let mut versions = Vec::with_capacity(nodes.len());
        let mut previous_key: Option<&str> = None;
        for node in &nodes {
            let is_latest = previous_key != Some(node.key.as_str());
            previous_key = Some(node.key.as_str());
            versions.push(ExtendedVersionInfo {
                object: self.object_info(node).await?,
                node: node.clone(),
                is_latest,
            });
        }
        Ok(versions)
    }

    /// The version nodes of a prefix listing, through both caches.
    pub(crate) async fn listing(
        &self,
        container: &ContainerId,
        prefix: &str,
        latest_only: bool,
    ) -> LayerResult<Vec<VersionNode>> {
        let key = ListingKey::new(container.clone(), prefix, latest_only);
        if let Some(ids) = self.listing_cache.get(&key) {
            if let Some(nodes) = self.node_cache.get_all(container, &ids) {
                return Ok(nodes);
            }
            warn!(container = %container, prefix, latest_only, "cached listing references unknown nodes, treating as miss");
            self.listing_cache.remove(&key);
        }

        let nodes = self
            .index
            .list_by_prefix(container, prefix, latest_only)
            .await?;
        for node in &nodes {
            self.node_cache.put(container, node.clone());
        }
        let ids = nodes.iter().map(|node| node.id).collect();
        if let Err(e) = self.listing_cache.put(key, ids) {
            trace!(error = %e, "listing not cached");
        }
        Ok(nodes)
    }
}
