//! Listing and cache coherence integration tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use treegate_layer::config::CacheConfig;
    use treegate_layer::storage::{ContentStore, InMemoryStorage};
    use treegate_layer::tree::{MemoryTree, RequestSigner, TreeService};
    use treegate_layer::{LayerConfig, ObjectLayer};

    use crate::{Harness, owner};

    #[tokio::test]
    async fn test_should_list_keys_in_order_under_prefix() {
        let h = Harness::default();
        for key in ["photos/b.jpg", "photos/a.jpg", "docs/x.txt", "photos"] {
            h.put(key, "data").await;
        }

        let objects = h.layer.list_objects(&h.container, "photos/").await.unwrap();
        let keys: Vec<_> = objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["photos/a.jpg", "photos/b.jpg"]);

        let all = h.layer.list_objects(&h.container, "").await.unwrap();
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn test_should_reflect_writes_in_cached_listing() {
        let h = Harness::default();
        h.put("a/1", "one").await;
        assert_eq!(h.layer.list_objects(&h.container, "a/").await.unwrap().len(), 1);
        assert_eq!(h.layer.list_objects(&h.container, "").await.unwrap().len(), 1);

        h.put("a/2", "two").await;
        assert_eq!(h.layer.list_objects(&h.container, "a/").await.unwrap().len(), 2);
        assert_eq!(h.layer.list_objects(&h.container, "").await.unwrap().len(), 2);

        h.layer
            .delete_object(&h.container, "a/1", owner())
            .await
            .unwrap();
        let objects = h.layer.list_objects(&h.container, "a/").await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].key, "a/2");
    }

    #[tokio::test]
    async fn test_should_keep_unrelated_listing_cached() {
        let h = Harness::default();
        h.put("a/1", "one").await;
        h.put("b/1", "one").await;
        h.layer.list_objects(&h.container, "a/").await.unwrap();

        h.put("b/2", "two").await;
        let calls = h.tree.list_calls();
        h.layer.list_objects(&h.container, "a/").await.unwrap();
        assert_eq!(h.tree.list_calls(), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_see_foreign_writes_after_cache_lifetime() {
        let tree = Arc::new(MemoryTree::new());
        let content: Arc<dyn ContentStore> = Arc::new(InMemoryStorage::default());
        let config = LayerConfig::builder()
            .listing_cache(CacheConfig {
                size: 16,
                lifetime: Duration::from_secs(5),
            })
            .build();
        let reader = ObjectLayer::new(
            config.clone(),
            Arc::clone(&tree) as Arc<dyn TreeService>,
            Arc::clone(&content),
            RequestSigner::generate(),
        );
        let writer = ObjectLayer::new(
            config,
            Arc::clone(&tree) as Arc<dyn TreeService>,
            content,
            RequestSigner::generate(),
        );
        let c = treegate_core::ContainerId::new("C1").unwrap();

        writer
            .put_object(&c, "k/1", Bytes::from("one"), owner())
            .await
            .unwrap();
        assert_eq!(reader.list_objects(&c, "k/").await.unwrap().len(), 1);

        writer
            .put_object(&c, "k/2", Bytes::from("two"), owner())
            .await
            .unwrap();
        assert_eq!(reader.list_objects(&c, "k/").await.unwrap().len(), 1);

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(reader.list_objects(&c, "k/").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_should_list_versions_newest_first_per_key() {
        let h = Harness::default();
        h.layer.put_container_versioning(
            &h.container,
            treegate_layer::state::VersioningStatus::Enabled,
        );
        let v1 = h.put("k", "one").await;
        let v2 = h.put("k", "two").await;
        let other = h.put("l", "three").await;

        let versions = h.layer.list_object_versions(&h.container, "").await.unwrap();
        let ids: Vec<_> = versions.iter().map(|v| v.node.id).collect();
        assert_eq!(ids, vec![v2.version, v1.version, other.version]);
        let latest: Vec<_> = versions.iter().map(|v| v.is_latest).collect();
        assert_eq!(latest, vec![true, false, true]);
    }
}
