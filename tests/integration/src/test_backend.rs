//! Tree-service failure integration tests.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use treegate_layer::{LayerConfig, LayerError};

    use crate::{Harness, owner};

    #[tokio::test]
    async fn test_should_surface_outage_as_retryable() {
        let h = Harness::default();
        h.put("k", "one").await;
        h.tree.set_available(false);

        let err = h.layer.get_object(&h.container, "k").await.unwrap_err();
        assert!(matches!(err, LayerError::BackendUnavailable { .. }));
        assert!(err.is_retryable());

        let err = h
            .layer
            .put_object(&h.container, "k", Bytes::from("two"), owner())
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        h.tree.set_available(true);
        assert_eq!(h.read("k").await, "one");
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_time_out_slow_tree() {
        let h = Harness::with_config(
            LayerConfig::builder()
                .request_timeout(Duration::from_secs(1))
                .build(),
        );
        h.tree.set_latency(Duration::from_secs(5));

        let err = h.layer.list_objects(&h.container, "").await.unwrap_err();
        assert!(matches!(err, LayerError::BackendUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_should_not_cache_failed_listing() {
        let h = Harness::default();
        h.put("a/1", "one").await;
        h.tree.set_available(false);
        assert!(h.layer.list_objects(&h.container, "a/").await.is_err());
        assert!(h.layer.listing_cache().is_empty());

        h.tree.set_available(true);
        assert_eq!(h.layer.list_objects(&h.container, "a/").await.unwrap().len(), 1);
    }
}
