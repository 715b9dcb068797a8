//! Versioning integration tests.

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use treegate_layer::LayerError;
    use treegate_layer::state::VersioningStatus;

    use crate::{Harness, owner};

    #[tokio::test]
    async fn test_should_keep_history_when_versioning_enabled() {
        let h = Harness::default();
        h.layer
            .put_container_versioning(&h.container, VersioningStatus::Enabled);
        let v1 = h.put("doc.txt", "v1").await;
        let v2 = h.put("doc.txt", "v2").await;
        assert_ne!(v1.version, v2.version);

        assert_eq!(h.read("doc.txt").await, "v2");
        let (_, data) = h
            .layer
            .get_object_version(&h.container, "doc.txt", v1.version)
            .await
            .unwrap();
        assert_eq!(data.as_ref(), b"v1");
    }

    #[tokio::test]
    async fn test_should_hide_key_behind_delete_marker() {
        let h = Harness::default();
        h.layer
            .put_container_versioning(&h.container, VersioningStatus::Enabled);
        let v1 = h.put("doc.txt", "v1").await;
        let marker = h
            .layer
            .delete_object(&h.container, "doc.txt", owner())
            .await
            .unwrap();

        let err = h.layer.head_object(&h.container, "doc.txt").await.unwrap_err();
        assert!(matches!(err, LayerError::NoSuchKey { .. }));
        assert_eq!(err.code(), "NoSuchKey");

        h.layer
            .delete_object_version(&h.container, "doc.txt", marker.id, Utc::now())
            .await
            .unwrap();
        let info = h.layer.head_object(&h.container, "doc.txt").await.unwrap();
        assert_eq!(info.version, v1.version);
    }

    #[tokio::test]
    async fn test_should_replace_null_version_when_suspended() {
        let h = Harness::default();
        h.layer
            .put_container_versioning(&h.container, VersioningStatus::Enabled);
        let kept = h.put("doc.txt", "kept").await;
        h.layer
            .put_container_versioning(&h.container, VersioningStatus::Suspended);
        h.put("doc.txt", "first").await;
        let second = h.put("doc.txt", "second").await;

        let versions = h
            .layer
            .list_object_versions(&h.container, "doc.txt")
            .await
            .unwrap();
        let ids: Vec<_> = versions.iter().map(|v| v.node.id).collect();
        assert_eq!(ids, vec![second.version, kept.version]);
        assert_eq!(h.read("doc.txt").await, "second");
    }

    #[tokio::test]
    async fn test_should_remove_single_version_permanently() {
        let h = Harness::default();
        h.layer
            .put_container_versioning(&h.container, VersioningStatus::Enabled);
        let v1 = h.put("doc.txt", "v1").await;
        let v2 = h.put("doc.txt", "v2").await;

        h.layer
            .delete_object_version(&h.container, "doc.txt", v2.version, Utc::now())
            .await
            .unwrap();
        assert_eq!(h.read("doc.txt").await, "v1");

        let err = h
            .layer
            .get_object_version(&h.container, "doc.txt", v2.version)
            .await
            .unwrap_err();
        assert!(matches!(err, LayerError::NoSuchVersion { .. }));
        let versions = h
            .layer
            .list_object_versions(&h.container, "doc.txt")
            .await
            .unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].node.id, v1.version);
    }
}
