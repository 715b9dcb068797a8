//! Multipart upload integration tests.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use bytes::Bytes;
    use treegate_layer::LayerError;

    use crate::{Harness, owner};

    async fn start(h: &Harness, key: &str) -> String {
        h.layer
            .create_multipart_upload(&h.container, key, owner(), BTreeMap::new())
            .await
            .unwrap()
            .upload_id
    }

    async fn part(h: &Harness, key: &str, upload_id: &str, number: u32, body: &'static str) {
        h.layer
            .upload_part(&h.container, key, upload_id, number, Bytes::from_static(body.as_bytes()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_should_assemble_parts_in_number_order() {
        let h = Harness::default();
        let upload_id = start(&h, "big.bin").await;
        part(&h, "big.bin", &upload_id, 2, "PART2").await;
        part(&h, "big.bin", &upload_id, 1, "PART1").await;

        let info = h
            .layer
            .complete_multipart_upload(&h.container, "big.bin", &upload_id)
            .await
            .unwrap();
        assert_eq!(info.size, 10);
        assert_eq!(h.read("big.bin").await, "PART1PART2");

        let objects = h.layer.list_objects(&h.container, "").await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].version, info.version);
    }

    #[tokio::test]
    async fn test_should_use_latest_upload_of_part_number() {
        let h = Harness::default();
        let upload_id = start(&h, "k").await;
        part(&h, "k", &upload_id, 1, "old").await;
        part(&h, "k", &upload_id, 1, "new").await;

        let parts = h.layer.list_parts(&h.container, "k", &upload_id).await.unwrap();
        assert_eq!(parts.len(), 1);
        h.layer
            .complete_multipart_upload(&h.container, "k", &upload_id)
            .await
            .unwrap();
        assert_eq!(h.read("k").await, "new");
    }

    #[tokio::test]
    async fn test_should_reject_gap_in_part_numbers() {
        let h = Harness::default();
        let upload_id = start(&h, "k").await;
        part(&h, "k", &upload_id, 1, "a").await;
        part(&h, "k", &upload_id, 3, "c").await;

        let err = h
            .layer
            .complete_multipart_upload(&h.container, "k", &upload_id)
            .await
            .unwrap_err();
        assert!(matches!(err, LayerError::InvalidPartOrder { missing: 2, .. }));
        assert!(h.layer.get_object(&h.container, "k").await.is_err());
    }

    #[tokio::test]
    async fn test_should_reject_upload_without_parts() {
        let h = Harness::default();
        let upload_id = start(&h, "k").await;
        let err = h
            .layer
            .complete_multipart_upload(&h.container, "k", &upload_id)
            .await
            .unwrap_err();
        assert!(matches!(err, LayerError::MissingParts { .. }));
    }

    #[tokio::test]
    async fn test_should_commit_once_under_concurrent_completion() {
        let h = Harness::default();
        let upload_id = start(&h, "k").await;
        part(&h, "k", &upload_id, 1, "body").await;

        let (a, b) = tokio::join!(
            h.layer.complete_multipart_upload(&h.container, "k", &upload_id),
            h.layer.complete_multipart_upload(&h.container, "k", &upload_id),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.version, b.version);

        let versions = h.layer.list_object_versions(&h.container, "k").await.unwrap();
        assert_eq!(versions.len(), 1);
    }

    #[tokio::test]
    async fn test_should_forget_aborted_upload() {
        let h = Harness::default();
        let upload_id = start(&h, "k").await;
        part(&h, "k", &upload_id, 1, "body").await;

        h.layer
            .abort_multipart_upload(&h.container, "k", &upload_id)
            .await
            .unwrap();
        let err = h
            .layer
            .upload_part(&h.container, "k", &upload_id, 2, Bytes::from("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, LayerError::NoSuchUpload { .. }));
        assert!(
            h.layer
                .list_multipart_uploads(&h.container, "")
                .await
                .unwrap()
                .is_empty()
        );
    }
}
