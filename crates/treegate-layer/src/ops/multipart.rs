//! Multipart upload operation handlers.
//!
//! Implements `create_multipart_upload`, `upload_part`,
//! `complete_multipart_upload`, `abort_multipart_upload`, `list_parts`, and
//! `list_multipart_uploads`.

use std::collections::BTreeMap;

use bytes::Bytes;
use tracing::debug;
use treegate_core::{ContainerId, UserId};

use crate::error::{LayerError, LayerResult};
use crate::info::ObjectInfo;
use crate::provider::ObjectLayer;
use crate::state::{MAX_PART_NUMBER, MultipartUpload, PartRecord};
use crate::storage::ContentStore;
use crate::utils::validate_object_key;

impl ObjectLayer {
    /// Start a multipart upload for `key`.
    pub async fn create_multipart_upload(
        &self,
        container: &ContainerId,
        key: &str,
        owner: UserId,
        metadata: BTreeMap<String, String>,
    ) -> LayerResult<MultipartUpload> {
        validate_object_key(key)?;
        self.multipart
            .begin_upload(container, key, owner, metadata)
            .await
    }

    /// Store `payload` as part `number` of an upload. Re-uploading a number
    /// replaces the earlier part.
    pub async fn upload_part(
        &self,
        container: &ContainerId,
        key: &str,
        upload_id: &str,
        number: u32,
        payload: Bytes,
    ) -> LayerResult<PartRecord> {
        if !(1..=MAX_PART_NUMBER).contains(&number) {
            return Err(LayerError::InvalidArgument {
                message: format!("Part number must be an integer between 1 and {MAX_PART_NUMBER}"),
            });
        }
        let size = payload.len();
        let content_id = self.content.put(payload).await?;
        let part = self
            .multipart
            .put_part(container, key, upload_id, number, content_id)
            .await?;
        debug!(container = %container, key, upload_id, number, size, "uploaded part");
        Ok(part)
    }

    /// Assemble the parts of an upload into a new version of `key`.
    ///
    /// Safe to retry: a completion that already committed returns the same
    /// version.
    pub async fn complete_multipart_upload(
        &self,
        container: &ContainerId,
        key: &str,
        upload_id: &str,
    ) -> LayerResult<ObjectInfo> {
        let unversioned = self.settings_of(container).versioning().writes_unversioned();
        let node = self
            .multipart
            .complete(container, key, upload_id, unversioned)
            .await?;
        self.record_write(container, &node);
        self.object_info(&node)
            .await?
            .ok_or_else(|| LayerError::Internal(anyhow::anyhow!("assembled payload of {key} is missing")))
    }

    /// Drop an upload and its parts.
    pub async fn abort_multipart_upload(
        &self,
        container: &ContainerId,
        key: &str,
        upload_id: &str,
    ) -> LayerResult<()> {
        self.multipart.abort(container, key, upload_id).await
    }

    /// Parts of an upload in ascending order.
    pub async fn list_parts(
        &self,
        container: &ContainerId,
        key: &str,
        upload_id: &str,
    ) -> LayerResult<Vec<PartRecord>> {
        self.multipart.list_parts(container, key, upload_id).await
    }

    /// In-progress uploads whose key starts with `prefix`.
    pub async fn list_multipart_uploads(
        &self,
        container: &ContainerId,
        prefix: &str,
    ) -> LayerResult<Vec<MultipartUpload>> {
        self.multipart.list_uploads(container, prefix).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerConfig;

    fn container() -> ContainerId {
        ContainerId::new("C1").unwrap()
    }

    #[tokio::test]
    async fn test_should_complete_upload_into_listable_object() {
        let layer = ObjectLayer::in_memory(LayerConfig::default());
        let c = container();
        let upload = layer
            .create_multipart_upload(&c, "big.bin", UserId::default(), BTreeMap::new())
            .await
            .unwrap();
        assert!(layer.list_objects(&c, "").await.unwrap().is_empty());

        layer
            .upload_part(&c, "big.bin", &upload.upload_id, 2, Bytes::from("PART2"))
            .await
            .unwrap();
        layer
            .upload_part(&c, "big.bin", &upload.upload_id, 1, Bytes::from("PART1"))
            .await
            .unwrap();

        let info = layer
            .complete_multipart_upload(&c, "big.bin", &upload.upload_id)
            .await
            .unwrap();
        assert_eq!(info.size, 10);

        let (_, data) = layer.get_object(&c, "big.bin").await.unwrap();
        assert_eq!(data.as_ref(), b"PART1PART2");
        assert_eq!(layer.list_objects(&c, "").await.unwrap().len(), 1);
        assert!(
            layer
                .list_multipart_uploads(&c, "")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_should_reject_out_of_range_part_number() {
        let layer = ObjectLayer::in_memory(LayerConfig::default());
        let c = container();
        let upload = layer
            .create_multipart_upload(&c, "k", UserId::default(), BTreeMap::new())
            .await
            .unwrap();

        let err = layer
            .upload_part(&c, "k", &upload.upload_id, 0, Bytes::from("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, LayerError::InvalidArgument { .. }));
        let err = layer
            .upload_part(&c, "k", &upload.upload_id, 10_001, Bytes::from("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, LayerError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_should_list_and_abort_uploads() {
        let layer = ObjectLayer::in_memory(LayerConfig::default());
        let c = container();
        let upload = layer
            .create_multipart_upload(&c, "k", UserId::default(), BTreeMap::new())
            .await
            .unwrap();
        layer
            .upload_part(&c, "k", &upload.upload_id, 1, Bytes::from("x"))
            .await
            .unwrap();

        assert_eq!(layer.list_parts(&c, "k", &upload.upload_id).await.unwrap().len(), 1);
        assert_eq!(layer.list_multipart_uploads(&c, "k").await.unwrap().len(), 1);

        layer
            .abort_multipart_upload(&c, "k", &upload.upload_id)
            .await
            .unwrap();
        let err = layer
            .list_parts(&c, "k", &upload.upload_id)
            .await
            .unwrap_err();
        assert!(matches!(err, LayerError::NoSuchUpload { .. }));
    }
}
