//! Object lock integration tests.

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, Utc};
    use treegate_layer::LayerError;

    use crate::Harness;

    #[tokio::test]
    async fn test_should_protect_version_under_compliance_retention() {
        let h = Harness::default();
        let v = h.put("report.pdf", "data").await;
        let now = Utc::now();
        let until = now + TimeDelta::days(30);

        h.layer
            .put_object_retention(&h.container, "report.pdf", v.version, until, true, now)
            .await
            .unwrap();

        let err = h
            .layer
            .delete_object_version(&h.container, "report.pdf", v.version, now)
            .await
            .unwrap_err();
        assert!(matches!(err, LayerError::RetentionLocked { .. }));

        let err = h
            .layer
            .put_object_retention(
                &h.container,
                "report.pdf",
                v.version,
                now + TimeDelta::days(1),
                true,
                now,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LayerError::RetentionLocked { .. }));

        let err = h
            .layer
            .remove_object_retention(&h.container, "report.pdf", v.version, now)
            .await
            .unwrap_err();
        assert!(matches!(err, LayerError::RetentionLocked { .. }));

        let extended = h
            .layer
            .put_object_retention(
                &h.container,
                "report.pdf",
                v.version,
                until + TimeDelta::days(1),
                true,
                now,
            )
            .await
            .unwrap();
        assert_eq!(extended.until_date, Some(until + TimeDelta::days(1)));
    }

    #[tokio::test]
    async fn test_should_allow_delete_after_retention_expires() {
        let h = Harness::default();
        let v = h.put("report.pdf", "data").await;
        let now = Utc::now();
        h.layer
            .put_object_retention(
                &h.container,
                "report.pdf",
                v.version,
                now + TimeDelta::hours(1),
                true,
                now,
            )
            .await
            .unwrap();

        h.layer
            .delete_object_version(
                &h.container,
                "report.pdf",
                v.version,
                now + TimeDelta::hours(2),
            )
            .await
            .unwrap();
        assert!(h.layer.get_object(&h.container, "report.pdf").await.is_err());
    }

    #[tokio::test]
    async fn test_should_hold_version_until_legal_hold_released() {
        let h = Harness::default();
        let v = h.put("evidence.bin", "data").await;
        let now = Utc::now();

        h.layer
            .put_object_legal_hold(&h.container, "evidence.bin", v.version, true)
            .await
            .unwrap();
        let err = h
            .layer
            .delete_object_version(&h.container, "evidence.bin", v.version, now)
            .await
            .unwrap_err();
        assert!(matches!(err, LayerError::RetentionLocked { .. }));

        let record = h
            .layer
            .put_object_legal_hold(&h.container, "evidence.bin", v.version, false)
            .await
            .unwrap();
        assert!(!record.has_legal_hold());
        h.layer
            .delete_object_version(&h.container, "evidence.bin", v.version, now)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_should_report_no_lock_for_fresh_version() {
        let h = Harness::default();
        let v = h.put("plain.txt", "data").await;
        let lock = h
            .layer
            .get_object_lock(&h.container, "plain.txt", v.version)
            .await
            .unwrap();
        assert!(lock.is_none());
    }
}
