//! Object-layer error types.
//!
//! Defines [`LayerError`], the caller-facing error taxonomy of the object
//! layer. Each variant maps to a well-known S3 error code through
//! [`LayerError::code`], so a protocol front end can render it without
//! inspecting the variant itself.
//!
//! Only backend reachability ([`LayerError::BackendUnavailable`]) is
//! retryable. Cache anomalies never surface here: they are logged and turned
//! into cache misses inside [`crate::cache`].
//!
//! # Usage
//!
//! ```
//! use treegate_layer::error::LayerError;
//!
//! let err = LayerError::NoSuchKey {
//!     key: "a/b/c.txt".to_owned(),
//! };
//! assert_eq!(err.code(), "NoSuchKey");
//! assert!(!err.is_retryable());
//! ```

use chrono::{DateTime, Utc};
use treegate_core::NodeId;

/// Object-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    // -----------------------------------------------------------------------
    // Resolution errors
    // -----------------------------------------------------------------------
    /// No live version exists for the key (never written, or a delete marker
    /// is the latest version).
    #[error("The specified key does not exist: {key}")]
    NoSuchKey {
        /// The key that was not found.
        key: String,
    },

    /// The specified version does not exist for the key.
    #[error("The specified version does not exist: key={key}, version={version}")]
    NoSuchVersion {
        /// The key for the version.
        key: String,
        /// The node ID that was not found.
        version: NodeId,
    },

    // -----------------------------------------------------------------------
    // Multipart upload errors
    // -----------------------------------------------------------------------
    /// The specified multipart upload does not exist.
    #[error("The specified upload does not exist: {upload_id}")]
    NoSuchUpload {
        /// The upload ID that was not found.
        upload_id: String,
    },

    /// Completion was requested for an upload without any parts.
    #[error("The upload {upload_id} has no parts to complete")]
    MissingParts {
        /// The upload that has no parts.
        upload_id: String,
    },

    /// The uploaded part numbers have a gap, so ascending assembly is undefined.
    #[error("The list of parts was not in ascending order: part {missing} of upload {upload_id} is missing")]
    InvalidPartOrder {
        /// The upload with the gap.
        upload_id: String,
        /// The first missing part number.
        missing: u32,
    },

    /// A part references content that the content store does not hold.
    #[error("One or more of the specified parts could not be found: part {number}")]
    InvalidPart {
        /// The part number whose payload is missing.
        number: u32,
    },

    // -----------------------------------------------------------------------
    // Policy errors
    // -----------------------------------------------------------------------
    /// The change would violate an active compliance-mode retention or a
    /// legal hold.
    #[error("Object version {version} is locked until {until:?}")]
    RetentionLocked {
        /// The locked version.
        version: NodeId,
        /// The active retain-until date, if a retention causes the lock.
        until: Option<DateTime<Utc>>,
    },

    // -----------------------------------------------------------------------
    // Validation errors
    // -----------------------------------------------------------------------
    /// An argument provided is invalid.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // -----------------------------------------------------------------------
    // Backend errors
    // -----------------------------------------------------------------------
    /// The tree service or the content store is unreachable or timed out.
    #[error("Backend unavailable: {message}")]
    BackendUnavailable {
        /// What failed to respond.
        message: String,
    },

    // -----------------------------------------------------------------------
    // Internal / catch-all
    // -----------------------------------------------------------------------
    /// Internal error with context.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl LayerError {
    /// The S3 error code string for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoSuchKey { .. } => "NoSuchKey",
            Self::NoSuchVersion { .. } => "NoSuchVersion",
            Self::NoSuchUpload { .. } => "NoSuchUpload",
            Self::MissingParts { .. } | Self::InvalidPart { .. } => "InvalidPart",
            Self::InvalidPartOrder { .. } => "InvalidPartOrder",
            Self::RetentionLocked { .. } => "AccessDenied",
            Self::InvalidArgument { .. } => "InvalidArgument",
            Self::BackendUnavailable { .. } => "ServiceUnavailable",
            Self::Internal(_) => "InternalError",
        }
    }

    /// Whether the caller may retry the same request unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. })
    }

    /// Build a [`LayerError::BackendUnavailable`] from anything printable.
    pub(crate) fn unavailable(message: impl std::fmt::Display) -> Self {
        Self::BackendUnavailable {
            message: message.to_string(),
        }
    }
}

/// Convenience result type for object-layer operations.
pub type LayerResult<T> = Result<T, LayerError>;
