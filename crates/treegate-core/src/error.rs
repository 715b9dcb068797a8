//! Error types for the treegate core.

/// Core error type for identifier parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// The container identifier is empty or contains characters outside the
    /// base58 alphabet.
    #[error("invalid container ID: {0:?}")]
    InvalidContainerId(String),

    /// The content identifier is not a 64-character hex SHA-256 digest.
    #[error("invalid content ID: {0:?}")]
    InvalidContentId(String),
}

/// Convenience result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
