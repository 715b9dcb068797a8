//! Shared utilities for the object layer.
//!
//! Provides ID generation, timestamp helpers, object key validation, and the
//! prefix test used by listing and cache invalidation.

use chrono::{DateTime, Utc};

use crate::error::{LayerError, LayerResult};

/// Maximum object key length in bytes.
pub const MAX_KEY_BYTES: usize = 1024;

// ---------------------------------------------------------------------------
// ID generation
// ---------------------------------------------------------------------------

/// Generate a random upload ID for multipart uploads.
///
/// Produces a 64-character hex string.
///
/// # Examples
///
/// ```
/// use treegate_layer::utils::generate_upload_id;
///
/// let id = generate_upload_id();
/// assert_eq!(id.len(), 64);
/// assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
/// ```
#[must_use]
pub fn generate_upload_id() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Current time as microseconds since the Unix epoch.
///
/// Version nodes order by this value, so microsecond resolution keeps
/// back-to-back writes from the same gateway distinct in most cases. Exact
/// ties fall back to node ID order.
#[must_use]
pub fn timestamp_micros() -> u64 {
    micros_of(Utc::now())
}

/// Convert a point in time to microseconds since the Unix epoch, clamping
/// pre-epoch times to zero.
#[must_use]
pub fn micros_of(time: DateTime<Utc>) -> u64 {
    u64::try_from(time.timestamp_micros()).unwrap_or_default()
}

/// Convert microseconds since the Unix epoch back to a point in time.
#[must_use]
pub fn time_of(micros: u64) -> DateTime<Utc> {
    i64::try_from(micros)
        .ok()
        .and_then(DateTime::from_timestamp_micros)
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Whether `key` falls under `prefix`. Pure byte-prefix match: `/` has no
/// special meaning and the empty prefix matches everything.
#[must_use]
pub fn key_has_prefix(key: &str, prefix: &str) -> bool {
    key.as_bytes().starts_with(prefix.as_bytes())
}

/// Validate an object key: non-empty and at most [`MAX_KEY_BYTES`] bytes.
///
/// # Errors
///
/// Returns [`LayerError::InvalidArgument`] if the key is empty or too long.
///
/// # Examples
///
/// ```
/// use treegate_layer::utils::validate_object_key;
///
/// assert!(validate_object_key("a/b/c.txt").is_ok());
/// assert!(validate_object_key("").is_err());
/// ```
pub fn validate_object_key(key: &str) -> LayerResult<()> {
    if key.is_empty() {
        return Err(LayerError::InvalidArgument {
            message: "Object key must not be empty".to_owned(),
        });
    }
    if key.len() > MAX_KEY_BYTES {
        return Err(LayerError::InvalidArgument {
            message: format!("Object key must not exceed {MAX_KEY_BYTES} bytes"),
        });
    }
    Ok(())
}
