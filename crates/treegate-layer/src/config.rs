//! Object-layer configuration.
//!
//! Provides [`LayerConfig`] for configuring the caches, the tree-service
//! deadline, and the content store. Values are loaded from environment
//! variables with [`LayerConfig::from_env`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Default number of entries held by each cache.
pub const DEFAULT_CACHE_SIZE: usize = 100_000;

/// Default lifetime of a cache entry.
pub const DEFAULT_CACHE_LIFETIME: Duration = Duration::from_secs(60);

/// Default deadline for a single tree-service round trip.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Default maximum payload size kept in memory by the content store.
pub const DEFAULT_MAX_MEMORY_OBJECT_SIZE: usize = 524_288;

/// Capacity and lifetime bounds of one cache. Whichever bound is reached
/// first evicts an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    /// Maximum number of entries before least-recently-used eviction.
    #[builder(default = DEFAULT_CACHE_SIZE)]
    pub size: usize,
    /// Time after insertion at which an entry expires.
    #[builder(default = DEFAULT_CACHE_LIFETIME)]
    pub lifetime: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CACHE_SIZE,
            lifetime: DEFAULT_CACHE_LIFETIME,
        }
    }
}

/// Object-layer configuration.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use treegate_layer::config::LayerConfig;
///
/// let config = LayerConfig::default();
/// assert_eq!(config.listing_cache.size, 100_000);
/// assert_eq!(config.listing_cache.lifetime, Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct LayerConfig {
    /// Bounds of the `(container, prefix, latest-only)` listing cache.
    #[builder(default)]
    pub listing_cache: CacheConfig,

    /// Bounds of the `(container, node)` version-node memo.
    #[builder(default)]
    pub node_cache: CacheConfig,

    /// Deadline applied to every tree-service call.
    #[builder(default = DEFAULT_REQUEST_TIMEOUT)]
    pub request_timeout: Duration,

    /// Payloads larger than this many bytes are spilled to temporary files.
    #[builder(default = DEFAULT_MAX_MEMORY_OBJECT_SIZE)]
    pub max_memory_object_size: usize,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            listing_cache: CacheConfig::default(),
            node_cache: CacheConfig::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_memory_object_size: DEFAULT_MAX_MEMORY_OBJECT_SIZE,
            log_level: String::from("info"),
        }
    }
}

impl LayerConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables (falling back to defaults
    /// when unset or unparseable):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `TREEGATE_LISTING_CACHE_SIZE` | `100000` |
    /// | `TREEGATE_LISTING_CACHE_LIFETIME` | `60` (seconds) |
    /// | `TREEGATE_NODE_CACHE_SIZE` | `100000` |
    /// | `TREEGATE_NODE_CACHE_LIFETIME` | `60` (seconds) |
    /// | `TREEGATE_REQUEST_TIMEOUT` | `15` (seconds) |
    /// | `TREEGATE_MAX_MEMORY_OBJECT_SIZE` | `524288` |
    /// | `LOG_LEVEL` | `info` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(n) = env_parse::<usize>("TREEGATE_LISTING_CACHE_SIZE") {
            config.listing_cache.size = n;
        }
        if let Some(secs) = env_parse::<u64>("TREEGATE_LISTING_CACHE_LIFETIME") {
            config.listing_cache.lifetime = Duration::from_secs(secs);
        }
        if let Some(n) = env_parse::<usize>("TREEGATE_NODE_CACHE_SIZE") {
            config.node_cache.size = n;
        }
        if let Some(secs) = env_parse::<u64>("TREEGATE_NODE_CACHE_LIFETIME") {
            config.node_cache.lifetime = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<u64>("TREEGATE_REQUEST_TIMEOUT") {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = env_parse::<usize>("TREEGATE_MAX_MEMORY_OBJECT_SIZE") {
            config.max_memory_object_size = n;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }
}

/// Read and parse an environment variable, ignoring unset or malformed values.
fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_create_default_config() {
        let config = LayerConfig::default();
        assert_eq!(config.listing_cache, CacheConfig::default());
        assert_eq!(config.node_cache.size, DEFAULT_CACHE_SIZE);
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.max_memory_object_size, 524_288);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_should_load_from_env() {
        let config = LayerConfig::from_env();
        assert!(config.listing_cache.size > 0);
    }

    #[test]
    fn test_should_build_with_typed_builder() {
        let config = LayerConfig::builder()
            .listing_cache(
                CacheConfig::builder()
                    .size(10)
                    .lifetime(Duration::from_millis(50))
                    .build(),
            )
            .request_timeout(Duration::from_secs(1))
            .log_level("debug".into())
            .build();

        assert_eq!(config.listing_cache.size, 10);
        assert_eq!(config.listing_cache.lifetime, Duration::from_millis(50));
        assert_eq!(config.node_cache, CacheConfig::default());
        assert_eq!(config.request_timeout, Duration::from_secs(1));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_should_serialize_to_camel_case_json() {
        let config = LayerConfig::default();
        let json = serde_json::to_string(&config).expect("test serialization");
        assert!(json.contains("listingCache"));
        assert!(json.contains("requestTimeout"));
        assert!(json.contains("maxMemoryObjectSize"));
    }

    #[test]
    fn test_should_ignore_unparseable_env_values() {
        assert_eq!(env_parse::<usize>("TREEGATE_SURELY_UNSET_VARIABLE"), None);
    }
}
