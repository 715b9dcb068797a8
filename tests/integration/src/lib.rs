//! End-to-end tests for the treegate object layer.
//!
//! Every test builds its own [`ObjectLayer`] over an in-memory tree and
//! content store, so the suite runs with a plain `cargo test`:
//! ```text
//! cargo test -p treegate-integration
//! ```

use std::sync::{Arc, Once};

use bytes::Bytes;
use treegate_core::{ContainerId, UserId};
use treegate_layer::info::ObjectInfo;
use treegate_layer::storage::{ContentStore, InMemoryStorage};
use treegate_layer::tree::{MemoryTree, RequestSigner, TreeService};
use treegate_layer::{LayerConfig, ObjectLayer};

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// A layer over a tree the test can inspect and fault.
#[derive(Debug)]
pub struct Harness {
    /// The layer under test.
    pub layer: ObjectLayer,
    /// The tree behind the layer.
    pub tree: Arc<MemoryTree>,
    /// The container every helper writes to.
    pub container: ContainerId,
}

impl Harness {
    /// Create a harness with the given configuration.
    #[must_use]
    pub fn with_config(config: LayerConfig) -> Self {
        init_tracing();
        let tree = Arc::new(MemoryTree::new());
        let content: Arc<dyn ContentStore> =
            Arc::new(InMemoryStorage::new(config.max_memory_object_size));
        let layer = ObjectLayer::new(
            config,
            Arc::clone(&tree) as Arc<dyn TreeService>,
            content,
            RequestSigner::generate(),
        );
        Self {
            layer,
            tree,
            container: ContainerId::new("C1").unwrap_or_else(|e| panic!("container id: {e}")),
        }
    }

    /// Store `body` under `key` in the harness container.
    pub async fn put(&self, key: &str, body: &'static str) -> ObjectInfo {
        self.layer
            .put_object(&self.container, key, Bytes::from_static(body.as_bytes()), owner())
            .await
            .unwrap_or_else(|e| panic!("failed to put {key}: {e}"))
    }

    /// The live payload of `key` as a string.
    pub async fn read(&self, key: &str) -> String {
        let (_, data) = self
            .layer
            .get_object(&self.container, key)
            .await
            .unwrap_or_else(|e| panic!("failed to get {key}: {e}"));
        String::from_utf8_lossy(&data).into_owned()
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::with_config(LayerConfig::default())
    }
}

/// The owner recorded on test writes.
#[must_use]
pub fn owner() -> UserId {
    UserId::new("integration")
}

mod test_backend;
mod test_listing;
mod test_lock;
mod test_multipart;
mod test_versioning;
