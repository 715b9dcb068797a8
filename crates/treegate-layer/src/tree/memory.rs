//! In-process tree service.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, trace};
use treegate_core::{ContainerId, NodeId};

use super::{
    AddNodeRequest, RemoveNodeRequest, Signed, TreeError, TreeKind, TreeNode, TreeService,
};

/// In-memory [`TreeService`].
///
/// Node IDs are assigned from a single counter, so they increase
/// monotonically across all containers. Every mutating request is verified
/// before it is applied.
///
/// The service can be switched unavailable and given an artificial latency,
/// which is how backend failures and timeouts are exercised in tests.
#[derive(Debug)]
pub struct MemoryTree {
    trees: DashMap<(ContainerId, TreeKind), BTreeMap<NodeId, TreeNode>>,
    next_id: AtomicU64,
    available: AtomicBool,
    latency_micros: AtomicU64,
    list_calls: AtomicU64,
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTree {
    /// Create an empty, available tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            trees: DashMap::new(),
            next_id: AtomicU64::new(0),
            available: AtomicBool::new(true),
            latency_micros: AtomicU64::new(0),
            list_calls: AtomicU64::new(0),
        }
    }

    /// Make every subsequent call fail with [`TreeError::Unavailable`]
    /// (`false`) or succeed again (`true`).
    pub fn set_available(&self, available: bool) {
        debug!(available, "tree availability changed");
        self.available.store(available, Ordering::SeqCst);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.latency_micros.store(micros, Ordering::SeqCst);
    }

    /// Number of `list_nodes` calls served so far.
    #[must_use]
    pub fn list_calls(&self) -> u64 {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Total number of nodes across all containers and trees.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.trees.iter().map(|t| t.value().len()).sum()
    }

    async fn round_trip(&self) -> Result<(), TreeError> {
        let latency = self.latency_micros.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_micros(latency)).await;
        }
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TreeError::Unavailable("tree service is offline".to_owned()))
        }
    }
}

#[async_trait]
impl TreeService for MemoryTree {
    async fn add_node(&self, request: Signed<AddNodeRequest>) -> Result<NodeId, TreeError> {
        self.round_trip().await?;
        let request = request.open()?;

        let id = NodeId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        trace!(container = %request.container, tree = ?request.tree, key = %request.key, %id, "adding node");
        self.trees
            .entry((request.container, request.tree))
            .or_default()
            .insert(
                id,
                TreeNode {
                    id,
                    key: request.key,
                    payload: request.payload,
                },
            );
        Ok(id)
    }

    async fn remove_node(&self, request: Signed<RemoveNodeRequest>) -> Result<(), TreeError> {
        self.round_trip().await?;
        let request = request.open()?;

        let removed = self
            .trees
            .get_mut(&(request.container.clone(), request.tree))
            .and_then(|mut nodes| nodes.remove(&request.id));
        match removed {
            Some(_) => {
                trace!(container = %request.container, tree = ?request.tree, id = %request.id, "removed node");
                Ok(())
            }
            None => Err(TreeError::NodeNotFound(request.id)),
        }
    }

    async fn list_nodes(
        &self,
        container: &ContainerId,
        tree: TreeKind,
        prefix: &str,
    ) -> Result<Vec<TreeNode>, TreeError> {
        self.round_trip().await?;
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        Ok(self
            .trees
            .get(&(container.clone(), tree))
            .map(|nodes| {
                nodes
                    .values()
                    .filter(|node| node.key.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_node(
        &self,
        container: &ContainerId,
        tree: TreeKind,
        id: NodeId,
    ) -> Result<Option<TreeNode>, TreeError> {
        self.round_trip().await?;
        Ok(self
            .trees
            .get(&(container.clone(), tree))
            .and_then(|nodes| nodes.get(&id).cloned()))
    }
}
