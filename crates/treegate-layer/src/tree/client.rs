//! Deadline-bounded, signing client over a [`TreeService`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;
use treegate_core::{ContainerId, NodeId};

use super::{
    AddNodeRequest, NodePayload, RemoveNodeRequest, RequestSigner, TreeError, TreeKind, TreeNode,
    TreeService,
};
use crate::error::{LayerError, LayerResult};

/// Client the object layer uses for every tree round trip.
///
/// Each call is bounded by the configured request timeout. An elapsed
/// deadline and an unreachable service both surface as
/// [`LayerError::BackendUnavailable`]. Dropping a returned future cancels the
/// call.
#[derive(Debug, Clone)]
pub struct TreeClient {
    tree: Arc<dyn TreeService>,
    signer: Arc<RequestSigner>,
    request_timeout: Duration,
}

impl TreeClient {
    /// Create a client.
    #[must_use]
    pub fn new(
        tree: Arc<dyn TreeService>,
        signer: Arc<RequestSigner>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            tree,
            signer,
            request_timeout,
        }
    }

    /// Append a node and return its ID.
    pub async fn add(
        &self,
        container: &ContainerId,
        tree: TreeKind,
        key: &str,
        payload: NodePayload,
    ) -> LayerResult<NodeId> {
        let request = self
            .signer
            .sign(&AddNodeRequest {
                container: container.clone(),
                tree,
                key: key.to_owned(),
                payload,
            })
            .map_err(|e| LayerError::Internal(e.into()))?;
        self.bounded("add_node", self.tree.add_node(request)).await
    }

    /// Remove a node. Returns `false` if the node was already gone.
    pub async fn remove(
        &self,
        container: &ContainerId,
        tree: TreeKind,
        id: NodeId,
    ) -> LayerResult<bool> {
        let request = self
            .signer
            .sign(&RemoveNodeRequest {
                container: container.clone(),
                tree,
                id,
            })
            .map_err(|e| LayerError::Internal(e.into()))?;
        let call = async {
            match self.tree.remove_node(request).await {
                Ok(()) => Ok(true),
                Err(TreeError::NodeNotFound(_)) => Ok(false),
                Err(e) => Err(e),
            }
        };
        self.bounded("remove_node", call).await
    }

    /// Remove a node, logging instead of failing. Used to clear superseded
    /// system nodes, which readers already ignore.
    pub async fn remove_quietly(&self, container: &ContainerId, tree: TreeKind, id: NodeId) {
        if let Err(e) = self.remove(container, tree, id).await {
            warn!(container = %container, %id, error = %e, "failed to remove superseded node");
        }
    }

    /// All nodes of one tree whose key starts with `prefix`.
    pub async fn list(
        &self,
        container: &ContainerId,
        tree: TreeKind,
        prefix: &str,
    ) -> LayerResult<Vec<TreeNode>> {
        self.bounded("list_nodes", self.tree.list_nodes(container, tree, prefix))
            .await
    }

    /// A single node by ID.
    pub async fn get(
        &self,
        container: &ContainerId,
        tree: TreeKind,
        id: NodeId,
    ) -> LayerResult<Option<TreeNode>> {
        self.bounded("get_node", self.tree.get_node(container, tree, id))
            .await
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        call: impl Future<Output = Result<T, TreeError>>,
    ) -> LayerResult<T> {
        match tokio::time::timeout(self.request_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(TreeError::Unavailable(message))) => {
                warn!(op, %message, "tree service unavailable");
                Err(LayerError::unavailable(message))
            }
            Ok(Err(TreeError::NodeNotFound(id))) => Err(LayerError::Internal(anyhow::anyhow!(
                "tree service lost node {id} during {op}"
            ))),
            Ok(Err(TreeError::Signature(e))) => Err(LayerError::Internal(anyhow::anyhow!(
                "tree service rejected {op}: {e}"
            ))),
            Err(_) => {
                warn!(op, timeout = ?self.request_timeout, "tree service call timed out");
                Err(LayerError::unavailable(format!(
                    "{op} timed out after {:?}",
                    self.request_timeout
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use treegate_core::ContentId;

    use super::*;
    use crate::state::multipart::PartMeta;
    use crate::tree::MemoryTree;

    fn container() -> ContainerId {
        ContainerId::new("C1").unwrap()
    }

    fn client(tree: &Arc<MemoryTree>, timeout: Duration) -> TreeClient {
        TreeClient::new(
            Arc::clone(tree) as Arc<dyn TreeService>,
            Arc::new(RequestSigner::generate()),
            timeout,
        )
    }

    fn part() -> NodePayload {
        NodePayload::Part(PartMeta {
            upload_id: "u1".to_owned(),
            number: 1,
            content_id: ContentId::compute(b"part"),
        })
    }

    #[tokio::test]
    async fn test_should_add_list_and_remove_nodes() {
        let tree = Arc::new(MemoryTree::new());
        let client = client(&tree, Duration::from_secs(1));

        let id = client
            .add(&container(), TreeKind::System, "part/u1/a", part())
            .await
            .unwrap();
        let nodes = client
            .list(&container(), TreeKind::System, "part/")
            .await
            .unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, id);

        assert!(client.remove(&container(), TreeKind::System, id).await.unwrap());
        assert!(!client.remove(&container(), TreeKind::System, id).await.unwrap());
    }

    #[tokio::test]
    async fn test_should_map_unavailable_to_backend_unavailable() {
        let tree = Arc::new(MemoryTree::new());
        let client = client(&tree, Duration::from_secs(1));
        tree.set_available(false);

        let err = client
            .list(&container(), TreeKind::Version, "")
            .await
            .unwrap_err();
        assert!(matches!(err, LayerError::BackendUnavailable { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_time_out_slow_tree() {
        let tree = Arc::new(MemoryTree::new());
        tree.set_latency(Duration::from_secs(30));
        let client = client(&tree, Duration::from_millis(100));

        let err = client
            .get(&container(), TreeKind::Version, NodeId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, LayerError::BackendUnavailable { .. }));
    }
}
