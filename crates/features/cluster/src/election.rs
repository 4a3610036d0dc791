use crate::error::{ClusterError, ClusterErrorExt};
use async_trait::async_trait;
use pvault_database::VaultRepository;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Outcome of one election cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Runs the expiry sweep this cycle.
    Leader,
    Follower,
}

/// Decides which instance sweeps expired entries.
///
/// Exclusivity is an optimisation: purging is idempotent, so two leaders in the same cycle
/// are harmless. Implementations backed by a lease service can replace the heartbeat table.
#[async_trait]
pub trait LeaderElection: Send + Sync + Debug {
    /// Id this instance competes with.
    fn node_id(&self) -> i64;

    /// Runs one cycle at `now` (unix seconds).
    async fn elect(&self, now: i64) -> Result<Role, ClusterError>;
}

/// Lowest live node id wins. Liveness is a heartbeat row refreshed every cycle.
#[derive(Debug, Clone)]
pub struct HeartbeatElection {
    repository: Arc<dyn VaultRepository>,
    node_id: i64,
    node_ttl: i64,
}

impl HeartbeatElection {
    /// `node_ttl` is the age in seconds after which a silent node is pruned.
    #[must_use]
    pub fn new(repository: Arc<dyn VaultRepository>, node_id: i64, node_ttl: i64) -> Self {
        Self { repository, node_id, node_ttl }
    }
}

#[async_trait]
impl LeaderElection for HeartbeatElection {
    fn node_id(&self) -> i64 {
        self.node_id
    }

    #[instrument(skip(self), fields(node_id = self.node_id))]
    async fn elect(&self, now: i64) -> Result<Role, ClusterError> {
        self.repository.touch_node(self.node_id, now).await.context("Registering node")?;

        let pruned = self
            .repository
            .prune_nodes(now - self.node_ttl)
            .await
            .context("Pruning offline nodes")?;
        if pruned > 0 {
            debug!(pruned, "Offline nodes removed");
        }

        let lowest = self.repository.min_node().await.context("Electing leader")?;
        Ok(if lowest == Some(self.node_id) { Role::Leader } else { Role::Follower })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pvault_database::MemoryRepository;

    #[tokio::test]
    async fn lone_node_leads() {
        let repo = MemoryRepository::new();
        let election = HeartbeatElection::new(Arc::new(repo.clone()), 42, 3600);

        assert_eq!(election.elect(1_000).await.unwrap(), Role::Leader);
        assert_eq!(repo.nodes(), vec![(42, 1_000)]);
    }

    #[tokio::test]
    async fn storage_failure_aborts_the_cycle() {
        let repo = MemoryRepository::new();
        repo.set_offline(true);
        let election = HeartbeatElection::new(Arc::new(repo), 1, 3600);

        assert!(matches!(election.elect(0).await, Err(ClusterError::Storage { .. })));
    }
}
