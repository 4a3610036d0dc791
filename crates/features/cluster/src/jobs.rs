//! Keep-alive and expiry cleanup loops.

use crate::election::{HeartbeatElection, LeaderElection, Role};
use crate::error::{ClusterError, ClusterErrorExt};
use crate::node::local_node_id;
use pvault_database::VaultRepository;
use pvault_domain::config::ClusterConfig;
use pvault_kernel::clock::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Running background loops. Dropping the handle leaves them running; call
/// [`BackgroundJobs::shutdown`] to stop them.
#[derive(Debug)]
pub struct BackgroundJobs {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundJobs {
    /// Resolves the node id and starts the loops enabled by `config`.
    ///
    /// Without a node id only the keep-alive loop runs.
    pub async fn start(
        repository: Arc<dyn VaultRepository>,
        clock: Arc<dyn Clock>,
        config: &ClusterConfig,
    ) -> Self {
        if !config.enabled {
            info!("Background jobs disabled by configuration");
            return Self::spawn(repository, clock, config, None);
        }

        let election = match local_node_id().await {
            Ok(node_id) => {
                info!(node_id, "Cluster node identity resolved");
                let ttl = i64::try_from(config.node_ttl_secs).unwrap_or(i64::MAX);
                Some(Arc::new(HeartbeatElection::new(Arc::clone(&repository), node_id, ttl))
                    as Arc<dyn LeaderElection>)
            }
            Err(e) => {
                error!(error = %e, "Will not run expiry cleanup: node identity unavailable");
                None
            }
        };
        Self::spawn(repository, clock, config, election)
    }

    /// Starts the loops on the current runtime with an explicit election.
    ///
    /// The keep-alive loop runs whenever `config.enabled` is set. The cleanup loop also needs an
    /// `election`. The first tick of each loop fires one period after start.
    #[must_use]
    pub fn spawn(
        repository: Arc<dyn VaultRepository>,
        clock: Arc<dyn Clock>,
        config: &ClusterConfig,
        election: Option<Arc<dyn LeaderElection>>,
    ) -> Self {
        let token = CancellationToken::new();
        let mut handles = Vec::with_capacity(2);
        if !config.enabled {
            return Self { token, handles };
        }

        handles.push(tokio::spawn(keep_alive_loop(
            Arc::clone(&repository),
            period(config.keep_alive_secs),
            token.clone(),
        )));
        if let Some(election) = election {
            handles.push(tokio::spawn(cleanup_loop(
                repository,
                election,
                clock,
                period(config.cleanup_secs),
                token.clone(),
            )));
        }
        Self { token, handles }
    }

    /// Number of loops started.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Cancels the loops and waits for them to exit.
    ///
    /// # Errors
    /// Returns [`ClusterError::Join`] if a loop panicked.
    pub async fn shutdown(self) -> Result<(), ClusterError> {
        self.token.cancel();
        for handle in self.handles {
            handle.await.context("Stopping background jobs")?;
        }
        debug!("Background jobs stopped");
        Ok(())
    }
}

/// One cleanup cycle: elect, and purge expired published entries when leading.
///
/// Returns the number of purged entries, `None` when following.
///
/// # Errors
/// Any failing step aborts the cycle with its error.
pub async fn run_cleanup_cycle(
    election: &dyn LeaderElection,
    repository: &dyn VaultRepository,
    now: i64,
) -> Result<Option<usize>, ClusterError> {
    match election.elect(now).await? {
        Role::Follower => {
            debug!(node_id = election.node_id(), "Another node sweeps expired entries");
            Ok(None)
        }
        Role::Leader => {
            let purged =
                repository.purge_expired(now).await.context("Purging expired entries")?;
            Ok(Some(purged))
        }
    }
}

fn period(secs: u64) -> Duration {
    Duration::from_secs(secs.max(1))
}

async fn keep_alive_loop(
    repository: Arc<dyn VaultRepository>,
    every: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    debug!(interval_secs = every.as_secs(), "Keep-alive loop started");

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = repository.ping().await {
                    warn!(error = %e, "Keep-alive query failed");
                }
            }
        }
    }
}

async fn cleanup_loop(
    repository: Arc<dyn VaultRepository>,
    election: Arc<dyn LeaderElection>,
    clock: Arc<dyn Clock>,
    every: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(
        node_id = election.node_id(),
        interval_secs = every.as_secs(),
        "Expiry cleanup loop started"
    );

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                match run_cleanup_cycle(election.as_ref(), repository.as_ref(), clock.now()).await {
                    Ok(Some(purged)) => info!(purged, "Expired published entries removed"),
                    Ok(None) => {}
                    Err(e) => error!(error = %e, "Cleanup cycle aborted"),
                }
            }
        }
    }
}
