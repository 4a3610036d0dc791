//! Audit feature slice.
//!
//! [`AuditLog::record`] never blocks and never fails the calling operation: events go onto
//! a bounded channel and a full or closed channel drops them with a warning. The
//! [`AuditWorker`] drains the channel, mirrors every event to the `audit` tracing target and
//! persists it through [`VaultRepository::append_audit`].
mod error;

pub use crate::error::{AuditError, AuditErrorExt};

use pvault_database::VaultRepository;
use pvault_domain::constants::AUDIT_TARGET;
use pvault_domain::records::{AuditKind, AuditRecord};
use pvault_kernel::clock::Clock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug)]
struct Shared {
    clock: Arc<dyn Clock>,
    dropped: AtomicU64,
}

/// Sending half of the audit trail. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AuditLog {
    tx: Sender<AuditRecord>,
    shared: Arc<Shared>,
}

/// Receiving half, turned into a running [`AuditWorker`] by [`AuditReceiver::spawn`].
#[derive(Debug)]
pub struct AuditReceiver {
    rx: Receiver<AuditRecord>,
}

impl AuditLog {
    /// Creates the channel. `capacity` is clamped to at least one slot.
    #[must_use]
    pub fn channel(capacity: usize, clock: Arc<dyn Clock>) -> (Self, AuditReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let shared = Arc::new(Shared { clock, dropped: AtomicU64::new(0) });
        (Self { tx, shared }, AuditReceiver { rx })
    }

    /// Queues one event. `provider_id` is `0` for service-level notices.
    pub fn record(&self, kind: AuditKind, provider_id: i64, message: impl Into<String>) {
        let record = AuditRecord {
            kind,
            provider_id,
            message: message.into(),
            log_date: self.shared.clock.now(),
        };

        match self.tx.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(kind = record.kind.as_str(), provider_id, "Audit queue full, event dropped");
            }
            Err(TrySendError::Closed(record)) => {
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(kind = record.kind.as_str(), provider_id, "Audit worker stopped, event dropped");
            }
        }
    }

    /// Events lost to a full or closed queue since startup.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

impl AuditReceiver {
    /// Starts draining into `repository` on the current runtime.
    #[must_use]
    pub fn spawn(self, repository: Arc<dyn VaultRepository>) -> AuditWorker {
        let token = CancellationToken::new();
        let handle = tokio::spawn(drain(self.rx, repository, token.clone()));
        AuditWorker { handle, token }
    }
}

/// Running audit consumer.
#[derive(Debug)]
pub struct AuditWorker {
    handle: JoinHandle<()>,
    token: CancellationToken,
}

impl AuditWorker {
    /// Stops accepting events, persists what is already queued and waits for the task.
    ///
    /// # Errors
    /// Returns [`AuditError::Join`] if the worker task panicked.
    pub async fn shutdown(self) -> Result<(), AuditError> {
        self.token.cancel();
        self.handle.await.context("Draining audit queue")?;
        Ok(())
    }
}

async fn drain(
    mut rx: Receiver<AuditRecord>,
    repository: Arc<dyn VaultRepository>,
    token: CancellationToken,
) {
    debug!("Audit worker started");
    loop {
        tokio::select! {
            () = token.cancelled() => break,
            next = rx.recv() => match next {
                Some(record) => persist(repository.as_ref(), record).await,
                None => break,
            },
        }
    }

    rx.close();
    while let Ok(record) = rx.try_recv() {
        persist(repository.as_ref(), record).await;
    }
    debug!("Audit worker stopped");
}

async fn persist(repository: &dyn VaultRepository, record: AuditRecord) {
    info!(
        target: AUDIT_TARGET,
        kind = record.kind.as_str(),
        log_type = record.kind.code(),
        provider_id = record.provider_id,
        log_date = record.log_date,
        "{}",
        record.message
    );

    if let Err(e) = repository.append_audit(record).await {
        warn!(error = %e, "Failed to persist audit record");
    }
}
