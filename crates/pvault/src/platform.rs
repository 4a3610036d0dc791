use crate::error::{PlatformError, PlatformErrorExt};
use crate::state::{AppState, AppStateInner};
use pvault_audit::{AuditLog, AuditWorker};
use pvault_auth::Authorizer;
use pvault_cluster::BackgroundJobs;
use pvault_database::VaultRepository;
use pvault_domain::config::ApiConfig;
use pvault_domain::constants::SERVER_VERSION;
use pvault_domain::records::AuditKind;
use pvault_kernel::clock::{Clock, SystemClock};
use pvault_protocol::Dispatcher;
use pvault_vault::VaultService;
use std::sync::Arc;
use tracing::{info, warn};

/// Builds a [`Platform`]. Storage is opened from the config unless supplied.
#[must_use = "builders do nothing unless you call .start()"]
#[derive(Debug, Default)]
pub struct PlatformBuilder {
    config: Option<ApiConfig>,
    repository: Option<Arc<dyn VaultRepository>>,
    clock: Option<Arc<dyn Clock>>,
}

impl PlatformBuilder {
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn repository(mut self, repository: Arc<dyn VaultRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Opens storage, starts the audit worker and the background jobs.
    ///
    /// # Errors
    /// * [`PlatformError::Validation`] without a config.
    /// * [`PlatformError::Database`] when storage cannot be opened.
    pub async fn start(self) -> Result<Platform, PlatformError> {
        let config = self.config.ok_or_else(|| PlatformError::Validation {
            message: "ApiConfig not provided".into(),
            context: None,
        })?;
        let repository = match self.repository {
            Some(repository) => repository,
            None => pvault_database::open(&config.database).await.context("Opening storage")?,
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let check_ip = !config.vault.disable_ip_check;
        if !check_ip {
            warn!("Client IP checking is disabled");
        }

        let (audit, receiver) = AuditLog::channel(config.vault.audit_queue, Arc::clone(&clock));
        let audit_worker = receiver.spawn(Arc::clone(&repository));

        let auth = Authorizer::new(Arc::clone(&repository), audit.clone(), check_ip);
        let vault = VaultService::new(Arc::clone(&repository), audit.clone(), Arc::clone(&clock));
        let jobs =
            BackgroundJobs::start(Arc::clone(&repository), Arc::clone(&clock), &config.cluster)
                .await;

        audit.record(AuditKind::Notice, 0, format!("Service started (version {SERVER_VERSION})"));
        info!(version = SERVER_VERSION, background_jobs = jobs.len(), "Vault platform started");

        let state = AppState::new(AppStateInner {
            config,
            repository,
            dispatcher: Dispatcher::new(auth, vault),
            audit,
            clock,
        });
        Ok(Platform { state, audit_worker, jobs })
    }
}

/// Running service context and the tasks it owns.
#[must_use = "call .shutdown().await to drain the audit trail"]
#[derive(Debug)]
pub struct Platform {
    state: AppState,
    audit_worker: AuditWorker,
    jobs: BackgroundJobs,
}

impl Platform {
    pub fn builder() -> PlatformBuilder {
        PlatformBuilder::default()
    }

    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// Stops the background loops, records the stop notice and drains the audit queue.
    ///
    /// # Errors
    /// Returns an error if a background task panicked.
    pub async fn shutdown(self) -> Result<(), PlatformError> {
        self.jobs.shutdown().await.context("Stopping background jobs")?;
        self.state.audit.record(AuditKind::Notice, 0, "Service stopped");
        self.audit_worker.shutdown().await.context("Draining audit trail")?;
        info!("Vault platform stopped");
        Ok(())
    }
}
