use pvault_audit::AuditLog;
use pvault_database::VaultRepository;
use pvault_domain::config::ApiConfig;
use pvault_kernel::clock::Clock;
use pvault_protocol::Dispatcher;
use std::ops::Deref;
use std::sync::Arc;

/// Service context handed to every request handler.
#[derive(Debug)]
pub struct AppStateInner {
    pub config: ApiConfig,
    pub repository: Arc<dyn VaultRepository>,
    pub dispatcher: Dispatcher,
    pub audit: AuditLog,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

impl AppState {
    pub(crate) fn new(inner: AppStateInner) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

impl Deref for AppState {
    type Target = AppStateInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// `/ping` reads the repository straight from the state.
#[cfg(feature = "server")]
impl axum::extract::FromRef<AppState> for Arc<dyn VaultRepository> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.inner.repository)
    }
}
