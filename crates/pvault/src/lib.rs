//! Facade crate for the vault slices.
//! Re-exports domain/kernel primitives and wires the slices into one service context.
//! Keep this crate thin: it composes other crates and holds no business logic.
//!
//! ## Usage
//! ```rust,no_run
//! # async fn run() -> Result<(), pvault::PlatformError> {
//! let platform = pvault::Platform::builder()
//!     .config(pvault::domain::config::ApiConfig::default())
//!     .start()
//!     .await?;
//! // serve requests with platform.state().dispatcher
//! platform.shutdown().await
//! # }
//! ```
mod error;
mod platform;
mod state;

pub use crate::error::{PlatformError, PlatformErrorExt};
pub use crate::platform::{Platform, PlatformBuilder};
pub use crate::state::{AppState, AppStateInner};
pub use pvault_domain as domain;
pub use pvault_kernel as kernel;

#[cfg(feature = "server")]
pub mod server {
    pub mod router {
        pub use pvault_kernel::server::system_router;
    }
}

/// Feature slices, re-exported for binaries and tests.
pub mod features {
    pub use pvault_audit as audit;
    pub use pvault_auth as auth;
    pub use pvault_cluster as cluster;
    pub use pvault_protocol as protocol;
    pub use pvault_vault as vault;
}
