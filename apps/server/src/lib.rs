//! # Vault Server
//!
//! HTTP transport for the vault protocol, built on `Axum` and `axum-server`.
//!
//! ## Example
//! ```no_run
//! use pvault_server::Server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Server::builder()
//!         .port(4583)
//!         .build()
//!         .await?
//!         .run()
//!         .await
//! }
//! ```

pub mod client_ip;
pub mod router;

use anyhow::{Context, Result};
use axum_server::Handle;
use pvault::Platform;
use pvault::domain::config::{ApiConfig, LogConfig};
use pvault_logger::{Logger, parse_level};
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info};

/// A fluent builder for configuring and initializing the [`Server`].
#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug, Default)]
pub struct ServerBuilder {
    cfg: ApiConfig,
}

impl ServerBuilder {
    /// Set up the server's configuration.
    pub fn config(mut self, cfg: ApiConfig) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.cfg.server.port = port;
        self
    }

    fn validate_ssl_config(&self) -> Result<()> {
        if let Some(ssl) = &self.cfg.server.ssl {
            if !ssl.cert.exists() {
                anyhow::bail!("SSL certificate not found at: {}", ssl.cert.display());
            }
            if !ssl.key.exists() {
                anyhow::bail!("SSL key not found at: {}", ssl.key.display());
            }

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let metadata = ssl.key.metadata()?;
                if metadata.permissions().mode() & 0o077 != 0 {
                    tracing::warn!(
                        "SECURITY: SSL Private Key {} has insecure permissions (should be 600)",
                        ssl.key.display()
                    );
                }
            }
        }
        Ok(())
    }

    /// Consumes the builder and starts the vault platform.
    ///
    /// # Errors
    /// Returns an error if:
    /// * SSL certificate/key files are missing
    /// * Storage cannot be opened (unreachable host, invalid credentials, schema failure)
    pub async fn build(self) -> Result<Server> {
        self.validate_ssl_config()?;

        let address = SocketAddr::new(self.cfg.server.address, self.cfg.server.port);
        info!(address = %address, "Initializing server");

        let platform = Platform::builder()
            .config(self.cfg)
            .start()
            .await
            .context("Platform bootstrap failed")?;
        Ok(Server { platform })
    }
}

/// A fully initialized server instance ready to run.
#[must_use = "call .run().await to start the server"]
#[derive(Debug)]
pub struct Server {
    platform: Platform,
}

impl Server {
    /// Returns a new [`ServerBuilder`] to configure the server.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Serves until a shutdown signal arrives, then stops the background jobs and drains the
    /// audit trail.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the configured address
    /// or if SSL/TLS setup fails.
    pub async fn run(self) -> Result<()> {
        let state = self.platform.state().clone();
        let cfg = state.config.clone();
        let address = SocketAddr::new(cfg.server.address, cfg.server.port);

        info!(address = %address, ssl = cfg.server.ssl.is_some(), "Starting server");

        let app = router::init(state).into_make_service_with_connect_info::<SocketAddr>();

        let handle = Handle::<SocketAddr>::new();
        let shutdown_handle = handle.clone();

        tokio::spawn(async move {
            if let Err(e) = shutdown_signal().await {
                error!("Error while waiting for shutdown signal: {e}");
                return;
            }
            info!("Shutdown signal received, starting graceful shutdown...");
            shutdown_handle.graceful_shutdown(Some(std::time::Duration::from_secs(30)));
        });

        let served = if let Some(ssl_config) = &cfg.server.ssl {
            info!("Starting HTTPS server on https://{address}");

            let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                &ssl_config.cert,
                &ssl_config.key,
            )
            .await
            .context("Failed to load SSL/TLS certificates")?;

            axum_server::bind_rustls(address, tls_config)
                .handle(handle)
                .serve(app)
                .await
                .context("HTTPS server failed")
        } else {
            info!("Starting HTTP server on http://{address}");

            axum_server::bind(address).handle(handle).serve(app).await.context("HTTP server failed")
        };

        self.platform.shutdown().await.context("Platform shutdown failed")?;
        served?;

        info!("Server shutdown complete");
        Ok(())
    }

    /// Returns the running platform.
    #[must_use]
    pub const fn platform(&self) -> &Platform {
        &self.platform
    }
}

/// Global subscriber from the `log` section: console always, optional rolling file
/// (plain or JSON) and optional audit file.
///
/// # Errors
/// Returns an error for an invalid filter or if a subscriber is already installed.
pub fn init_logger(log: &LogConfig) -> Result<Logger> {
    let mut builder = Logger::builder().name(env!("CARGO_PKG_NAME")).level(parse_level(&log.level));
    if let Some(filter) = &log.filter {
        builder = builder.env_filter(filter);
    }
    if let Some(audit_path) = &log.audit_path {
        builder = builder.audit_path(audit_path);
    }

    let logger = match &log.path {
        Some(path) if log.json => builder.path(path).json().init(),
        Some(path) => builder.path(path).init(),
        None => builder.init(),
    };
    logger.context("Failed to initialize logging")
}

/// Listens for shutdown signals (Ctrl+C, SIGTERM).
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.context("Failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<_, anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        res = ctrl_c => {
            res.context("Ctrl+C signal received")?;
        },
        res = terminate => {
            res.context("SIGTERM signal received")?;
        },
    }

    Ok(())
}
