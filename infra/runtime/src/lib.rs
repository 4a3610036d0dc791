//! # Runtime
//!
//! Tokio runtime profiles for the vault binaries and the host-derived sizing rules shared
//! with the storage layer.
//!
//! ## Profiles
//! * **Server**: request handling plus the long-lived cluster loops.
//! * **Tool**: small footprint for one-shot maintenance binaries.
//!
//! ## Example
//!
//! ```rust,ignore
//! #[pvault_runtime::main(server)]
//! async fn main() -> anyhow::Result<()> {
//!     Ok(())
//! }
//! ```

pub use anyhow::Result;
pub use pvault_derive::main;

use anyhow::anyhow;
use std::{sync::OnceLock, thread::available_parallelism, time::Duration};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

/// The default number of worker threads if detection fails.
const DEFAULT_WORKER_THREADS: usize = 4;
/// The default stack size for threads (2 `MiB`).
const DEFAULT_STACK_SIZE: usize = 2 * 1024 * 1024;
/// Minimum allowed stack size (1 `MiB`).
const MIN_STACK_SIZE: usize = 1024 * 1024;
/// Maximum allowed stack size (16 `MiB`).
const MAX_STACK_SIZE: usize = 16 * 1024 * 1024;
/// Storage connections opened per detected core when no explicit size is configured.
const CONNECTIONS_PER_CORE: usize = 3;

static PARALLELISM: OnceLock<usize> = OnceLock::new();

/// Detected host parallelism, overridable through `TOKIO_WORKER_THREADS`.
pub fn host_parallelism() -> usize {
    *PARALLELISM.get_or_init(|| {
        std::env::var("TOKIO_WORKER_THREADS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&n| n > 0 && n <= 1024)
            .unwrap_or_else(|| {
                available_parallelism()
                    .map(std::num::NonZero::get)
                    .unwrap_or(DEFAULT_WORKER_THREADS)
            })
    })
}

/// Resolves the storage pool size. `0` means "derive from the host".
///
/// Pools perform best with two to four connections per core; the derived value uses three.
#[must_use]
pub fn pool_size(configured: usize) -> usize {
    pool_size_for(configured, host_parallelism())
}

fn pool_size_for(configured: usize, cores: usize) -> usize {
    if configured > 0 { configured } else { cores.max(1) * CONNECTIONS_PER_CORE }
}

/// Configuration for the Tokio runtime.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub worker_threads: usize,
    pub stack_size: usize,
    pub thread_name: String,
    pub thread_keep_alive: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: host_parallelism(),
            stack_size: DEFAULT_STACK_SIZE,
            thread_name: "pvault-worker".to_owned(),
            thread_keep_alive: Duration::from_secs(60),
        }
    }
}

impl RuntimeConfig {
    /// Preset for the vault server. Keeps one spare worker for the cluster loops.
    #[must_use = "Use this configuration for the vault server"]
    pub fn server() -> Self {
        Self {
            worker_threads: host_parallelism() + 1,
            stack_size: 4 * 1024 * 1024,
            thread_name: "pvault-srv".to_owned(),
            thread_keep_alive: Duration::from_secs(300),
        }
    }

    #[must_use = "Customize the number of worker threads for the runtime"]
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.clamp(1, 1024);
        self
    }

    #[must_use = "Customize the stack size for worker threads"]
    pub fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = size.clamp(MIN_STACK_SIZE, MAX_STACK_SIZE);
        self
    }

    #[must_use = "Customize the thread name"]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.thread_name = if name.trim().is_empty() { "pvault-worker".to_owned() } else { name };
        self
    }

    fn normalized(&self) -> Self {
        self.clone()
            .with_worker_threads(self.worker_threads)
            .with_stack_size(self.stack_size)
            .with_thread_name(self.thread_name.clone())
    }
}

/// Creates a multithreaded Tokio runtime with all drivers enabled.
///
/// Out-of-range values are clamped before the runtime is built (1-1024 workers, 1-16 `MiB`
/// stacks).
///
/// # Errors
///
/// Returns an [`anyhow::Error`] if the runtime cannot be created, typically due to OS
/// limits on thread creation.
pub fn build_runtime_with_config(config: &RuntimeConfig) -> Result<Runtime> {
    let config = config.normalized();
    debug!(config = ?config, "Building tokio runtime");

    Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .thread_name(&config.thread_name)
        .thread_stack_size(config.stack_size)
        .thread_keep_alive(config.thread_keep_alive)
        .enable_all()
        .build()
        .map_err(|e| anyhow!("Failed to initialize runtime: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_threads_validation() {
        let config = RuntimeConfig::default().with_worker_threads(0);
        assert_eq!(config.worker_threads, 1);

        let config = RuntimeConfig::default().with_worker_threads(2000);
        assert_eq!(config.worker_threads, 1024);
    }

    #[test]
    fn test_stack_size_validation() {
        let config = RuntimeConfig::default().with_stack_size(100);
        assert_eq!(config.stack_size, MIN_STACK_SIZE);

        let config = RuntimeConfig::default().with_stack_size(100 * 1024 * 1024);
        assert_eq!(config.stack_size, MAX_STACK_SIZE);
    }

    #[test]
    fn test_pool_size_prefers_configured_value() {
        assert_eq!(pool_size_for(7, 16), 7);
        assert_eq!(pool_size_for(0, 4), 12);
        assert_eq!(pool_size_for(0, 0), 3);
    }

    #[test]
    fn test_server_runtime_builds() {
        let rt = build_runtime_with_config(&RuntimeConfig::server()).expect("runtime");
        assert_eq!(rt.block_on(async { 2 + 2 }), 4);
    }
}
