//! # Database Infrastructure
//!
//! Storage seam for the vault. [`VaultRepository`] is the only surface the service crates
//! see; two backends implement it:
//!
//! - [`SurrealRepository`]: [SurrealDB](https://surrealdb.com) through the `any` engine
//!   (`mem://`, `rocksdb://`, `ws://`, `http://`). Multi-table writes run inside
//!   `BEGIN/COMMIT TRANSACTION` blocks and unique indexes guard `vid`, `sid` and `node_id`.
//! - [`MemoryRepository`]: an in-process backend selected with `memory://`, also used as
//!   the storage test double.
//!
//! ## Example
//!
//! ```rust
//! use pvault_database::{DatabaseError, open};
//! use pvault_domain::config::DatabaseConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), DatabaseError> {
//!     let config = DatabaseConfig { url: "memory://".to_owned(), ..DatabaseConfig::default() };
//!     let repository = open(&config).await?;
//!     repository.ping().await?;
//!     Ok(())
//! }
//! ```

mod error;
mod memory;
mod repository;
mod schema;
mod surreal;

pub use crate::error::{DatabaseError, DatabaseErrorExt};
pub use crate::memory::MemoryRepository;
pub use crate::repository::{InsertOutcome, VaultRepository};
pub use crate::surreal::{Database, DatabaseBuilder, SurrealRepository};

use pvault_domain::config::DatabaseConfig;
use std::sync::Arc;
use tracing::info;

/// URL selecting the in-process backend.
pub const MEMORY_URL: &str = "memory://";

/// Opens the backend named by `config.url`.
///
/// # Errors
/// Propagates connection, authentication and schema errors from [`DatabaseBuilder::init`].
pub async fn open(config: &DatabaseConfig) -> Result<Arc<dyn VaultRepository>, DatabaseError> {
    if config.url == MEMORY_URL {
        info!("Using in-process storage backend");
        return Ok(Arc::new(MemoryRepository::new()));
    }

    let mut builder =
        Database::builder().url(&config.url).session(&config.namespace, &config.database);
    if let Some(credentials) = &config.credentials {
        builder = builder.auth(&credentials.username, &credentials.password);
    }
    let db = builder.init().await?;

    let pool = pvault_runtime::pool_size(config.max_connections);
    info!(pool, "SurrealDB storage backend ready");
    Ok(Arc::new(SurrealRepository::new(db, pool)))
}
