//! Kernel utilities shared across slices.
//! Keep this crate lightweight: config loading, the injectable clock, and the system routes.
//!
//! ## Config loading
//! ```rust,ignore
//! use pvault_kernel::config::load_config;
//! use pvault_kernel::domain::config::ApiConfig;
//!
//! let cfg: ApiConfig = load_config(Some("server")).unwrap();
//! ```
pub mod clock;
pub mod config;
#[cfg(feature = "server")]
pub mod server;

pub use pvault_domain as domain;
