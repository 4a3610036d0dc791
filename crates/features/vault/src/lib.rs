//! Vault store slice.
//!
//! [`tokens`] holds the pure helpers (token generation and validation, search word
//! validation, de-duplication). [`VaultService`] implements the stateful operations on top
//! of a [`pvault_database::VaultRepository`].
mod error;
mod service;
pub mod tokens;

pub use crate::error::{VaultError, VaultErrorExt};
pub use crate::service::{CheckReport, Lookup, TokenSource, VaultService};
