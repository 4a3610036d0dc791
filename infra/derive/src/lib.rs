#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros for the vault infrastructure.
//! This crate removes the boilerplate around error enums and the service runtime bootstrap.
//!
//! See each macro’s docstring for examples; they are `ignore`d to avoid compiling in this crate.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemFn, parse_macro_input};

/// Attribute macro to bootstrap the service Tokio runtime.
///
/// Transforms an `async fn main` into a standard `fn main` that builds a runtime from one of
/// the [`pvault_runtime::RuntimeConfig`] profiles and blocks on the body.
///
/// # Arguments
///
/// * `server` - Sized for request handling plus the background cluster loops.
/// * `default` - Worker threads auto-detected from available parallelism.
///
/// # Examples
///
/// ```rust,ignore
/// #[pvault_runtime::main(server)]
/// async fn main() -> anyhow::Result<()> {
/// # Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn main(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::runtime::expand_main(args.into(), input).into()
}

/// Attribute macro for the error enums used across the workspace.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]` when missing.
/// * **Context Support**: Generates a companion `...Ext` trait that adds `.context()`
///   to any `Result` that can be converted into this error type.
/// * **Standard Conversions**: Implements `From<T>` for variants containing a `source` field,
///   so upstream errors flow through `?`.
/// * **Internal Fallback**: `From<&str>` and `From<String>` when an `Internal` variant exists.
/// * **Wire Codes**: Variants tagged `#[code(NotFound)]` map to
///   `pvault_domain::constants::ErrorCode` through a generated `code()` method. Untagged
///   variants report `InternalError`. Nothing is generated when no variant is tagged.
///
/// # Requirements
///
/// 1. The macro must be applied to an **enum** with named-field variants.
/// 2. Variants with a `source` field must also carry `context: Option<Cow<'static, str>>`.
///
/// # Example
///
/// ```rust,ignore
/// use std::borrow::Cow;
///
/// #[pvault_derive::pvault_error]
/// pub enum LookupError {
///     #[code(NotFound)]
///     #[error("Entry not found{}: {message}", format_context(.context))]
///     NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
///
///     #[error("Storage failure{}: {source}", format_context(.context))]
///     Storage { source: std::io::Error, context: Option<Cow<'static, str>> },
/// }
///
/// fn load() -> Result<Vec<u8>, LookupError> {
///     std::fs::read("entry.bin").context("Reading entry")
/// }
/// ```
#[proc_macro_attribute]
pub fn pvault_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}
