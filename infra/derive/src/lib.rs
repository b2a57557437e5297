#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by the `MailShield` crates: the runtime bootstrap for
//! binaries and the `#[mshield_error]` attribute every crate uses for its error enum.
//!
//! Examples are `ignore`d to avoid compiling them inside a proc-macro crate.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemFn, parse_macro_input};

/// Attribute macro to bootstrap the tuned Tokio runtime.
///
/// Transforms an `async fn main` returning `Result` into a plain `fn main` that builds
/// a runtime from a `RuntimeConfig` profile and blocks on the body.
///
/// # Arguments
///
/// * `high_performance` - all cores, larger blocking pool.
/// * `memory_efficient` - a couple of workers, small stacks.
/// * `default` - worker threads auto-detected.
/// * `worker_threads = N` - default profile with an explicit worker count.
///
/// # Examples
///
/// ```rust,ignore
/// #[mshield_runtime::main(worker_threads = 4)]
/// async fn main() -> anyhow::Result<()> {
/// # Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn main(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::runtime::expand_main(args.into(), input).into()
}

/// Attribute macro for domain error enums.
///
/// # Generated Items
///
/// * `#[derive(Debug, thiserror::Error)]` when missing.
/// * `kind(&self) -> &'static str`, the snake_case variant name for log fields.
/// * `<ErrorName>Ext` trait with `.context(...)` for `Result<T, ErrorName>` and for
///   `Result<T, SourceError>` of every variant carrying a source.
/// * `From<SourceError>` for variants with a `source` field (or `#[source]`/`#[from]`).
/// * `From<&'static str>` and `From<String>` when an `Internal { message, context }`
///   variant exists.
/// * A module-private `format_context` helper for the `#[error(...)]` strings.
///
/// # Requirements
///
/// Variants must use named fields. Variants with a source must also carry
/// `context: Option<Cow<'static, str>>`.
///
/// # Example
///
/// ```rust,ignore
/// use mshield_derive::mshield_error;
/// use std::borrow::Cow;
///
/// #[mshield_error]
/// pub enum StoreError {
///     #[error("IO error{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn load(path: &str) -> Result<Vec<u8>, StoreError> {
///     std::fs::read(path).context("Reading snapshot")
/// }
/// ```
#[proc_macro_attribute]
pub fn mshield_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}
