#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by the workspace crates.
//!
//! * [`pgpack_error`] turns a plain enum into a `thiserror` error with context support.
//! * [`main`] bootstraps an `async fn main` on a [`pgpack_runtime`] profile.
//!
//! [`pgpack_runtime`]: https://docs.rs/pgpack-runtime

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemFn, parse_macro_input};

/// Attribute macro to bootstrap the Tokio runtime from a named profile.
///
/// Transforms an `async fn main` into a standard `fn main` that builds a
/// `pgpack_runtime::RuntimeConfig` preset and blocks on the body.
///
/// # Arguments
///
/// * `default` - Multi-threaded scheduler sized from available parallelism.
/// * `memory_efficient` - Multi-threaded scheduler with half the workers and small stacks.
/// * `current_thread` - Single-threaded scheduler, for short-lived helpers.
///
/// # Examples
///
/// ```rust,ignore
/// #[pgpack_runtime::main(current_thread)]
/// async fn main() -> anyhow::Result<()> {
///     Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn main(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::runtime::expand_main(args.into(), input).into()
}

/// Attribute macro for domain error enums.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]` when missing.
/// * **Context Support**: Generates a companion `<Name>Ext` trait adding `.context(...)`
///   to `Result<T, Name>` and to `Result<T, Source>` for every variant with a source.
/// * **Conversions**: `From<Source>` for every variant with a `source` field (or a field
///   marked `#[source]`/`#[from]`), enabling `?` on upstream errors.
/// * **Internal Fallback**: `From<&'static str>` and `From<String>` when an `Internal`
///   variant with a `message` field exists.
/// * **Accessor**: an inherent `context()` method returning the attached context.
///
/// # Requirements
///
/// 1. The macro must be applied to an **enum** with named-field variants.
/// 2. Variants with a source must carry `context: Option<Cow<'static, str>>`.
///
/// # Example
///
/// ```rust,ignore
/// use std::borrow::Cow;
///
/// #[pgpack_derive::pgpack_error]
/// pub enum ProbeError {
///     #[error("I/O error{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal error{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn read(path: &str) -> Result<String, ProbeError> {
///     std::fs::read_to_string(path).context(format!("Reading {path}"))
/// }
/// ```
#[proc_macro_attribute]
pub fn pgpack_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand(input).into()
}
