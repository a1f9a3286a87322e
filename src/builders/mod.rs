//! # Builders
//!
//! Per-call options for the retrieval entry points.
//!
//! ## Modules
//!
//! - [`options`] - [`Transport`], [`FetchOptions`] and [`MediaOptions`]
//!
//! ## Usage
//!
//! Every builder starts from the defaults in [`consts`](crate::consts) (no proxy, no
//! passphrase, 10 s timeout, decryption on) and overrides fields fluently.

pub mod options;

pub use options::{DecodePolicy, FetchOptions, MediaOptions, Transport};
