//! # Error Types
//!
//! This module defines the error types used throughout the library.
//! All fallible operations return [`Result<T, ArchiveError>`](ArchiveError).
//!
//! Expected failure modes of the archive service (bad cursor, network trouble, expired media)
//! are *not* errors at the public surface: [`fetch_chat_batch`](crate::fetch_chat_batch) and
//! [`download_media`](crate::download_media) fold them into a [`StatusCode`] on their result.

use crate::status::StatusCode;
use thiserror::Error;

/// The error type for all archive operations.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// I/O error while reading key material or writing media output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Structured data (batch envelope or configuration) could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-zero status reported by the archive session.
    ///
    /// Session implementations return this variant; the retrieval entry points convert it
    /// into a status-bearing result instead of propagating it.
    #[error("archive session returned status {0}")]
    Status(StatusCode),

    /// Private key material is missing, unreadable or malformed.
    ///
    /// This is treated as misuse and always aborts the call.
    #[error("private key error: {0}")]
    PrivateKey(String),

    /// A record's symmetric key was recovered but its payload could not be turned into
    /// structured data.
    #[error("payload of record {seq} could not be decoded: {reason}")]
    Payload {
        /// Sequence id of the offending record.
        seq: u64,
        /// What went wrong.
        reason: String,
    },

    /// Low-level cryptographic failure (key length, padding, encoding).
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// An argument cannot be handed to the archive session as given.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The vendor shared library could not be loaded or lacks a symbol.
    #[cfg(feature = "native")]
    #[error("library error: {0}")]
    Library(#[from] libloading::Error),
}

impl From<base64::DecodeError> for ArchiveError {
    fn from(err: base64::DecodeError) -> Self {
        ArchiveError::Crypto(format!("invalid base64: {err}"))
    }
}
