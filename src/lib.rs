// src/lib.rs

//! Client for vendor chat-compliance archives.
//!
//! Records come out of the archive sealed: an RSA-wrapped per-message key plus a
//! symmetrically encrypted payload. [`fetch_chat_batch`] fetches one batch and opens every
//! envelope it can; [`download_media`] streams an attachment to disk chunk by chunk and
//! digests it on the way. The vendor SDK itself sits behind [`session::ArchiveSession`].

pub mod aliases;
#[cfg(feature = "batch-ops")]
pub mod batch_ops;
pub mod builders;
pub mod chat;
pub mod client;
pub mod config;
pub mod consts;
pub mod crypto;
pub mod decryptor;
pub mod error;
pub mod media;
pub mod record;
pub mod session;
pub mod status;
pub mod utils;

pub use builders::{DecodePolicy, FetchOptions, MediaOptions, Transport};
pub use chat::fetch_chat_batch;
pub use client::ArchiveClient;
pub use config::ArchiveConfig;
pub use crypto::checksum::ChecksumAlgorithm;
pub use decryptor::{HybridDecryptor, KeyMaterial, Keyring};
pub use error::ArchiveError;
pub use media::{download_media, stream_media, MediaDownload, StreamOutcome};
pub use record::{ChatBatch, ChatRecords, DecryptedRecord, EncryptedRecord, MediaRef};
pub use session::ArchiveSession;
pub use status::StatusCode;

#[cfg(feature = "batch-ops")]
pub use batch_ops::recover_keys_parallel;
