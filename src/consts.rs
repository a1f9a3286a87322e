//! # Constants
//!
//! Defaults applied when a caller leaves an option unset, plus the field names of the
//! vendor's batch envelope.

/// Default per-call timeout forwarded to the archive session, in seconds.
///
/// The crate never enforces this itself; it is only passed through.
pub const DEFAULT_TIMEOUT_SECS: i32 = 10;

/// Default number of records requested per chat batch.
///
/// The archive service caps a single batch at this many records.
pub const DEFAULT_BATCH_LIMIT: u32 = 1000;

/// Default proxy specification (empty = direct connection).
pub const DEFAULT_PROXY: &str = "";

/// Default archive passphrase (empty = none).
pub const DEFAULT_PASSWD: &str = "";

/// Prefix of the temporary files created by [`download_media`](crate::download_media).
pub const MEDIA_FILE_PREFIX: &str = "media-";

/// Length of the AES-256 key used by the vendor's symmetric payload scheme.
pub const SYMMETRIC_KEY_LEN: usize = 32;

/// Length of one AES block (and of the CBC IV).
pub const AES_BLOCK_LEN: usize = 16;

/// Byte length of the random symmetric keys produced when sealing envelopes.
pub const SEALED_KEY_LEN: usize = 32;

// Batch envelope field names.
pub const FIELD_ERRCODE: &str = "errcode";
pub const FIELD_ERRMSG: &str = "errmsg";
pub const FIELD_CHATDATA: &str = "chatdata";

/// File name of the vendor SDK shared library, resolved by the platform loader when no
/// explicit path is configured.
pub const DEFAULT_LIBRARY_NAME: &str = "libWeWorkFinanceSdk_C.so";
