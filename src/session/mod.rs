// src/session/mod.rs

//! The archive SDK boundary.
//!
//! The vendor SDK owns session setup, transport, proxying and the chunked wire protocol.
//! This crate only needs the narrow capability set below. Any binding (the native shared
//! library, an RPC sidecar, the in-process [`memory::MemoryArchive`]) can implement it.
//!
//! Buffers handed out by a session are scoped to one call and release their native
//! resources in `Drop`, so every exit path (success, error status, early `?`) frees them
//! exactly once.

pub mod memory;
#[cfg(feature = "native")]
pub mod native;

use crate::aliases::RecoveredKey;
use crate::builders::Transport;
use crate::error::ArchiveError;

/// A text/byte buffer returned by a chat fetch or a payload decrypt.
pub trait SliceBuffer {
    /// The buffer contents, exactly as produced by the session.
    fn content(&self) -> &[u8];
}

/// One chunk of a media object.
pub trait ChunkBuffer {
    /// The chunk's bytes. Length comes from the declared chunk length, never from a
    /// terminator, since media may contain NUL bytes.
    fn data(&self) -> &[u8];

    /// Continuation token to send with the next chunk request.
    fn continuation_token(&self) -> &[u8];

    /// `true` when this is the last chunk of the object.
    fn is_final(&self) -> bool;
}

/// An initialized archive session.
///
/// Every fetch returns [`ArchiveError::Status`] for a non-zero vendor status. Other errors
/// are reserved for local problems (argument conversion, I/O).
pub trait ArchiveSession {
    type Slice: SliceBuffer;
    type Chunk: ChunkBuffer;

    /// Fetch up to `limit` records with a sequence id greater than `cursor`.
    ///
    /// The returned buffer holds the batch envelope JSON
    /// (`{"errcode":..,"errmsg":..,"chatdata":[..]}`).
    fn fetch_chat_batch(
        &self,
        cursor: u64,
        limit: u32,
        transport: &Transport,
    ) -> Result<Self::Slice, ArchiveError>;

    /// Fetch the chunk following `cursor` of media object `file_id`.
    fn fetch_media_chunk(
        &self,
        cursor: &MediaCursor,
        file_id: &str,
        transport: &Transport,
    ) -> Result<Self::Chunk, ArchiveError>;

    /// Apply the vendor's symmetric decryption to one record payload.
    fn decrypt_payload(
        &self,
        key: &RecoveredKey,
        encrypted: &str,
    ) -> Result<Self::Slice, ArchiveError>;
}

/// Opaque position within a media stream.
///
/// Starts empty, is replaced by every chunk's continuation token, and lives only for one
/// download.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaCursor(Vec<u8>);

impl MediaCursor {
    /// The cursor of a fresh download.
    #[must_use]
    pub fn start() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn is_start(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Replace the position with the token the session just returned.
    pub fn advance(&mut self, token: &[u8]) {
        self.0.clear();
        self.0.extend_from_slice(token);
    }
}
