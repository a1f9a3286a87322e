//! src/media.rs
//! Chunked media retrieval
//!
//! The archive hands out media in bounded chunks. Each chunk carries its bytes, a
//! continuation token for the next request and an is-final flag. The assembler drives that
//! loop, writes exactly the declared bytes of every chunk and digests them as they pass.

use crate::builders::MediaOptions;
use crate::consts::MEDIA_FILE_PREFIX;
use crate::error::ArchiveError;
use crate::session::{ArchiveSession, ChunkBuffer, MediaCursor};
use crate::status::StatusCode;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Result of streaming one media object into a writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    pub status: StatusCode,
    /// Hex digest of the bytes written; `None` unless the stream completed.
    pub checksum: Option<String>,
    pub bytes_written: u64,
    /// Number of chunks fetched, including a failed final attempt.
    pub chunks: usize,
}

impl StreamOutcome {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}

/// Stream media object `file_id` into `writer`.
///
/// A non-zero session status stops the loop at once and is returned in
/// [`StreamOutcome::status`] with no checksum; the bytes already written stay written.
/// Every chunk buffer is released before the next one is requested.
///
/// # Errors
/// Local failures only: writing to `writer`, or arguments the session cannot accept.
pub fn stream_media<S: ArchiveSession, W: Write>(
    session: &S,
    file_id: &str,
    writer: &mut W,
    options: &MediaOptions,
) -> Result<StreamOutcome, ArchiveError> {
    let mut cursor = MediaCursor::start();
    let mut digest = options.checksum.hasher();
    let mut bytes_written = 0u64;
    let mut chunks = 0usize;

    loop {
        chunks += 1;
        let chunk = match session.fetch_media_chunk(&cursor, file_id, &options.transport) {
            Ok(chunk) => chunk,
            Err(ArchiveError::Status(status)) => {
                warn!(file_id, chunk = chunks, %status, bytes_written, "media fetch failed");
                writer.flush()?;
                return Ok(StreamOutcome {
                    status,
                    checksum: None,
                    bytes_written,
                    chunks,
                });
            }
            Err(e) => return Err(e),
        };

        let data = chunk.data();
        writer.write_all(data)?;
        digest.update(data);
        bytes_written += data.len() as u64;
        cursor.advance(chunk.continuation_token());

        // Read the flag before the buffer goes away.
        let is_final = chunk.is_final();
        drop(chunk);
        debug!(file_id, chunk = chunks, bytes_written, is_final, "media chunk received");

        if is_final {
            break;
        }
    }

    writer.flush()?;
    debug!(file_id, chunks, bytes_written, "media stream complete");
    Ok(StreamOutcome {
        status: StatusCode::OK,
        checksum: Some(digest.finalize_hex()),
        bytes_written,
        chunks,
    })
}

/// A media object written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDownload {
    pub status: StatusCode,
    /// The output file. Present on failure too, holding whatever arrived before the error.
    pub path: PathBuf,
    /// Hex digest of the file contents; `None` unless the download completed.
    pub checksum: Option<String>,
    pub bytes_written: u64,
    pub chunks: usize,
}

impl MediaDownload {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    /// Compare the checksum against an announced hex digest, ignoring case.
    #[must_use]
    pub fn matches_md5(&self, expected: &str) -> bool {
        self.checksum
            .as_deref()
            .is_some_and(|actual| actual.eq_ignore_ascii_case(expected.trim()))
    }
}

/// Download media object `file_id` into a fresh, uniquely named file inside `dir`.
///
/// The file is created before the first chunk is requested and is kept on failure, so a
/// partial download can be inspected. Each call starts from an empty cursor and a new file.
/// The file is flushed and synced before the checksum is returned.
///
/// # Errors
/// Creating, writing or syncing the output file, or local session errors.
pub fn download_media<S: ArchiveSession>(
    session: &S,
    file_id: &str,
    dir: &Path,
    options: &MediaOptions,
) -> Result<MediaDownload, ArchiveError> {
    let (file, path) = tempfile::Builder::new()
        .prefix(MEDIA_FILE_PREFIX)
        .tempfile_in(dir)?
        .keep()
        .map_err(|e| ArchiveError::Io(e.error))?;
    debug!(file_id, path = %path.display(), "media output file created");

    let mut writer = BufWriter::new(file);
    let outcome = stream_media(session, file_id, &mut writer, options)?;
    let file: File = writer.into_inner().map_err(|e| ArchiveError::Io(e.into_error()))?;
    file.sync_all()?;

    Ok(MediaDownload {
        status: outcome.status,
        path,
        checksum: outcome.checksum,
        bytes_written: outcome.bytes_written,
        chunks: outcome.chunks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::memory::MemoryArchive;

    #[test]
    fn stream_into_memory() {
        let archive = MemoryArchive::new()
            .with_media("f", vec![7u8; 10])
            .with_chunk_size(3);
        let mut out = Vec::new();
        let outcome = stream_media(&archive, "f", &mut out, &MediaOptions::new()).unwrap();
        assert!(outcome.is_ok());
        assert_eq!(out, vec![7u8; 10]);
        assert_eq!(outcome.chunks, 4);
        assert_eq!(outcome.bytes_written, 10);
        assert!(archive.stats().balanced());
    }

    #[test]
    fn failure_has_no_checksum() {
        let archive = MemoryArchive::new()
            .with_media("f", vec![1u8; 10])
            .with_chunk_size(4)
            .fail_media_chunk(2, StatusCode::from_raw(10002));
        let mut out = Vec::new();
        let outcome = stream_media(&archive, "f", &mut out, &MediaOptions::new()).unwrap();
        assert_eq!(outcome.status.raw(), 10002);
        assert_eq!(outcome.checksum, None);
        assert_eq!(out.len(), 4);
        assert!(archive.stats().balanced());
    }

    #[test]
    fn matches_md5_ignores_case() {
        let download = MediaDownload {
            status: StatusCode::OK,
            path: PathBuf::new(),
            checksum: Some("abcdef".into()),
            bytes_written: 0,
            chunks: 1,
        };
        assert!(download.matches_md5("ABCDEF"));
        assert!(!download.matches_md5("abcde0"));
    }
}
