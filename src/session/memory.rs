//! src/session/memory.rs
//! In-process archive session
//!
//! Serves sealed records and media objects from memory, applying the archive's symmetric
//! payload scheme itself. It backs the test suite and benches and can replay exported
//! archive data without the vendor library.
//!
//! It also counts buffer acquisitions and releases and can inject vendor statuses at any
//! step, which is what the lifecycle tests rely on.

use crate::aliases::RecoveredKey;
use crate::builders::Transport;
use crate::consts::{FIELD_CHATDATA, FIELD_ERRCODE, FIELD_ERRMSG};
use crate::crypto::cbc;
use crate::error::ArchiveError;
use crate::record::EncryptedRecord;
use crate::session::{ArchiveSession, ChunkBuffer, MediaCursor, SliceBuffer};
use crate::status::StatusCode;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Status returned for an unknown media id.
pub const STATUS_MEDIA_NOT_FOUND: StatusCode = StatusCode::from_raw(10010);

/// Status returned when a payload cannot be decrypted with the supplied key.
pub const STATUS_DECRYPT_FAILED: StatusCode = StatusCode::from_raw(10005);

/// Status returned for a malformed media continuation token.
pub const STATUS_BAD_INDEX: StatusCode = StatusCode::from_raw(10003);

/// Default chunk size; the vendor SDK delivers media in 512 KiB pieces.
pub const DEFAULT_CHUNK_SIZE: usize = 512 * 1024;

/// Buffer lifecycle counters shared by a session and the buffers it hands out.
#[derive(Debug, Default)]
pub struct BufferStats {
    slices_acquired: AtomicUsize,
    slices_released: AtomicUsize,
    chunks_acquired: AtomicUsize,
    chunks_released: AtomicUsize,
}

impl BufferStats {
    #[must_use]
    pub fn slices_acquired(&self) -> usize {
        self.slices_acquired.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn slices_released(&self) -> usize {
        self.slices_released.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn chunks_acquired(&self) -> usize {
        self.chunks_acquired.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn chunks_released(&self) -> usize {
        self.chunks_released.load(Ordering::SeqCst)
    }

    /// Every buffer handed out has been released.
    #[must_use]
    pub fn balanced(&self) -> bool {
        self.slices_acquired() == self.slices_released()
            && self.chunks_acquired() == self.chunks_released()
    }
}

/// Transport settings observed by one session call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedCall {
    pub operation: &'static str,
    pub proxy: String,
    pub timeout_secs: i32,
    /// Whether a non-empty proxy password came along; the value itself is not kept.
    pub has_passwd: bool,
    /// Cursor (chat) or continuation token (media) the call was made with.
    pub position: String,
}

#[derive(Debug, Default)]
struct Faults {
    chat_status: Option<StatusCode>,
    app_error: Option<(i32, String)>,
    decrypt_status: Option<StatusCode>,
    /// 1-based chunk number → status.
    media_status: HashMap<usize, StatusCode>,
    over_deliver: usize,
}

/// In-memory [`ArchiveSession`].
#[derive(Debug)]
pub struct MemoryArchive {
    records: Vec<EncryptedRecord>,
    media: HashMap<String, Vec<u8>>,
    chunk_size: usize,
    faults: Faults,
    stats: Arc<BufferStats>,
    calls: Mutex<Vec<ObservedCall>>,
}

impl Default for MemoryArchive {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryArchive {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            media: HashMap::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            faults: Faults::default(),
            stats: Arc::new(BufferStats::default()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Add a record. Records are served in sequence order regardless of insertion order.
    #[must_use]
    pub fn with_record(mut self, record: EncryptedRecord) -> Self {
        let at = self.records.partition_point(|r| r.seq <= record.seq);
        self.records.insert(at, record);
        self
    }

    #[must_use]
    pub fn with_records(self, records: impl IntoIterator<Item = EncryptedRecord>) -> Self {
        records.into_iter().fold(self, Self::with_record)
    }

    #[must_use]
    pub fn with_media(mut self, file_id: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.media.insert(file_id.into(), bytes.into());
        self
    }

    /// Size of the media chunks handed out (minimum 1).
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Make every chat fetch fail with `status`.
    #[must_use]
    pub fn fail_chat_fetch(mut self, status: StatusCode) -> Self {
        self.faults.chat_status = Some(status);
        self
    }

    /// Make chat fetches succeed at transport level but carry an application error code.
    #[must_use]
    pub fn with_app_error(mut self, errcode: i32, errmsg: impl Into<String>) -> Self {
        self.faults.app_error = Some((errcode, errmsg.into()));
        self
    }

    /// Make every payload decrypt fail with `status`.
    #[must_use]
    pub fn fail_payload_decrypt(mut self, status: StatusCode) -> Self {
        self.faults.decrypt_status = Some(status);
        self
    }

    /// Make the `nth` chunk request (1-based, counted per download) fail with `status`.
    #[must_use]
    pub fn fail_media_chunk(mut self, nth: usize, status: StatusCode) -> Self {
        self.faults.media_status.insert(nth, status);
        self
    }

    /// Return `extra` more records than requested, ignoring the limit.
    #[must_use]
    pub fn over_deliver(mut self, extra: usize) -> Self {
        self.faults.over_deliver = extra;
        self
    }

    #[must_use]
    pub fn stats(&self) -> Arc<BufferStats> {
        Arc::clone(&self.stats)
    }

    /// Calls observed so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<ObservedCall> {
        self.lock_calls().clone()
    }

    fn lock_calls(&self) -> MutexGuard<'_, Vec<ObservedCall>> {
        // A poisoned log is still a valid log.
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn observe(&self, operation: &'static str, transport: &Transport, position: String) {
        self.lock_calls().push(ObservedCall {
            operation,
            proxy: transport.proxy().to_string(),
            timeout_secs: transport.timeout_secs(),
            has_passwd: !transport.passwd().expose_secret().is_empty(),
            position,
        });
    }

    fn new_slice(&self) -> MemorySlice {
        self.stats.slices_acquired.fetch_add(1, Ordering::SeqCst);
        MemorySlice {
            content: Vec::new(),
            stats: Arc::clone(&self.stats),
        }
    }

    fn new_chunk(&self) -> MemoryChunk {
        self.stats.chunks_acquired.fetch_add(1, Ordering::SeqCst);
        MemoryChunk {
            data: Vec::new(),
            token: Vec::new(),
            is_final: false,
            stats: Arc::clone(&self.stats),
        }
    }

    fn batch_envelope(&self, cursor: u64, limit: u32) -> Result<Value, ArchiveError> {
        if let Some((errcode, errmsg)) = &self.faults.app_error {
            return Ok(json!({ FIELD_ERRCODE: errcode, FIELD_ERRMSG: errmsg, FIELD_CHATDATA: [] }));
        }
        let take = limit as usize + self.faults.over_deliver;
        let chatdata = self
            .records
            .iter()
            .filter(|r| r.seq > cursor)
            .take(take)
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(json!({ FIELD_ERRCODE: 0, FIELD_ERRMSG: "ok", FIELD_CHATDATA: chatdata }))
    }
}

fn parse_offset(cursor: &MediaCursor) -> Option<usize> {
    if cursor.is_start() {
        return Some(0);
    }
    std::str::from_utf8(cursor.as_bytes()).ok()?.parse().ok()
}

impl ArchiveSession for MemoryArchive {
    type Slice = MemorySlice;
    type Chunk = MemoryChunk;

    fn fetch_chat_batch(
        &self,
        cursor: u64,
        limit: u32,
        transport: &Transport,
    ) -> Result<MemorySlice, ArchiveError> {
        self.observe("chat", transport, cursor.to_string());
        let mut slice = self.new_slice();
        if let Some(status) = self.faults.chat_status {
            return Err(ArchiveError::Status(status));
        }
        slice.content = serde_json::to_vec(&self.batch_envelope(cursor, limit)?)?;
        Ok(slice)
    }

    fn fetch_media_chunk(
        &self,
        cursor: &MediaCursor,
        file_id: &str,
        transport: &Transport,
    ) -> Result<MemoryChunk, ArchiveError> {
        self.observe(
            "media",
            transport,
            String::from_utf8_lossy(cursor.as_bytes()).into_owned(),
        );
        let mut chunk = self.new_chunk();

        let bytes = self
            .media
            .get(file_id)
            .ok_or(ArchiveError::Status(STATUS_MEDIA_NOT_FOUND))?;
        let offset = parse_offset(cursor)
            .filter(|offset| *offset <= bytes.len())
            .ok_or(ArchiveError::Status(STATUS_BAD_INDEX))?;

        let nth = offset / self.chunk_size + 1;
        if let Some(status) = self.faults.media_status.get(&nth) {
            return Err(ArchiveError::Status(*status));
        }

        let end = offset.saturating_add(self.chunk_size).min(bytes.len());
        chunk.data = bytes[offset..end].to_vec();
        chunk.token = end.to_string().into_bytes();
        chunk.is_final = end == bytes.len();
        Ok(chunk)
    }

    fn decrypt_payload(
        &self,
        key: &RecoveredKey,
        encrypted: &str,
    ) -> Result<MemorySlice, ArchiveError> {
        let mut slice = self.new_slice();
        if let Some(status) = self.faults.decrypt_status {
            return Err(ArchiveError::Status(status));
        }
        let plaintext = cbc::payload_key(key.expose_secret())
            .and_then(|payload_key| cbc::decrypt_from_base64(&payload_key, encrypted))
            .map_err(|_| ArchiveError::Status(STATUS_DECRYPT_FAILED))?;
        slice.content = plaintext;
        Ok(slice)
    }
}

/// Slice buffer of a [`MemoryArchive`].
#[derive(Debug)]
pub struct MemorySlice {
    content: Vec<u8>,
    stats: Arc<BufferStats>,
}

impl SliceBuffer for MemorySlice {
    fn content(&self) -> &[u8] {
        &self.content
    }
}

impl Drop for MemorySlice {
    fn drop(&mut self) {
        self.stats.slices_released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Media chunk buffer of a [`MemoryArchive`].
#[derive(Debug)]
pub struct MemoryChunk {
    data: Vec<u8>,
    token: Vec<u8>,
    is_final: bool,
    stats: Arc<BufferStats>,
}

impl ChunkBuffer for MemoryChunk {
    fn data(&self) -> &[u8] {
        &self.data
    }

    fn continuation_token(&self) -> &[u8] {
        &self.token
    }

    fn is_final(&self) -> bool {
        self.is_final
    }
}

impl Drop for MemoryChunk {
    fn drop(&mut self) {
        self.stats.chunks_released.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_record(seq: u64) -> EncryptedRecord {
        serde_json::from_value(json!({
            "seq": seq,
            "msgid": format!("m{seq}"),
            "encrypt_random_key": "k",
            "encrypt_chat_msg": "c",
        }))
        .unwrap()
    }

    #[test]
    fn serves_records_after_cursor_in_order() {
        let archive = MemoryArchive::new().with_records([raw_record(3), raw_record(1), raw_record(2)]);
        let slice = archive.fetch_chat_batch(1, 10, &Transport::new()).unwrap();
        let envelope: Value = serde_json::from_slice(slice.content()).unwrap();
        let seqs: Vec<u64> = envelope["chatdata"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["seq"].as_u64().unwrap())
            .collect();
        assert_eq!(seqs, vec![2, 3]);
    }

    #[test]
    fn chunks_cover_the_object_exactly() {
        let archive = MemoryArchive::new()
            .with_media("f", b"abcdefghij".to_vec())
            .with_chunk_size(4);
        let transport = Transport::new();
        let mut cursor = MediaCursor::start();
        let mut collected = Vec::new();
        loop {
            let chunk = archive.fetch_media_chunk(&cursor, "f", &transport).unwrap();
            collected.extend_from_slice(chunk.data());
            cursor.advance(chunk.continuation_token());
            if chunk.is_final() {
                break;
            }
        }
        assert_eq!(collected, b"abcdefghij");
        assert_eq!(archive.stats().chunks_acquired(), 3);
        assert!(archive.stats().balanced());
    }

    #[test]
    fn errors_still_release_their_buffer() {
        let archive = MemoryArchive::new().fail_chat_fetch(StatusCode::from_raw(10001));
        let err = archive.fetch_chat_batch(0, 1, &Transport::new()).unwrap_err();
        assert!(matches!(err, ArchiveError::Status(s) if s.raw() == 10001));
        assert_eq!(archive.stats().slices_acquired(), 1);
        assert!(archive.stats().balanced());

        let err = archive
            .fetch_media_chunk(&MediaCursor::start(), "missing", &Transport::new())
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Status(s) if s == STATUS_MEDIA_NOT_FOUND));
        assert!(archive.stats().balanced());
    }

    #[test]
    fn records_transport_settings() {
        let archive = MemoryArchive::new();
        let transport = Transport::new().with_proxy("http://proxy:3128").with_timeout(42);
        let _ = archive.fetch_chat_batch(9, 5, &transport).unwrap();
        let calls = archive.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].operation, "chat");
        assert_eq!(calls[0].proxy, "http://proxy:3128");
        assert_eq!(calls[0].timeout_secs, 42);
        assert_eq!(calls[0].position, "9");
        assert!(!calls[0].has_passwd);

        let _ = archive
            .fetch_chat_batch(0, 1, &transport.with_passwd("s3cret"))
            .unwrap();
        assert!(archive.calls()[1].has_passwd);
    }

    #[test]
    fn oversized_chunk_size_serves_one_final_chunk() {
        let archive = MemoryArchive::new()
            .with_media("f", b"abcdef".to_vec())
            .with_chunk_size(usize::MAX);
        let chunk = archive
            .fetch_media_chunk(&MediaCursor::start(), "f", &Transport::new())
            .unwrap();
        assert_eq!(chunk.data(), b"abcdef");
        assert!(chunk.is_final());
        drop(chunk);
        assert!(archive.stats().balanced());
    }
}
