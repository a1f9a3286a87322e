//! src/chat.rs
//! Chat batch retrieval

use crate::builders::{DecodePolicy, FetchOptions};
use crate::decryptor::HybridDecryptor;
use crate::error::ArchiveError;
use crate::record::{record_seq, ChatBatch, ChatRecords, EncryptedRecord};
use crate::session::{ArchiveSession, SliceBuffer};
use crate::status::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Outer JSON document of a chat fetch.
#[derive(Debug, Deserialize)]
struct BatchEnvelope {
    #[serde(default)]
    errcode: i32,
    #[serde(default)]
    errmsg: String,
    /// Kept untyped so raw batches pass through exactly as received.
    #[serde(default)]
    chatdata: Vec<Value>,
}

/// Fetch one batch of up to `limit` records with `seq > cursor`.
///
/// Both failure layers end up in [`ChatBatch::status`]: the session's transport status and
/// the `errcode` nested in the returned envelope. A failed batch always has empty records.
///
/// With `options.decrypt` set, every record's symmetric key is recovered through
/// `decryptor`. Records whose key cannot be recovered are left out and listed in
/// [`ChatBatch::skipped`]. A payload that does not decode aborts the call with
/// [`ArchiveError::Payload`] under [`DecodePolicy::Abort`] and is listed in
/// [`ChatBatch::undecodable`] under [`DecodePolicy::Skip`].
///
/// One session call per invocation: no retries and no pagination.
///
/// # Errors
/// - [`ArchiveError::PrivateKey`] when decryption is requested without a usable private key
/// - [`ArchiveError::Json`] when the envelope is not valid JSON, or when a record lacks the
///   fields decryption needs
/// - [`ArchiveError::Payload`] under [`DecodePolicy::Abort`]
pub fn fetch_chat_batch<S: ArchiveSession>(
    session: &S,
    decryptor: Option<&HybridDecryptor>,
    cursor: u64,
    limit: u32,
    options: &FetchOptions,
) -> Result<ChatBatch, ArchiveError> {
    if options.decrypt && decryptor.map_or(true, |d| d.keyring().is_empty()) {
        return Err(ArchiveError::PrivateKey(
            "decryption requested but no private key configured".into(),
        ));
    }

    let envelope: BatchEnvelope = {
        let slice = match session.fetch_chat_batch(cursor, limit, &options.transport) {
            Ok(slice) => slice,
            Err(ArchiveError::Status(status)) => {
                warn!(cursor, limit, %status, "chat fetch failed");
                return Ok(ChatBatch::failed(status, options.decrypt));
            }
            Err(e) => return Err(e),
        };
        serde_json::from_slice(slice.content())?
    };

    if envelope.errcode != 0 {
        let status = StatusCode::from_raw(envelope.errcode);
        warn!(cursor, %status, errmsg = %envelope.errmsg, "archive service rejected chat fetch");
        return Ok(ChatBatch::failed(status, options.decrypt));
    }

    let mut records = envelope.chatdata;
    if records.len() > limit as usize {
        warn!(
            returned = records.len(),
            limit, "archive returned more records than requested; truncating"
        );
        records.truncate(limit as usize);
    }
    let last_seq = records.iter().filter_map(record_seq).max();
    debug!(cursor, count = records.len(), ?last_seq, "chat batch fetched");

    let Some(decryptor) = decryptor.filter(|_| options.decrypt) else {
        return Ok(ChatBatch {
            status: StatusCode::OK,
            records: ChatRecords::Encrypted(records),
            skipped: Vec::new(),
            undecodable: Vec::new(),
            last_seq,
        });
    };

    let records = records
        .into_iter()
        .map(serde_json::from_value::<EncryptedRecord>)
        .collect::<Result<Vec<_>, _>>()?;
    let keys = decryptor.recover_keys(&records)?;
    let mut decrypted = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();
    let mut undecodable = Vec::new();

    for (record, key) in records.into_iter().zip(keys) {
        let Some(key) = key else {
            warn!(
                seq = record.seq,
                msgid = ?record.msgid,
                "symmetric key not recovered; record skipped"
            );
            skipped.push(record.seq);
            continue;
        };
        match decryptor.open_payload(session, record.seq, &key, &record.encrypt_chat_msg) {
            Ok(content) => decrypted.push(record.into_decrypted(content)),
            Err(err @ ArchiveError::Payload { .. }) => match options.decode_policy {
                DecodePolicy::Abort => return Err(err),
                DecodePolicy::Skip => {
                    warn!(seq = record.seq, error = %err, "payload not decodable; record skipped");
                    undecodable.push(record.seq);
                }
            },
            Err(e) => return Err(e),
        }
    }

    Ok(ChatBatch {
        status: StatusCode::OK,
        records: ChatRecords::Decrypted(decrypted),
        skipped,
        undecodable,
        last_seq,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::memory::MemoryArchive;

    #[test]
    fn transport_failure_becomes_status() {
        let archive = MemoryArchive::new().fail_chat_fetch(StatusCode::from_raw(10001));
        let batch =
            fetch_chat_batch(&archive, None, 0, 10, &FetchOptions::new().with_decrypt(false))
                .unwrap();
        assert_eq!(batch.status.raw(), 10001);
        assert!(batch.records.is_empty());
        assert!(archive.stats().balanced());
    }

    #[test]
    fn nested_errcode_becomes_status() {
        let archive = MemoryArchive::new().with_app_error(301042, "ip not in whitelist");
        let batch =
            fetch_chat_batch(&archive, None, 0, 10, &FetchOptions::new().with_decrypt(false))
                .unwrap();
        assert_eq!(batch.status.raw(), 301042);
        assert_eq!(batch.records, ChatRecords::Encrypted(Vec::new()));
    }

    #[test]
    fn decrypt_without_key_is_misuse() {
        let archive = MemoryArchive::new();
        let err = fetch_chat_batch(&archive, None, 0, 10, &FetchOptions::new()).unwrap_err();
        assert!(matches!(err, ArchiveError::PrivateKey(_)));
        assert!(archive.calls().is_empty());
    }
}
