//! src/crypto/envelope.rs
//! Sealing a message body into the archive's hybrid envelope
//!
//! The inverse of [`HybridDecryptor`](crate::HybridDecryptor): a fresh random key encrypts the
//! JSON body (AES-256-CBC, base64) and is itself wrapped with the recipient's RSA public key.
//! Used to populate [`MemoryArchive`](crate::session::memory::MemoryArchive) and by tests.

use crate::consts::SEALED_KEY_LEN;
use crate::crypto::{cbc, rsa::wrap_symmetric_key};
use crate::error::ArchiveError;
use crate::record::EncryptedRecord;
use rand::distributions::Alphanumeric;
use rand::Rng;
use rsa::RsaPublicKey;
use serde_json::{Map, Value};

/// Generate a random payload key.
///
/// Keys are printable ASCII so they survive the native SDK's C-string interface.
#[must_use]
pub fn random_payload_key() -> Vec<u8> {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SEALED_KEY_LEN)
        .collect()
}

/// Encrypt `content` for `public_key` under `symmetric_key`.
pub fn seal_with_key(
    public_key: &RsaPublicKey,
    symmetric_key: &[u8],
    content: &[u8],
) -> Result<(String, String), ArchiveError> {
    let payload_key = cbc::payload_key(symmetric_key)?;
    let encrypt_chat_msg = cbc::encrypt_to_base64(&payload_key, content);
    let encrypt_random_key = wrap_symmetric_key(public_key, symmetric_key)?;
    Ok((encrypt_random_key, encrypt_chat_msg))
}

/// Builder for sealed records.
#[derive(Debug, Clone)]
pub struct RecordSealer {
    seq: u64,
    msgid: Option<String>,
    publickey_ver: Option<u32>,
    metadata: Map<String, Value>,
}

impl RecordSealer {
    #[must_use]
    pub fn new(seq: u64) -> Self {
        Self {
            seq,
            msgid: Some(format!("msg-{seq}")),
            publickey_ver: None,
            metadata: Map::new(),
        }
    }

    #[must_use]
    pub fn with_msgid(mut self, msgid: impl Into<String>) -> Self {
        self.msgid = Some(msgid.into());
        self
    }

    #[must_use]
    pub fn with_publickey_ver(mut self, ver: u32) -> Self {
        self.publickey_ver = Some(ver);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Seal a JSON body.
    pub fn seal(self, public_key: &RsaPublicKey, content: &Value) -> Result<EncryptedRecord, ArchiveError> {
        let body = serde_json::to_vec(content)?;
        self.seal_bytes(public_key, &body)
    }

    /// Seal raw body bytes (which need not be valid JSON).
    pub fn seal_bytes(
        self,
        public_key: &RsaPublicKey,
        body: &[u8],
    ) -> Result<EncryptedRecord, ArchiveError> {
        let (encrypt_random_key, encrypt_chat_msg) =
            seal_with_key(public_key, &random_payload_key(), body)?;
        Ok(EncryptedRecord {
            seq: self.seq,
            msgid: self.msgid,
            publickey_ver: self.publickey_ver,
            encrypt_random_key,
            encrypt_chat_msg,
            metadata: self.metadata,
        })
    }
}
