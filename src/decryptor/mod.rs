// src/decryptor/mod.rs

//! Hybrid envelope decryption.
//!
//! Two stages per record:
//! 1. unwrap the RSA-encrypted symmetric key with the private key for the record's
//!    `publickey_ver` ([`HybridDecryptor::recover_key`]);
//! 2. hand the key and the encrypted payload to the session's symmetric primitive and
//!    parse the result as UTF-8 JSON ([`HybridDecryptor::open_payload`]).
//!
//! A failed first stage is a soft, per-record failure (`Ok(None)`). A failed second stage
//! is an [`ArchiveError::Payload`] for that record.

pub(crate) mod key;

pub use key::{KeyMaterial, Keyring, LazyPrivateKey};

use crate::aliases::RecoveredKey;
use crate::crypto::rsa::unwrap_symmetric_key;
use crate::error::ArchiveError;
use crate::record::{DecryptedRecord, EncryptedRecord};
use crate::session::{ArchiveSession, SliceBuffer};
use serde_json::Value;
use tracing::debug;

/// Stateless per call; the only state is the lazily resolved keyring.
#[derive(Debug)]
pub struct HybridDecryptor {
    keyring: Keyring,
}

impl HybridDecryptor {
    #[must_use]
    pub fn new(keyring: Keyring) -> Self {
        Self { keyring }
    }

    /// Decryptor with a single private key used for every record.
    #[must_use]
    pub fn with_key(material: KeyMaterial) -> Self {
        Self::new(Keyring::single(material))
    }

    #[must_use]
    pub fn keyring(&self) -> &Keyring {
        &self.keyring
    }

    /// Stage 1: recover the record's symmetric key.
    ///
    /// `Ok(None)` when no key is registered for the record's version or the envelope does
    /// not open. `Err` only when the selected private key itself cannot be loaded.
    pub fn recover_key(&self, record: &EncryptedRecord) -> Result<Option<RecoveredKey>, ArchiveError> {
        if self.keyring.is_empty() {
            return Err(ArchiveError::PrivateKey("no private key configured".into()));
        }
        let Some(lazy) = self.keyring.key_for(record.publickey_ver) else {
            debug!(seq = record.seq, publickey_ver = ?record.publickey_ver, "no private key for version");
            return Ok(None);
        };
        let private_key = lazy.get()?;
        Ok(unwrap_symmetric_key(private_key, &record.encrypt_random_key))
    }

    /// Stage 1 over a whole batch, in record order.
    pub fn recover_keys(
        &self,
        records: &[EncryptedRecord],
    ) -> Result<Vec<Option<RecoveredKey>>, ArchiveError> {
        #[cfg(feature = "batch-ops")]
        {
            crate::batch_ops::recover_keys_parallel(self, records)
        }
        #[cfg(not(feature = "batch-ops"))]
        {
            records.iter().map(|record| self.recover_key(record)).collect()
        }
    }

    /// Stage 2: decrypt `encrypted` with `key` through the session and parse it.
    pub fn open_payload<S: ArchiveSession>(
        &self,
        session: &S,
        seq: u64,
        key: &RecoveredKey,
        encrypted: &str,
    ) -> Result<Value, ArchiveError> {
        let slice = match session.decrypt_payload(key, encrypted) {
            Ok(slice) => slice,
            Err(ArchiveError::Status(status)) => {
                return Err(ArchiveError::Payload {
                    seq,
                    reason: format!("symmetric decrypt returned status {status}"),
                })
            }
            Err(e) => return Err(e),
        };

        let text = std::str::from_utf8(slice.content()).map_err(|e| ArchiveError::Payload {
            seq,
            reason: format!("not UTF-8: {e}"),
        })?;
        serde_json::from_str(text).map_err(|e| ArchiveError::Payload {
            seq,
            reason: format!("not JSON: {e}"),
        })
    }

    /// Both stages for one record.
    ///
    /// `Ok(None)` means the key could not be recovered and the record should be skipped.
    pub fn decrypt<S: ArchiveSession>(
        &self,
        session: &S,
        record: EncryptedRecord,
    ) -> Result<Option<DecryptedRecord>, ArchiveError> {
        let Some(key) = self.recover_key(&record)? else {
            return Ok(None);
        };
        let content = self.open_payload(session, record.seq, &key, &record.encrypt_chat_msg)?;
        Ok(Some(record.into_decrypted(content)))
    }
}
