//! src/crypto/rsa.rs
//! RSA PKCS#1 v1.5 wrapping of per-record symmetric keys

use crate::aliases::{PemKeyString, RecoveredKey};
use crate::error::ArchiveError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};

/// Parse a PEM private key, accepting both `RSA PRIVATE KEY` (PKCS#1) and
/// `PRIVATE KEY` (PKCS#8) armor.
///
/// Malformed key text is misuse, not a per-record failure, so this returns
/// [`ArchiveError::PrivateKey`].
pub fn parse_private_key_pem(pem: &PemKeyString) -> Result<RsaPrivateKey, ArchiveError> {
    let text = pem.expose_secret().trim();
    if text.is_empty() {
        return Err(ArchiveError::PrivateKey("private key is empty".into()));
    }

    let parsed = if text.contains("BEGIN RSA PRIVATE KEY") {
        RsaPrivateKey::from_pkcs1_pem(text).map_err(|e| e.to_string())
    } else {
        RsaPrivateKey::from_pkcs8_pem(text).map_err(|e| e.to_string())
    };

    parsed.map_err(|e| ArchiveError::PrivateKey(format!("malformed PEM private key: {e}")))
}

/// Recover a record's symmetric key from its base64 RSA ciphertext.
///
/// `None` is the sentinel for "this envelope cannot be opened": bad base64, a padding-check
/// failure, or an empty key. The decrypt is not constant-time with respect to padding
/// errors; the result never leaves this process, so there is no oracle to protect.
#[must_use]
pub fn unwrap_symmetric_key(key: &RsaPrivateKey, encrypted_b64: &str) -> Option<RecoveredKey> {
    let ciphertext = STANDARD.decode(encrypted_b64.trim()).ok()?;
    let recovered = key.decrypt(Pkcs1v15Encrypt, &ciphertext).ok()?;
    if recovered.is_empty() {
        return None;
    }
    Some(RecoveredKey::new(recovered))
}

/// Wrap `symmetric_key` for `public_key`, returning base64 text as carried in
/// `encrypt_random_key`.
pub fn wrap_symmetric_key(
    public_key: &RsaPublicKey,
    symmetric_key: &[u8],
) -> Result<String, ArchiveError> {
    let mut rng = rand::thread_rng();
    let ciphertext = public_key
        .encrypt(&mut rng, Pkcs1v15Encrypt, symmetric_key)
        .map_err(|e| ArchiveError::Crypto(format!("RSA encryption failed: {e}")))?;
    Ok(STANDARD.encode(ciphertext))
}
