//! src/crypto/cbc.rs
//! AES-256-CBC payload scheme used by the archive for message bodies
//!
//! Key: 32 bytes. IV: the first 16 bytes of the key. Padding: PKCS#7. Text form: base64.

use crate::aliases::{Aes256Key32, Block16, Iv16};
use crate::consts::{AES_BLOCK_LEN, SYMMETRIC_KEY_LEN};
use crate::error::ArchiveError;
use crate::utils::xor_blocks;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes256Dec, Aes256Enc, Block as AesBlock};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Build the payload key from recovered key bytes.
pub fn payload_key(bytes: &[u8]) -> Result<Aes256Key32, ArchiveError> {
    if bytes.len() != SYMMETRIC_KEY_LEN {
        return Err(ArchiveError::Crypto(format!(
            "payload key must be {SYMMETRIC_KEY_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    let mut key = Aes256Key32::new([0u8; SYMMETRIC_KEY_LEN]);
    key.expose_secret_mut().copy_from_slice(bytes);
    Ok(key)
}

#[inline(always)]
fn derive_iv(key: &Aes256Key32) -> Iv16 {
    let mut iv = Iv16::new([0u8; AES_BLOCK_LEN]);
    iv.expose_secret_mut()
        .copy_from_slice(&key.expose_secret()[..AES_BLOCK_LEN]);
    iv
}

/// Encrypt `plaintext`, returning raw ciphertext (always a non-empty multiple of 16).
pub fn encrypt(key: &Aes256Key32, plaintext: &[u8]) -> Vec<u8> {
    let cipher = Aes256Enc::new(key.expose_secret().into());
    let mut prev_block: [u8; 16] = *derive_iv(key).expose_secret();
    let mut output = Vec::with_capacity(plaintext.len() + AES_BLOCK_LEN);

    let mut chunks = plaintext.chunks_exact(AES_BLOCK_LEN);
    let mut plaintext_block = Block16::new([0u8; 16]);

    loop {
        let is_final = match chunks.next() {
            Some(chunk) => {
                plaintext_block.expose_secret_mut().copy_from_slice(chunk);
                false
            }
            None => {
                let rest = chunks.remainder();
                let pad = (AES_BLOCK_LEN - rest.len()) as u8;
                let block = plaintext_block.expose_secret_mut();
                block[..rest.len()].copy_from_slice(rest);
                block[rest.len()..].fill(pad);
                true
            }
        };

        let mut xor_output = [0u8; 16];
        xor_blocks(plaintext_block.expose_secret(), &prev_block, &mut xor_output);

        let mut aes_block = AesBlock::from(xor_output);
        cipher.encrypt_block(&mut aes_block);
        prev_block.copy_from_slice(aes_block.as_slice());
        output.extend_from_slice(&prev_block);

        if is_final {
            break;
        }
    }

    output
}

/// Decrypt raw ciphertext and strip PKCS#7 padding.
pub fn decrypt(key: &Aes256Key32, ciphertext: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    if ciphertext.is_empty() || ciphertext.len() % AES_BLOCK_LEN != 0 {
        return Err(ArchiveError::Crypto(format!(
            "ciphertext length {} is not a positive multiple of {AES_BLOCK_LEN}",
            ciphertext.len()
        )));
    }

    let cipher = Aes256Dec::new(key.expose_secret().into());
    let mut prev_block: [u8; 16] = *derive_iv(key).expose_secret();
    let mut output = Vec::with_capacity(ciphertext.len());

    for chunk in ciphertext.chunks_exact(AES_BLOCK_LEN) {
        let mut aes_block = *AesBlock::from_slice(chunk);
        cipher.decrypt_block(&mut aes_block);

        let mut plaintext_block = Block16::new([0u8; 16]);
        xor_blocks(
            aes_block.as_slice(),
            &prev_block,
            plaintext_block.expose_secret_mut(),
        );
        output.extend_from_slice(plaintext_block.expose_secret());
        prev_block.copy_from_slice(chunk);
    }

    let padding = output[output.len() - 1];
    if padding == 0 || padding as usize > AES_BLOCK_LEN {
        return Err(ArchiveError::Crypto("invalid PKCS#7 padding".into()));
    }
    let body_len = output.len() - padding as usize;
    if output[body_len..].iter().any(|&b| b != padding) {
        return Err(ArchiveError::Crypto("corrupt PKCS#7 padding".into()));
    }
    output.truncate(body_len);
    Ok(output)
}

/// Encrypt and base64-encode, producing the text form carried in `encrypt_chat_msg`.
pub fn encrypt_to_base64(key: &Aes256Key32, plaintext: &[u8]) -> String {
    STANDARD.encode(encrypt(key, plaintext))
}

/// Inverse of [`encrypt_to_base64`].
pub fn decrypt_from_base64(key: &Aes256Key32, text: &str) -> Result<Vec<u8>, ArchiveError> {
    let ciphertext = STANDARD.decode(text.trim())?;
    decrypt(key, &ciphertext)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> Aes256Key32 {
        payload_key(b"0123456789abcdef0123456789abcdef").unwrap()
    }

    #[test]
    fn padding_always_adds_a_block_fragment() {
        let key = key();
        for (len, expected) in [(0usize, 16usize), (1, 16), (15, 16), (16, 32), (17, 32)] {
            let ct = encrypt(&key, &vec![0x41; len]);
            assert_eq!(ct.len(), expected, "plaintext len {len}");
            assert_eq!(decrypt(&key, &ct).unwrap(), vec![0x41; len]);
        }
    }

    #[test]
    fn iv_is_taken_from_the_key() {
        // Empty plaintext encrypts to one full padding block: AES(0x10.. XOR key[..16]).
        let key = key();
        let ct = encrypt(&key, &[]);
        let mut chained = [0u8; 16];
        xor_blocks(&[0x10u8; 16], &key.expose_secret()[..16], &mut chained);
        let mut expected = AesBlock::from(chained);
        Aes256Enc::new(key.expose_secret().into()).encrypt_block(&mut expected);
        assert_eq!(ct.as_slice(), expected.as_slice());
    }

    #[test]
    fn rejects_wrong_key_length() {
        assert!(matches!(payload_key(b"short"), Err(ArchiveError::Crypto(_))));
    }

    #[test]
    fn rejects_truncated_ciphertext() {
        let key = key();
        let mut ct = encrypt(&key, b"hello world");
        ct.pop();
        assert!(matches!(decrypt(&key, &ct), Err(ArchiveError::Crypto(_))));
        assert!(matches!(decrypt(&key, &[]), Err(ArchiveError::Crypto(_))));
    }

    #[test]
    fn wrong_key_fails_padding_or_garbles() {
        let ct = encrypt(&key(), b"{\"msgtype\":\"text\"}");
        let other = payload_key(&[7u8; 32]).unwrap();
        match decrypt(&other, &ct) {
            Err(ArchiveError::Crypto(_)) => {}
            Ok(plain) => assert_ne!(plain, b"{\"msgtype\":\"text\"}"),
            Err(e) => panic!("unexpected error {e:?}"),
        }
    }

    #[test]
    fn base64_text_form_round_trips() {
        let key = key();
        let text = encrypt_to_base64(&key, "会话内容".as_bytes());
        assert_eq!(decrypt_from_base64(&key, &text).unwrap(), "会话内容".as_bytes());
        assert!(decrypt_from_base64(&key, "!!not base64!!").is_err());
    }
}
