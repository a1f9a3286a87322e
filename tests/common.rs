//! tests/common.rs
//! Key pairs, sealed records and archive fixtures shared across test files

#![allow(dead_code)] // each test file uses a different subset

use msgaudit_rs::crypto::envelope::RecordSealer;
use msgaudit_rs::session::memory::MemoryArchive;
use msgaudit_rs::{EncryptedRecord, KeyMaterial};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::{json, Value};
use std::sync::OnceLock;

/// Small modulus keeps key generation fast; padding behavior is identical to 2048-bit keys.
pub const TEST_KEY_BITS: usize = 1024;

/// Media payload spanning several chunks, containing NUL bytes.
pub const TEST_MEDIA: &[u8] = b"\x00\x01binary\x00media\xffpayload\x00with nuls\x00\x00end";

pub struct TestKey {
    pub private: RsaPrivateKey,
    pub public: RsaPublicKey,
    pub pem: String,
}

fn generate(seed: u64) -> TestKey {
    let mut rng = StdRng::seed_from_u64(seed);
    let private = RsaPrivateKey::new(&mut rng, TEST_KEY_BITS).unwrap();
    let public = RsaPublicKey::from(&private);
    let pem = private.to_pkcs1_pem(LineEnding::LF).unwrap().to_string();
    TestKey {
        private,
        public,
        pem,
    }
}

/// The key pair most tests encrypt for.
pub fn primary_key() -> &'static TestKey {
    static KEY: OnceLock<TestKey> = OnceLock::new();
    KEY.get_or_init(|| generate(0x5eed_0001))
}

/// A second key pair, standing in for a rotated or foreign key.
pub fn secondary_key() -> &'static TestKey {
    static KEY: OnceLock<TestKey> = OnceLock::new();
    KEY.get_or_init(|| generate(0x5eed_0002))
}

pub fn primary_material() -> KeyMaterial {
    KeyMaterial::pem(primary_key().pem.clone())
}

pub fn text_message(seq: u64) -> Value {
    json!({
        "msgid": format!("msg-{seq}"),
        "action": "send",
        "from": "alice",
        "tolist": ["bob"],
        "msgtime": 1_700_000_000_000u64 + seq,
        "msgtype": "text",
        "text": { "content": format!("hello #{seq}") },
    })
}

/// A text message sealed for `key`.
pub fn sealed_for(key: &TestKey, seq: u64) -> EncryptedRecord {
    RecordSealer::new(seq)
        .seal(&key.public, &text_message(seq))
        .unwrap()
}

/// A text message sealed for the primary key.
pub fn sealed(seq: u64) -> EncryptedRecord {
    sealed_for(primary_key(), seq)
}

/// Archive holding sealed text messages `1..=count` for the primary key.
pub fn archive_with(count: u64) -> MemoryArchive {
    MemoryArchive::new().with_records((1..=count).map(sealed))
}
