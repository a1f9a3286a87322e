//! Incremental content digests for downloaded media.
//!
//! The digest is always fed the exact bytes as they are streamed to the sink, never a
//! re-read of the finished file.

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Digest algorithm for media checksums.
///
/// MD5 is the default because it is what the archive announces in `md5sum` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    #[default]
    Md5,
    Sha256,
}

impl ChecksumAlgorithm {
    #[must_use]
    pub fn hasher(self) -> StreamingChecksum {
        match self {
            ChecksumAlgorithm::Md5 => StreamingChecksum::Md5(Md5::new()),
            ChecksumAlgorithm::Sha256 => StreamingChecksum::Sha256(Sha256::new()),
        }
    }

    /// One-shot digest of `data`, hex encoded.
    #[must_use]
    pub fn digest_hex(self, data: &[u8]) -> String {
        let mut hasher = self.hasher();
        hasher.update(data);
        hasher.finalize_hex()
    }
}

/// Running digest state.
#[derive(Clone)]
pub enum StreamingChecksum {
    Md5(Md5),
    Sha256(Sha256),
}

impl StreamingChecksum {
    #[inline]
    pub fn update(&mut self, data: &[u8]) {
        match self {
            StreamingChecksum::Md5(h) => h.update(data),
            StreamingChecksum::Sha256(h) => h.update(data),
        }
    }

    /// Consume the state and return the lowercase hex digest.
    #[must_use]
    pub fn finalize_hex(self) -> String {
        match self {
            StreamingChecksum::Md5(h) => hex::encode(h.finalize()),
            StreamingChecksum::Sha256(h) => hex::encode(h.finalize()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digests() {
        assert_eq!(
            ChecksumAlgorithm::Md5.digest_hex(b""),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(
            ChecksumAlgorithm::Md5.digest_hex(b"abc"),
            "900150983cd24fb0d6963f7d28e17f72"
        );
        assert_eq!(
            ChecksumAlgorithm::Sha256.digest_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn incremental_equals_one_shot() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        for algorithm in [ChecksumAlgorithm::Md5, ChecksumAlgorithm::Sha256] {
            let mut hasher = algorithm.hasher();
            for piece in data.chunks(333) {
                hasher.update(piece);
            }
            assert_eq!(hasher.finalize_hex(), algorithm.digest_hex(&data));
        }
    }
}
