//! src/config.rs
//! File-based client configuration

use crate::builders::{FetchOptions, MediaOptions, Transport};
use crate::consts::{DEFAULT_PASSWD, DEFAULT_PROXY, DEFAULT_TIMEOUT_SECS};
use crate::crypto::checksum::ChecksumAlgorithm;
use crate::decryptor::{KeyMaterial, Keyring};
use crate::error::ArchiveError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Client settings, usually read from a JSON file.
///
/// ```json
/// {
///   "corp_id": "ww0123456789",
///   "secret": "...",
///   "private_key": "/etc/msgaudit/private_v1.pem",
///   "private_keys": { "2": "/etc/msgaudit/private_v2.pem" },
///   "library_path": "/opt/sdk/libWeWorkFinanceSdk_C.so",
///   "proxy": "",
///   "timeout": 10
/// }
/// ```
///
/// Key entries hold either PEM text or a path to a PEM file.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveConfig {
    pub corp_id: String,
    pub secret: String,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub private_keys: BTreeMap<u32, String>,
    #[serde(default)]
    pub library_path: Option<PathBuf>,
    #[serde(default = "default_proxy")]
    pub proxy: String,
    #[serde(default = "default_passwd")]
    pub passwd: String,
    #[serde(default = "default_timeout")]
    pub timeout: i32,
    #[serde(default)]
    pub checksum: ChecksumAlgorithm,
}

fn default_proxy() -> String {
    DEFAULT_PROXY.to_string()
}

fn default_passwd() -> String {
    DEFAULT_PASSWD.to_string()
}

fn default_timeout() -> i32 {
    DEFAULT_TIMEOUT_SECS
}

impl ArchiveConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ArchiveError> {
        Ok(serde_json::from_str(text)?)
    }

    #[must_use]
    pub fn transport(&self) -> Transport {
        Transport::new()
            .with_proxy(self.proxy.clone())
            .with_passwd(self.passwd.clone())
            .with_timeout(self.timeout)
    }

    #[must_use]
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions::new().with_transport(self.transport())
    }

    #[must_use]
    pub fn media_options(&self) -> MediaOptions {
        MediaOptions::new()
            .with_transport(self.transport())
            .with_checksum(self.checksum)
    }

    /// Keyring built from `private_key` and `private_keys`; `None` when neither is set.
    #[must_use]
    pub fn keyring(&self) -> Option<Keyring> {
        let mut ring = Keyring::new();
        if let Some(default) = &self.private_key {
            ring = ring.with_default(KeyMaterial::text_or_path(default.clone()));
        }
        for (ver, value) in &self.private_keys {
            ring = ring.with_version(*ver, KeyMaterial::text_or_path(value.clone()));
        }
        (!ring.is_empty()).then_some(ring)
    }
}

impl fmt::Debug for ArchiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveConfig")
            .field("corp_id", &self.corp_id)
            .field("secret", &"[REDACTED]")
            .field("private_key", &self.private_key.as_ref().map(|_| "[REDACTED]"))
            .field("private_keys", &self.private_keys.keys().collect::<Vec<_>>())
            .field("library_path", &self.library_path)
            .field("proxy", &self.proxy)
            .field("timeout", &self.timeout)
            .field("checksum", &self.checksum)
            .finish()
    }
}
