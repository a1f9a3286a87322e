//! src/decryptor/key.rs
//! Private key material: inline PEM or a path, resolved once on first use

use crate::aliases::PemKeyString;
use crate::crypto::rsa::parse_private_key_pem;
use crate::error::ArchiveError;
use once_cell::sync::OnceCell;
use rsa::RsaPrivateKey;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

const PEM_MARKER: &str = "-----BEGIN";

/// Where a private key comes from.
pub enum KeyMaterial {
    /// PEM text.
    Pem(PemKeyString),
    /// Path to a PEM file.
    Path(PathBuf),
    /// Either PEM text or a path; decided at resolution time. Text containing a PEM
    /// armor line is PEM; otherwise an existing file is read; otherwise the text is parsed
    /// as-is (and fails as malformed).
    Auto(PemKeyString),
}

impl KeyMaterial {
    #[must_use]
    pub fn pem(text: impl Into<String>) -> Self {
        KeyMaterial::Pem(PemKeyString::new(text.into()))
    }

    #[must_use]
    pub fn path(path: impl Into<PathBuf>) -> Self {
        KeyMaterial::Path(path.into())
    }

    /// Accept a string that is either PEM text or a filesystem path.
    #[must_use]
    pub fn text_or_path(value: impl Into<String>) -> Self {
        KeyMaterial::Auto(PemKeyString::new(value.into()))
    }

    fn load(&self) -> Result<RsaPrivateKey, ArchiveError> {
        match self {
            KeyMaterial::Pem(pem) => parse_private_key_pem(pem),
            KeyMaterial::Path(path) => parse_private_key_pem(&read_pem(path)?),
            KeyMaterial::Auto(value) => {
                let text = value.expose_secret();
                if text.contains(PEM_MARKER) {
                    return parse_private_key_pem(value);
                }
                let candidate = Path::new(text.trim());
                if candidate.is_file() {
                    parse_private_key_pem(&read_pem(candidate)?)
                } else {
                    parse_private_key_pem(value)
                }
            }
        }
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyMaterial::Pem(_) => f.write_str("KeyMaterial::Pem([REDACTED])"),
            KeyMaterial::Path(path) => write!(f, "KeyMaterial::Path({})", path.display()),
            KeyMaterial::Auto(_) => f.write_str("KeyMaterial::Auto([REDACTED])"),
        }
    }
}

fn read_pem(path: &Path) -> Result<PemKeyString, ArchiveError> {
    debug!(path = %path.display(), "reading private key file");
    std::fs::read_to_string(path)
        .map(PemKeyString::new)
        .map_err(|e| ArchiveError::PrivateKey(format!("cannot read {}: {e}", path.display())))
}

/// A private key that is parsed (and, for paths, read from disk) at most once.
///
/// A failed resolution is not cached, so a key file that appears later can still be picked up.
pub struct LazyPrivateKey {
    source: KeyMaterial,
    resolved: OnceCell<RsaPrivateKey>,
}

impl LazyPrivateKey {
    #[must_use]
    pub fn new(source: KeyMaterial) -> Self {
        Self {
            source,
            resolved: OnceCell::new(),
        }
    }

    /// The parsed key, resolving it on first call.
    pub fn get(&self) -> Result<&RsaPrivateKey, ArchiveError> {
        self.resolved.get_or_try_init(|| self.source.load())
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }
}

impl fmt::Debug for LazyPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyPrivateKey")
            .field("source", &self.source)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl From<KeyMaterial> for LazyPrivateKey {
    fn from(source: KeyMaterial) -> Self {
        Self::new(source)
    }
}

/// Private keys indexed by `publickey_ver`, with an optional default.
///
/// The archive rotates its key pair; every record names the public key version that wrapped
/// its symmetric key. Records are matched to the key registered for their version and fall
/// back to the default key.
#[derive(Debug, Default)]
pub struct Keyring {
    default: Option<LazyPrivateKey>,
    versions: BTreeMap<u32, LazyPrivateKey>,
}

impl Keyring {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A keyring holding a single default key.
    #[must_use]
    pub fn single(material: KeyMaterial) -> Self {
        Self::new().with_default(material)
    }

    #[must_use]
    pub fn with_default(mut self, material: KeyMaterial) -> Self {
        self.default = Some(LazyPrivateKey::new(material));
        self
    }

    #[must_use]
    pub fn with_version(mut self, publickey_ver: u32, material: KeyMaterial) -> Self {
        self.versions
            .insert(publickey_ver, LazyPrivateKey::new(material));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.default.is_none() && self.versions.is_empty()
    }

    /// The key for a record wrapped under `publickey_ver`.
    #[must_use]
    pub fn key_for(&self, publickey_ver: Option<u32>) -> Option<&LazyPrivateKey> {
        publickey_ver
            .and_then(|ver| self.versions.get(&ver))
            .or(self.default.as_ref())
    }

    /// Registered versions, ascending.
    #[must_use]
    pub fn versions(&self) -> Vec<u32> {
        self.versions.keys().copied().collect()
    }
}
