//! src/builders/options.rs
//! Fetch and media options with the archive's documented defaults

use crate::aliases::PasswdString;
use crate::consts::{DEFAULT_PASSWD, DEFAULT_PROXY, DEFAULT_TIMEOUT_SECS};
use crate::crypto::checksum::ChecksumAlgorithm;
use std::fmt;

/// Network settings forwarded verbatim to every session call.
///
/// The crate does not interpret any of these; in particular the timeout is only passed
/// through, never enforced locally.
pub struct Transport {
    proxy: String,
    passwd: PasswdString,
    timeout_secs: i32,
}

impl Transport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            proxy: DEFAULT_PROXY.to_string(),
            passwd: PasswdString::new(DEFAULT_PASSWD.to_string()),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Proxy specification, e.g. `"socks5://10.0.0.1:1080"`. Empty means direct.
    #[must_use]
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = proxy.into();
        self
    }

    /// Passphrase for the proxy / archive. Empty means none.
    #[must_use]
    pub fn with_passwd(mut self, passwd: impl Into<String>) -> Self {
        self.passwd = PasswdString::new(passwd.into());
        self
    }

    /// Timeout in seconds handed to the session.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: i32) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    #[must_use]
    pub fn proxy(&self) -> &str {
        &self.proxy
    }

    #[must_use]
    pub fn passwd(&self) -> &PasswdString {
        &self.passwd
    }

    #[must_use]
    pub const fn timeout_secs(&self) -> i32 {
        self.timeout_secs
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("proxy", &self.proxy)
            .field("passwd", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// What to do with a record whose key was recovered but whose payload does not decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePolicy {
    /// Fail the whole fetch with [`ArchiveError::Payload`](crate::ArchiveError::Payload).
    #[default]
    Abort,
    /// Drop the record, list its seq in [`ChatBatch::undecodable`](crate::ChatBatch::undecodable).
    Skip,
}

/// Options for [`fetch_chat_batch`](crate::fetch_chat_batch).
#[derive(Debug)]
pub struct FetchOptions {
    pub transport: Transport,
    /// Run records through the hybrid decryptor. When `false` the raw envelopes are returned.
    pub decrypt: bool,
    pub decode_policy: DecodePolicy,
}

impl FetchOptions {
    #[must_use]
    pub fn new() -> Self {
        Self {
            transport: Transport::new(),
            decrypt: true,
            decode_policy: DecodePolicy::Abort,
        }
    }

    #[must_use]
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    #[must_use]
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.transport = self.transport.with_proxy(proxy);
        self
    }

    #[must_use]
    pub fn with_passwd(mut self, passwd: impl Into<String>) -> Self {
        self.transport = self.transport.with_passwd(passwd);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: i32) -> Self {
        self.transport = self.transport.with_timeout(timeout_secs);
        self
    }

    #[must_use]
    pub fn with_decrypt(mut self, decrypt: bool) -> Self {
        self.decrypt = decrypt;
        self
    }

    #[must_use]
    pub fn with_decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.decode_policy = policy;
        self
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Options for [`download_media`](crate::download_media).
#[derive(Debug, Default)]
pub struct MediaOptions {
    pub transport: Transport,
    pub checksum: ChecksumAlgorithm,
}

impl MediaOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    #[must_use]
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.transport = self.transport.with_proxy(proxy);
        self
    }

    #[must_use]
    pub fn with_passwd(mut self, passwd: impl Into<String>) -> Self {
        self.transport = self.transport.with_passwd(passwd);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: i32) -> Self {
        self.transport = self.transport.with_timeout(timeout_secs);
        self
    }

    #[must_use]
    pub fn with_checksum(mut self, algorithm: ChecksumAlgorithm) -> Self {
        self.checksum = algorithm;
        self
    }
}
