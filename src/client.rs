//! src/client.rs
//! One archive session plus the keys needed to read it

use crate::builders::{FetchOptions, MediaOptions};
use crate::chat;
use crate::decryptor::{HybridDecryptor, KeyMaterial, Keyring};
use crate::error::ArchiveError;
use crate::media::{self, MediaDownload, StreamOutcome};
use crate::record::ChatBatch;
use crate::session::ArchiveSession;
use std::io::Write;
use std::path::Path;

/// High-level handle over an [`ArchiveSession`].
///
/// The private keys are resolved lazily on the first decrypting fetch and cached for the
/// lifetime of the client.
#[derive(Debug)]
pub struct ArchiveClient<S> {
    session: S,
    decryptor: Option<HybridDecryptor>,
}

impl<S: ArchiveSession> ArchiveClient<S> {
    /// A client that can only fetch encrypted batches and media.
    pub fn new(session: S) -> Self {
        Self {
            session,
            decryptor: None,
        }
    }

    #[must_use]
    pub fn with_private_key(self, material: KeyMaterial) -> Self {
        self.with_keyring(Keyring::single(material))
    }

    #[must_use]
    pub fn with_keyring(mut self, keyring: Keyring) -> Self {
        self.decryptor = Some(HybridDecryptor::new(keyring));
        self
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn into_session(self) -> S {
        self.session
    }

    pub fn decryptor(&self) -> Option<&HybridDecryptor> {
        self.decryptor.as_ref()
    }

    /// See [`chat::fetch_chat_batch`].
    pub fn fetch_chat_batch(
        &self,
        cursor: u64,
        limit: u32,
        options: &FetchOptions,
    ) -> Result<ChatBatch, ArchiveError> {
        chat::fetch_chat_batch(&self.session, self.decryptor.as_ref(), cursor, limit, options)
    }

    /// See [`media::download_media`].
    pub fn download_media(
        &self,
        file_id: &str,
        dir: &Path,
        options: &MediaOptions,
    ) -> Result<MediaDownload, ArchiveError> {
        media::download_media(&self.session, file_id, dir, options)
    }

    /// See [`media::stream_media`].
    pub fn stream_media<W: Write>(
        &self,
        file_id: &str,
        writer: &mut W,
        options: &MediaOptions,
    ) -> Result<StreamOutcome, ArchiveError> {
        media::stream_media(&self.session, file_id, writer, options)
    }
}

#[cfg(feature = "native")]
mod native_client {
    use super::ArchiveClient;
    use crate::config::ArchiveConfig;
    use crate::consts::DEFAULT_LIBRARY_NAME;
    use crate::decryptor::KeyMaterial;
    use crate::error::ArchiveError;
    use crate::session::native::NativeSession;
    use std::ffi::OsStr;

    impl ArchiveClient<NativeSession> {
        /// Load the vendor library and initialize a session.
        pub fn connect(
            library_path: impl AsRef<OsStr>,
            corp_id: &str,
            secret: &str,
            private_key: Option<KeyMaterial>,
        ) -> Result<Self, ArchiveError> {
            let client = Self::new(NativeSession::open(library_path, corp_id, secret)?);
            Ok(match private_key {
                Some(material) => client.with_private_key(material),
                None => client,
            })
        }

        /// Client described by `config`. Without a `library_path` the platform loader
        /// searches for the default SDK file name.
        pub fn open(config: &ArchiveConfig) -> Result<Self, ArchiveError> {
            let library = config
                .library_path
                .as_deref()
                .map_or_else(|| OsStr::new(DEFAULT_LIBRARY_NAME), |path| path.as_os_str());
            let client = Self::new(NativeSession::open(library, &config.corp_id, &config.secret)?);
            Ok(match config.keyring() {
                Some(keyring) => client.with_keyring(keyring),
                None => client,
            })
        }
    }
}
