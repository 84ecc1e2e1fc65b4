//! Credential cache persistence.
//!
//! The cache holds one opaque blob per application identity: the serialized
//! token/account store. It is read before every token request and written
//! only after a successful acquisition.
//!
//! There is no locking. Two processes sharing a home directory race on the
//! blob and the last writer wins.

mod file;
#[cfg(feature = "keyring")]
mod keyring_store;

pub use file::FileCredentialCache;
#[cfg(feature = "keyring")]
pub use keyring_store::KeyringCredentialCache;

use crate::config::{AppConfig, CacheBackend, Paths};

/// Error type for credential cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// File access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The temporary file could not replace the cache file.
    #[error("Failed to persist cache file: {0}")]
    Persist(#[from] tempfile::PersistError),

    /// Failed to access keyring.
    #[cfg(feature = "keyring")]
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// The configured backend is not compiled in.
    #[error("Cache backend {0:?} is not available in this build")]
    Unsupported(CacheBackend),
}

/// Result type for credential operations.
pub type CredentialResult<T> = std::result::Result<T, CredentialError>;

/// Storage for the serialized token cache.
pub trait CredentialCache: Send + Sync {
    /// Reads the persisted blob, `None` when nothing is cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read.
    fn load(&self) -> CredentialResult<Option<Vec<u8>>>;

    /// Replaces the persisted blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be written.
    fn save(&self, blob: &[u8]) -> CredentialResult<()>;

    /// Removes the persisted blob. Succeeds when nothing is cached.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing blob cannot be removed.
    fn clear(&self) -> CredentialResult<()>;
}

/// Opens the cache backend selected in the configuration.
///
/// # Errors
///
/// Returns `Unsupported` when the keyring backend is requested but the
/// crate was built without the `keyring` feature.
pub fn open(config: &AppConfig, paths: &Paths) -> CredentialResult<Box<dyn CredentialCache>> {
    match config.cache_backend {
        CacheBackend::File => Ok(Box::new(FileCredentialCache::new(&paths.token_cache))),
        #[cfg(feature = "keyring")]
        CacheBackend::Keyring => Ok(Box::new(KeyringCredentialCache::new(&config.client_id))),
        #[cfg(not(feature = "keyring"))]
        CacheBackend::Keyring => Err(CredentialError::Unsupported(CacheBackend::Keyring)),
    }
}
