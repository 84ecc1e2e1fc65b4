//! Credential cache stored in the system keyring.
//!
//! Uses the platform's native credential storage:
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - macOS: Keychain
//! - Windows: Credential Manager

use keyring::Entry;
use tracing::{debug, warn};

use super::{CredentialCache, CredentialResult};

/// Service name used for keyring entries.
const SERVICE_NAME: &str = "mailgate";

/// Keyring-backed credential cache, one entry per client id.
#[derive(Debug, Clone)]
pub struct KeyringCredentialCache {
    key: String,
}

impl KeyringCredentialCache {
    /// Creates a cache for the given application (client) id.
    #[must_use]
    pub fn new(client_id: &str) -> Self {
        Self {
            key: format!("token_cache_{client_id}"),
        }
    }

    fn entry(&self) -> CredentialResult<Entry> {
        Ok(Entry::new(SERVICE_NAME, &self.key)?)
    }
}

impl CredentialCache for KeyringCredentialCache {
    fn load(&self) -> CredentialResult<Option<Vec<u8>>> {
        match self.entry()?.get_secret() {
            Ok(blob) => Ok(Some(blob)),
            Err(keyring::Error::NoEntry) => {
                debug!("No credential cache in keyring for {}", self.key);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, blob: &[u8]) -> CredentialResult<()> {
        self.entry()?.set_secret(blob)?;
        debug!("Stored credential cache in keyring for {}", self.key);
        Ok(())
    }

    fn clear(&self) -> CredentialResult<()> {
        match self.entry()?.delete_credential() {
            Ok(()) => {
                debug!("Deleted credential cache for {}", self.key);
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => {
                warn!("Failed to delete credential cache: {e}");
                Err(e.into())
            }
        }
    }
}
