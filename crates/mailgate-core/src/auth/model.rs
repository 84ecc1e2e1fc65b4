//! Serialized token/account store.

use mailgate_oauth::Token;
use serde::{Deserialize, Serialize};
use tracing::warn;

const CACHE_VERSION: u32 = 1;

/// Label used when the ID token carries no username.
pub const DEFAULT_ACCOUNT: &str = "default";

/// One signed-in account and its refresh material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedAccount {
    /// Username from the ID token, or [`DEFAULT_ACCOUNT`].
    pub username: String,
    /// `<oid>.<tid>` when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_account_id: Option<String>,
    /// Scopes the token was requested for.
    pub scopes: Vec<String>,
    /// Latest token for the account.
    pub token: Token,
}

impl CachedAccount {
    /// Builds an account entry from a freshly acquired token.
    #[must_use]
    pub fn from_token(token: Token, scopes: &[String]) -> Self {
        let claims = token.id_claims().unwrap_or_default();
        Self {
            username: claims
                .preferred_username
                .clone()
                .unwrap_or_else(|| DEFAULT_ACCOUNT.to_string()),
            home_account_id: claims.home_account_id(),
            scopes: scopes.to_vec(),
            token,
        }
    }

    /// True if every scope in `required` was requested for this account.
    #[must_use]
    pub fn covers(&self, required: &[String]) -> bool {
        required
            .iter()
            .all(|scope| self.scopes.iter().any(|s| s.eq_ignore_ascii_case(scope)))
    }
}

/// All cached accounts; the unit persisted by the credential cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCache {
    version: u32,
    /// Known accounts, most recently signed in first.
    pub accounts: Vec<CachedAccount>,
}

impl Default for TokenCache {
    fn default() -> Self {
        Self {
            version: CACHE_VERSION,
            accounts: Vec::new(),
        }
    }
}

impl TokenCache {
    /// Decodes a persisted blob. A corrupt blob yields an empty cache so
    /// the next acquisition starts a fresh sign-in.
    #[must_use]
    pub fn from_blob(blob: Option<&[u8]>) -> Self {
        let Some(bytes) = blob else {
            return Self::default();
        };
        serde_json::from_slice(bytes).unwrap_or_else(|e| {
            warn!("Ignoring unreadable credential cache: {e}");
            Self::default()
        })
    }

    /// Encodes the cache for persistence.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_blob(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    /// True when no account is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// First account whose scopes cover `required`.
    #[must_use]
    pub fn find(&self, required: &[String]) -> Option<&CachedAccount> {
        self.accounts.iter().find(|a| a.covers(required))
    }

    /// Inserts or replaces an account (matched by username) at the front.
    pub fn upsert(&mut self, account: CachedAccount) {
        self.accounts.retain(|a| a.username != account.username);
        self.accounts.insert(0, account);
    }
}
