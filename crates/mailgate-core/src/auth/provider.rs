//! Access token acquisition: cache first, device code second.

use mailgate_oauth::{DeviceAuthorization, DeviceFlow, OAuthClient, PollOptions, Provider, Token};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::model::{CachedAccount, TokenCache};
use crate::cache::CredentialCache;
use crate::config::AppConfig;
use crate::error::Result;

/// Delegated Graph permissions every token must carry.
pub const REQUIRED_SCOPES: [&str; 3] = ["Mail.Send", "Mail.ReadWrite", "User.Read"];

/// Scopes added to every request so refresh material and an ID token come
/// back.
const RESERVED_SCOPES: [&str; 3] = ["offline_access", "openid", "profile"];

/// Shows the device code to the user.
pub trait DeviceCodePrompt: Send + Sync {
    /// Called once per interactive sign-in, before polling starts.
    fn present(&self, auth: &DeviceAuthorization);
}

/// Obtains access tokens for the configured app registration.
pub struct TokenProvider {
    client: OAuthClient,
    cache: Box<dyn CredentialCache>,
    prompt: Box<dyn DeviceCodePrompt>,
    poll: PollOptions,
    scopes: Vec<String>,
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenProvider")
            .field("client_id", &self.client.client_id)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

impl TokenProvider {
    /// Creates a provider for `config`, bounded by its sign-in timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the authority URL or tenant is invalid.
    pub fn new(
        config: &AppConfig,
        cache: Box<dyn CredentialCache>,
        prompt: Box<dyn DeviceCodePrompt>,
    ) -> Result<Self> {
        let provider = Provider::microsoft_at(&config.authority_host, &config.tenant_id)?;
        Ok(Self {
            client: OAuthClient::new(config.client_id.clone(), provider),
            cache,
            prompt,
            poll: PollOptions::default().with_timeout(config.auth_timeout()),
            scopes: REQUIRED_SCOPES.iter().map(ToString::to_string).collect(),
        })
    }

    /// Lets the caller cancel an interactive wait.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.poll = self.poll.with_cancel(cancel);
        self
    }

    /// Replaces the polling bounds.
    #[must_use]
    pub fn with_poll_options(mut self, poll: PollOptions) -> Self {
        self.poll = poll;
        self
    }

    /// Shares an HTTP client with the rest of the application.
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.client = self.client.with_http_client(http);
        self
    }

    /// Scopes every returned token is valid for.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    fn request_scopes(&self) -> Vec<String> {
        self.scopes
            .iter()
            .cloned()
            .chain(RESERVED_SCOPES.iter().map(ToString::to_string))
            .collect()
    }

    fn load_cache(&self) -> Result<TokenCache> {
        let blob = self.cache.load()?;
        Ok(TokenCache::from_blob(blob.as_deref()))
    }

    fn store_cache(&self, cache: &TokenCache) -> Result<()> {
        self.cache.save(&cache.to_blob()?)?;
        Ok(())
    }

    /// Returns a usable access token, signing in interactively only when
    /// the cache cannot supply one.
    ///
    /// # Errors
    ///
    /// `Auth` when the device flow is denied, expires, times out or is
    /// cancelled; `Credential` when the cache cannot be read or written.
    pub async fn access_token(&self) -> Result<Token> {
        if let Some(token) = self.acquire_silent().await? {
            return Ok(token);
        }
        self.acquire_interactive().await
    }

    /// Cache-only acquisition: a still-valid token, or a refreshed one.
    ///
    /// Returns `None` when no cached account fits or the refresh is
    /// refused.
    ///
    /// # Errors
    ///
    /// Returns an error only for cache storage failures.
    pub async fn acquire_silent(&self) -> Result<Option<Token>> {
        let mut cache = self.load_cache()?;
        let Some(account) = cache.find(&self.scopes).cloned() else {
            debug!("No cached account for the required scopes");
            return Ok(None);
        };

        if account.token.is_valid() {
            debug!(account = %account.username, "Using cached access token");
            return Ok(Some(account.token));
        }
        if account.token.refresh_token.is_none() {
            debug!(account = %account.username, "Cached token expired without refresh token");
            return Ok(None);
        }

        let scopes = self.request_scopes();
        match self.client.refresh_token(&account.token, Some(&scopes)).await {
            Ok(token) => {
                let username = account.username.clone();
                cache.upsert(CachedAccount {
                    token: token.clone(),
                    ..account
                });
                self.store_cache(&cache)?;
                info!(account = %username, "Access token refreshed");
                Ok(Some(token))
            }
            Err(e) => {
                warn!(account = %account.username, "Silent refresh failed: {e}");
                Ok(None)
            }
        }
    }

    /// Device code sign-in. The cache is written only on success.
    ///
    /// # Errors
    ///
    /// `Auth` for any failure of the flow; `Credential` when the cache
    /// cannot be written.
    pub async fn acquire_interactive(&self) -> Result<Token> {
        let flow = DeviceFlow::new(self.client.clone());
        let scopes = self.request_scopes();

        let (_, token) = flow
            .authorize(Some(&scopes), &self.poll, |auth| self.prompt.present(auth))
            .await?;

        let account = CachedAccount::from_token(token.clone(), &self.scopes);
        let username = account.username.clone();
        let mut cache = self.load_cache()?;
        cache.upsert(account);
        self.store_cache(&cache)?;

        info!(account = %username, "Signed in");
        Ok(token)
    }

    /// Forgets every cached account.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing cache cannot be removed.
    pub fn logout(&self) -> Result<()> {
        self.cache.clear()?;
        info!("Credential cache cleared");
        Ok(())
    }
}
