//! `OAuth2` provider configurations.

use crate::error::{Error, Result};
use url::Url;

/// Default Microsoft identity platform host.
pub const MICROSOFT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// `OAuth2` provider configuration.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Provider name (e.g., "Microsoft").
    pub name: String,
    /// Token endpoint URL.
    pub token_url: Url,
    /// Device authorization endpoint (if supported).
    pub device_auth_url: Option<Url>,
    /// Default scopes.
    pub default_scopes: Vec<String>,
}

impl Provider {
    /// Creates a new provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(name: impl Into<String>, token_url: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            token_url: Url::parse(token_url.as_ref())?,
            device_auth_url: None,
            default_scopes: Vec::new(),
        })
    }

    /// Sets the device authorization URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn with_device_auth_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.device_auth_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Sets the default scopes.
    #[must_use]
    pub fn with_default_scopes(mut self, scopes: Vec<String>) -> Self {
        self.default_scopes = scopes;
        self
    }

    /// Microsoft identity platform (v2.0 endpoints) for a single tenant.
    ///
    /// Scopes:
    /// - `offline_access` - Refresh token
    ///
    /// # Errors
    ///
    /// Returns an error if URL parsing fails.
    pub fn microsoft(tenant: &str) -> Result<Self> {
        Self::microsoft_at(MICROSOFT_AUTHORITY_HOST, tenant)
    }

    /// Microsoft identity platform rooted at a custom authority host.
    ///
    /// Used for sovereign clouds and for pointing the client at a local
    /// mock server.
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant is empty or URL parsing fails.
    pub fn microsoft_at(authority_host: &str, tenant: &str) -> Result<Self> {
        let tenant = tenant.trim();
        if tenant.is_empty() {
            return Err(Error::InvalidConfig("tenant is empty".into()));
        }
        let base = format!(
            "{}/{tenant}/oauth2/v2.0",
            authority_host.trim_end_matches('/')
        );

        Ok(Self::new("Microsoft", format!("{base}/token"))?
            .with_device_auth_url(format!("{base}/devicecode"))?
            .with_default_scopes(vec!["offline_access".to_string()]))
    }

    /// Validates that required URLs are set.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.token_url.as_str().is_empty() {
            return Err(Error::InvalidConfig("token_url is empty".into()));
        }
        if self.device_auth_url.is_none() {
            return Err(Error::InvalidConfig(format!(
                "Provider {} does not support device flow",
                self.name
            )));
        }
        Ok(())
    }
}
