//! `OAuth2` authorization flows.

mod device;

pub use device::{
    DeviceAuthorization, DeviceFlow, MIN_POLL_INTERVAL, PollOptions, SLOW_DOWN_STEP,
};

use crate::error::Result;
use crate::provider::Provider;
use crate::token::{ErrorResponse, Token, TokenResponse};
use reqwest::Client;
use std::collections::HashMap;
use tracing::debug;

/// Common `OAuth2` client configuration.
///
/// Public client: no secret is ever sent.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    /// Client ID from provider.
    pub client_id: String,
    /// Provider configuration.
    pub provider: Provider,
    /// HTTP client.
    http_client: Client,
}

impl OAuthClient {
    /// Creates a new OAuth client.
    #[must_use]
    pub fn new(client_id: impl Into<String>, provider: Provider) -> Self {
        Self {
            client_id: client_id.into(),
            provider,
            http_client: Client::new(),
        }
    }

    /// Uses a shared HTTP client instead of a private one.
    #[must_use]
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http_client = client;
        self
    }

    /// Scope string for a request, falling back to the provider defaults.
    pub(crate) fn scope_string(&self, scopes: Option<&[String]>) -> String {
        scopes.map_or_else(
            || self.provider.default_scopes.join(" "),
            |s| s.join(" "),
        )
    }

    /// Refreshes an access token using a refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh fails or if the token has no refresh token.
    pub async fn refresh_token(&self, token: &Token, scopes: Option<&[String]>) -> Result<Token> {
        let refresh_token = token.refresh_token()?;
        let scope_str = self.scope_string(scopes);

        let mut params = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("refresh_token", refresh_token);
        params.insert("client_id", &self.client_id);
        if !scope_str.is_empty() {
            params.insert("scope", &scope_str);
        }

        debug!(provider = %self.provider.name, "Redeeming refresh token");
        let response = self
            .http_client
            .post(self.provider.token_url.clone())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let error: ErrorResponse = response.json().await?;
            return Err(error.into_error());
        }

        let token_response: TokenResponse = response.json().await?;
        let mut new_token = Token::from_response(token_response)?;

        // Preserve refresh token and ID token if not returned
        if new_token.refresh_token.is_none() {
            new_token.refresh_token.clone_from(&token.refresh_token);
        }
        if new_token.id_token.is_none() {
            new_token.id_token.clone_from(&token.id_token);
        }

        Ok(new_token)
    }
}
