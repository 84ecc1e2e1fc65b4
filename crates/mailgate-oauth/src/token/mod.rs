//! `OAuth2` token types and management.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Seconds before the real expiry at which a token is treated as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

/// `OAuth2` access token with metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Access token string.
    pub access_token: String,
    /// Token type (usually "Bearer").
    pub token_type: String,
    /// Expiration time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Refresh token for obtaining new access tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Scope granted by authorization server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// OpenID Connect ID token, when `openid` was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub fn new(access_token: impl Into<String>, token_type: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_at: None,
            refresh_token: None,
            scope: None,
            id_token: None,
        }
    }

    /// Creates a token from token response.
    ///
    /// # Errors
    ///
    /// Returns an error if the response carries an empty access token.
    pub fn from_response(response: TokenResponse) -> Result<Self> {
        if response.access_token.is_empty() {
            return Err(Error::InvalidResponse("empty access_token".into()));
        }

        let expires_at = response
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(i64::from(secs)));

        Ok(Self {
            access_token: response.access_token,
            token_type: response.token_type,
            expires_at,
            refresh_token: response.refresh_token,
            scope: response.scope,
            id_token: response.id_token,
        })
    }

    /// Checks if the token is expired (with 60 second buffer).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|exp| Utc::now() + Duration::seconds(EXPIRY_SKEW_SECS) >= exp)
    }

    /// Returns true if the token is valid (not expired).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_expired()
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Sets the expiration time.
    #[must_use]
    pub const fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Returns the refresh token if available.
    ///
    /// # Errors
    ///
    /// Returns an error if no refresh token is available.
    pub fn refresh_token(&self) -> Result<&str> {
        self.refresh_token.as_deref().ok_or(Error::NoRefreshToken)
    }

    /// Decodes the claims of the ID token without verifying its signature.
    ///
    /// The token came straight from the token endpoint over TLS, so the
    /// claims are only used to label the cached account.
    #[must_use]
    pub fn id_claims(&self) -> Option<IdClaims> {
        let payload = self.id_token.as_deref()?.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

/// Subset of OpenID Connect claims used to identify a signed-in account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IdClaims {
    /// User principal name or email.
    #[serde(default)]
    pub preferred_username: Option<String>,
    /// Object id of the user in the directory.
    #[serde(default)]
    pub oid: Option<String>,
    /// Tenant id.
    #[serde(default)]
    pub tid: Option<String>,
}

impl IdClaims {
    /// Stable account identifier in `<oid>.<tid>` form, when both are known.
    #[must_use]
    pub fn home_account_id(&self) -> Option<String> {
        Some(format!("{}.{}", self.oid.as_deref()?, self.tid.as_deref()?))
    }
}

/// Token response from `OAuth2` server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    /// Access token.
    pub access_token: String,
    /// Token type.
    pub token_type: String,
    /// Expires in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u32>,
    /// Refresh token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// ID token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

/// Error response from `OAuth2` server.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    /// Error code.
    pub error: String,
    /// Error description.
    #[serde(default)]
    pub error_description: String,
}

impl ErrorResponse {
    /// Converts to an Error.
    #[must_use]
    pub fn into_error(self) -> Error {
        Error::oauth_error(self.error, self.error_description)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn id_token_with(claims: &str) -> String {
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#),
            URL_SAFE_NO_PAD.encode(claims.as_bytes())
        )
    }

    #[test]
    fn test_token_creation() {
        let token = Token::new("access123", "Bearer");
        assert_eq!(token.access_token, "access123");
        assert_eq!(token.token_type, "Bearer");
        assert!(token.expires_at.is_none());
        assert!(token.refresh_token.is_none());
    }

    #[test]
    fn test_token_with_refresh() {
        let token = Token::new("access123", "Bearer").with_refresh_token("refresh456");
        assert_eq!(token.refresh_token().unwrap(), "refresh456");
        assert!(matches!(
            Token::new("a", "Bearer").refresh_token(),
            Err(Error::NoRefreshToken)
        ));
    }

    #[test]
    fn test_token_expiration() {
        let expired =
            Token::new("access123", "Bearer").with_expires_at(Utc::now() - Duration::seconds(120));
        assert!(expired.is_expired());
        assert!(!expired.is_valid());

        // Inside the skew window counts as expired.
        let nearly =
            Token::new("access123", "Bearer").with_expires_at(Utc::now() + Duration::seconds(30));
        assert!(nearly.is_expired());

        let valid =
            Token::new("access123", "Bearer").with_expires_at(Utc::now() + Duration::seconds(3600));
        assert!(valid.is_valid());
    }

    #[test]
    fn test_token_from_response() {
        let response = TokenResponse {
            access_token: "test_token".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: Some(3600),
            refresh_token: Some("refresh".to_string()),
            scope: Some("Mail.Send".to_string()),
            id_token: None,
        };

        let token = Token::from_response(response).unwrap();
        assert_eq!(token.access_token, "test_token");
        assert!(token.expires_at.is_some());
        assert!(token.is_valid());
    }

    #[test]
    fn test_empty_access_token_rejected() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"","token_type":"Bearer"}"#).unwrap();
        assert!(matches!(
            Token::from_response(response),
            Err(Error::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_id_claims() {
        let mut token = Token::new("a", "Bearer");
        assert!(token.id_claims().is_none());

        token.id_token = Some(id_token_with(
            r#"{"preferred_username":"me@contoso.com","oid":"o1","tid":"t1"}"#,
        ));
        let claims = token.id_claims().unwrap();
        assert_eq!(claims.preferred_username.as_deref(), Some("me@contoso.com"));
        assert_eq!(claims.home_account_id().as_deref(), Some("o1.t1"));
    }

    #[test]
    fn test_malformed_id_token_yields_no_claims() {
        let mut token = Token::new("a", "Bearer");
        token.id_token = Some("not-a-jwt".into());
        assert!(token.id_claims().is_none());
    }
}
