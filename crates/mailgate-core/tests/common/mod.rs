//! Shared fixtures for the integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use mailgate_core::auth::{CachedAccount, REQUIRED_SCOPES, TokenCache};
use mailgate_core::cache::FileCredentialCache;
use mailgate_core::{AppConfig, CredentialCache, DeviceCodePrompt, Paths};
use mailgate_oauth::{DeviceAuthorization, Token};
use tempfile::TempDir;
use wiremock::MockServer;
use wiremock::ResponseTemplate;

pub const TOKEN_PATH: &str = "/tenant/oauth2/v2.0/token";
pub const DEVICE_PATH: &str = "/tenant/oauth2/v2.0/devicecode";

/// Counts how often a device code was shown.
#[derive(Debug, Clone, Default)]
pub struct CountingPrompt {
    pub shown: Arc<AtomicUsize>,
}

impl CountingPrompt {
    pub fn count(&self) -> usize {
        self.shown.load(Ordering::SeqCst)
    }
}

impl DeviceCodePrompt for CountingPrompt {
    fn present(&self, _auth: &DeviceAuthorization) {
        self.shown.fetch_add(1, Ordering::SeqCst);
    }
}

/// Configuration with both the identity provider and Graph on `server`.
pub fn config_for(server: &MockServer) -> AppConfig {
    let mut config = AppConfig::new("client-123", "tenant");
    config.authority_host = server.uri();
    config.graph_endpoint = server.uri();
    config.auth_timeout_secs = 5;
    config
}

/// A fresh home directory with `templates/` and `sent/` in place.
pub fn home() -> (TempDir, Paths) {
    let dir = TempDir::new().unwrap();
    let paths = Paths::new(dir.path());
    paths.ensure_dirs().unwrap();
    (dir, paths)
}

pub fn required_scopes() -> Vec<String> {
    REQUIRED_SCOPES.iter().map(ToString::to_string).collect()
}

pub fn valid_token(access: &str) -> Token {
    Token::new(access, "Bearer")
        .with_expires_at(Utc::now() + Duration::hours(1))
        .with_refresh_token("refresh-1")
}

pub fn expired_token(access: &str) -> Token {
    Token::new(access, "Bearer")
        .with_expires_at(Utc::now() - Duration::minutes(5))
        .with_refresh_token("refresh-1")
}

/// Writes a cache holding one account for `token`.
pub fn seed_cache(paths: &Paths, token: Token) {
    let mut cache = TokenCache::default();
    cache.upsert(CachedAccount::from_token(token, &required_scopes()));
    FileCredentialCache::new(&paths.token_cache)
        .save(&cache.to_blob().unwrap())
        .unwrap();
}

/// Reads back whatever the provider persisted.
pub fn read_cache(paths: &Paths) -> TokenCache {
    let blob = FileCredentialCache::new(&paths.token_cache).load().unwrap();
    TokenCache::from_blob(blob.as_deref())
}

pub fn device_code_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "device_code": "dev-code",
        "user_code": "ABCD-EFGH",
        "verification_uri": "https://microsoft.com/devicelogin",
        "expires_in": 60,
        "interval": 0
    }))
}

pub fn token_response(access: &str, refresh: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "access_token": access,
        "token_type": "Bearer",
        "expires_in": 3600,
        "refresh_token": refresh,
        "scope": "Mail.Send Mail.ReadWrite User.Read"
    }))
}

pub fn oauth_error(code: &str) -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(serde_json::json!({
        "error": code,
        "error_description": format!("{code} from test")
    }))
}

/// Unsigned JWT carrying the given claims; only the payload is read.
pub fn id_token(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.")
}

pub fn token_response_with_id(access: &str, id_token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "access_token": access,
        "token_type": "Bearer",
        "expires_in": 3600,
        "refresh_token": "refresh-id",
        "id_token": id_token
    }))
}
