//! Token acquisition against a mock identity provider.

#![allow(clippy::unwrap_used)]

mod common;

use common::*;
use mailgate_core::cache::FileCredentialCache;
use mailgate_core::{Error, TokenProvider};
use tokio_test::assert_err;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer};

fn provider(server: &MockServer, paths: &mailgate_core::Paths, prompt: &CountingPrompt) -> TokenProvider {
    TokenProvider::new(
        &config_for(server),
        Box::new(FileCredentialCache::new(&paths.token_cache)),
        Box::new(prompt.clone()),
    )
    .unwrap()
}

#[tokio::test]
async fn cached_token_is_used_without_network() {
    let server = MockServer::start().await;
    let (_home, paths) = home();
    seed_cache(&paths, valid_token("cached"));

    let prompt = CountingPrompt::default();
    let token = provider(&server, &paths, &prompt).access_token().await.unwrap();

    assert_eq!(token.access_token, "cached");
    assert_eq!(prompt.count(), 0);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn interactive_sign_in_is_cached_for_next_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(DEVICE_PATH))
        .and(body_string_contains("Mail.Send"))
        .respond_with(device_code_response())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("device_code"))
        .respond_with(token_response("fresh", "refresh-2"))
        .expect(1)
        .mount(&server)
        .await;

    let (_home, paths) = home();
    let prompt = CountingPrompt::default();
    let tokens = provider(&server, &paths, &prompt);

    let first = tokens.access_token().await.unwrap();
    let second = tokens.access_token().await.unwrap();

    assert_eq!(first.access_token, "fresh");
    assert_eq!(second, first);
    assert_eq!(prompt.count(), 1);

    let cache = read_cache(&paths);
    assert_eq!(cache.accounts.len(), 1);
    assert_eq!(cache.accounts[0].token.refresh_token.as_deref(), Some("refresh-2"));
}

#[tokio::test]
async fn account_is_labelled_from_id_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(DEVICE_PATH))
        .and(body_string_contains("openid"))
        .respond_with(device_code_response())
        .mount(&server)
        .await;
    let claims = serde_json::json!({
        "preferred_username": "dana@contoso.com",
        "oid": "object-1",
        "tid": "tenant-1"
    });
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(token_response_with_id("signed-in", &id_token(&claims)))
        .mount(&server)
        .await;

    let (_home, paths) = home();
    let prompt = CountingPrompt::default();
    provider(&server, &paths, &prompt).access_token().await.unwrap();

    let cache = read_cache(&paths);
    assert_eq!(cache.accounts[0].username, "dana@contoso.com");
    assert_eq!(cache.accounts[0].home_account_id.as_deref(), Some("object-1.tenant-1"));
}

#[tokio::test]
async fn failed_sign_in_leaves_cache_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(DEVICE_PATH))
        .respond_with(device_code_response())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(oauth_error("access_denied"))
        .mount(&server)
        .await;

    let (_home, paths) = home();
    let prompt = CountingPrompt::default();
    let err = provider(&server, &paths, &prompt)
        .access_token()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Auth(mailgate_oauth::Error::AccessDenied)));
    assert_eq!(prompt.count(), 1);
    assert!(!paths.token_cache.exists());
}

#[tokio::test]
async fn expired_token_is_refreshed_and_persisted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(token_response("renewed", "refresh-2"))
        .expect(1)
        .mount(&server)
        .await;

    let (_home, paths) = home();
    seed_cache(&paths, expired_token("stale"));

    let prompt = CountingPrompt::default();
    let token = provider(&server, &paths, &prompt).access_token().await.unwrap();

    assert_eq!(token.access_token, "renewed");
    assert_eq!(prompt.count(), 0);
    let cache = read_cache(&paths);
    assert_eq!(cache.accounts[0].token.access_token, "renewed");
    assert_eq!(cache.accounts[0].token.refresh_token.as_deref(), Some("refresh-2"));
}

#[tokio::test]
async fn rejected_refresh_falls_back_to_device_flow() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(oauth_error("invalid_grant"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(DEVICE_PATH))
        .respond_with(device_code_response())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("device_code"))
        .respond_with(token_response("interactive", "refresh-3"))
        .mount(&server)
        .await;

    let (_home, paths) = home();
    seed_cache(&paths, expired_token("stale"));

    let prompt = CountingPrompt::default();
    let token = provider(&server, &paths, &prompt).access_token().await.unwrap();

    assert_eq!(token.access_token, "interactive");
    assert_eq!(prompt.count(), 1);
    assert_eq!(read_cache(&paths).accounts.len(), 1);
}

#[tokio::test]
async fn cancelled_sign_in_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(DEVICE_PATH))
        .respond_with(device_code_response())
        .mount(&server)
        .await;

    let (_home, paths) = home();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let prompt = CountingPrompt::default();
    let tokens = provider(&server, &paths, &prompt).with_cancellation(cancel);

    let err = assert_err!(tokens.access_token().await);
    assert!(matches!(err, Error::Auth(mailgate_oauth::Error::Cancelled)));
    assert!(!paths.token_cache.exists());
}

#[tokio::test]
async fn logout_forgets_accounts() {
    let server = MockServer::start().await;
    let (_home, paths) = home();
    seed_cache(&paths, valid_token("cached"));

    let prompt = CountingPrompt::default();
    let tokens = provider(&server, &paths, &prompt);
    tokens.logout().unwrap();
    tokens.logout().unwrap();

    assert!(!paths.token_cache.exists());
    assert!(tokens.acquire_silent().await.unwrap().is_none());
}
