//! End-to-end send pipeline against mock identity and Graph endpoints.

#![allow(clippy::unwrap_used)]

mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use common::*;
use mailgate_core::audit::{DEFAULT_LIST_LIMIT, file_stem};
use mailgate_core::cache::FileCredentialCache;
use mailgate_core::{
    AuditLog, AuditStatus, Error, GraphClient, Mailer, Paths, SendContext, SendGate,
    TokenProvider, Validator, ValidatorResult,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn mailer(server: &MockServer, paths: &Paths) -> Mailer {
    Mailer::from_config(&config_for(server), paths, Box::new(CountingPrompt::default())).unwrap()
}

async fn accept_sends(server: &MockServer, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/me/sendMail"))
        .and(header("authorization", "Bearer cached"))
        .respond_with(ResponseTemplate::new(202))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn accepted_send_writes_one_record() {
    let server = MockServer::start().await;
    accept_sends(&server, 1).await;
    let (_home, paths) = home();
    seed_cache(&paths, valid_token("cached"));

    let receipt = mailer(&server, &paths)
        .send("alice@example.com", "Quarterly report", "Numbers attached.")
        .await
        .unwrap();

    assert_eq!(receipt.record.status, AuditStatus::Sent);
    assert_eq!(receipt.record.recipient, "alice@example.com");
    assert_eq!(receipt.record.validator_id, "email.audit");
    assert!(receipt.record.outlook_flag);
    assert!(receipt.path.exists());
    assert!(receipt.warnings.is_empty());

    let names = files_in(&paths.sent_dir);
    assert_eq!(names.len(), 1);
    assert!(names[0].ends_with("-alice.json"));

    let records = AuditLog::new(&paths.sent_dir).list(DEFAULT_LIST_LIMIT).unwrap();
    assert_eq!(records, vec![receipt.record]);
}

#[tokio::test]
async fn rejected_send_leaves_no_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/me/sendMail"))
        .respond_with(ResponseTemplate::new(401).set_body_string("InvalidAuthenticationToken"))
        .expect(1)
        .mount(&server)
        .await;
    let (_home, paths) = home();
    seed_cache(&paths, valid_token("cached"));

    let err = mailer(&server, &paths)
        .send("alice@example.com", "Hi", "Body")
        .await
        .unwrap_err();

    match err {
        Error::Send { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "InvalidAuthenticationToken");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(files_in(&paths.sent_dir).is_empty());
}

#[tokio::test]
async fn gate_failure_sends_nothing() {
    let server = MockServer::start().await;
    let (_home, paths) = home();
    fs::remove_dir(&paths.sent_dir).unwrap();
    seed_cache(&paths, valid_token("cached"));

    let err = mailer(&server, &paths)
        .send("alice@example.com", "Hi", "Body")
        .await
        .unwrap_err();

    match err {
        Error::ValidationFailed { validator, reason } => {
            assert_eq!(validator, "email.audit");
            assert_eq!(reason, "Audit directory does not exist");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(!paths.sent_dir.exists());
}

#[tokio::test]
async fn empty_subject_is_blocked() {
    let server = MockServer::start().await;
    let (_home, paths) = home();
    seed_cache(&paths, valid_token("cached"));

    let err = mailer(&server, &paths)
        .send("alice@example.com", "", "Body")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::ValidationFailed { ref reason, .. } if reason == "Missing required field: subject"
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_provider_keeps_pending_entry() {
    let server = MockServer::start().await;
    let (_home, paths) = home();
    seed_cache(&paths, valid_token("cached"));

    let mut config = config_for(&server);
    config.graph_endpoint = "http://127.0.0.1:9".into();
    let mailer =
        Mailer::from_config(&config, &paths, Box::new(CountingPrompt::default())).unwrap();

    let err = mailer
        .send("alice@example.com", "Hi", "Body")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
    let audit = AuditLog::new(&paths.sent_dir);
    assert!(audit.list(DEFAULT_LIST_LIMIT).unwrap().is_empty());
    let pending = audit.pending().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].1.status, AuditStatus::Pending);
}

#[tokio::test]
async fn stalled_provider_times_out_and_keeps_pending_entry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/me/sendMail"))
        .respond_with(ResponseTemplate::new(202).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;
    let (_home, paths) = home();
    seed_cache(&paths, valid_token("cached"));

    let mut config = config_for(&server);
    config.http_timeout_secs = 1;
    let mailer =
        Mailer::from_config(&config, &paths, Box::new(CountingPrompt::default())).unwrap();

    let err = mailer
        .send("alice@example.com", "Hi", "Body")
        .await
        .unwrap_err();

    match err {
        Error::Transport(e) => assert!(e.is_timeout()),
        other => panic!("unexpected error: {other}"),
    }
    let audit = AuditLog::new(&paths.sent_dir);
    assert!(audit.list(DEFAULT_LIST_LIMIT).unwrap().is_empty());
    assert_eq!(audit.pending().unwrap().len(), 1);
}

/// Accepts the message, but only after occupying the final record path.
struct AcceptAfterOccupying(PathBuf);

impl Respond for AcceptAfterOccupying {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        fs::write(&self.0, b"{}").unwrap();
        ResponseTemplate::new(202)
    }
}

#[tokio::test]
async fn accepted_but_unrecorded_send_is_audit_incomplete() {
    let server = MockServer::start().await;
    let (_home, paths) = home();
    seed_cache(&paths, valid_token("cached"));

    let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
    let occupied = paths
        .sent_dir
        .join(format!("{}.json", file_stem(at, "erin@example.com")));
    Mock::given(method("POST"))
        .and(path("/me/sendMail"))
        .respond_with(AcceptAfterOccupying(occupied.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let err = mailer(&server, &paths)
        .send_at("erin@example.com", "Hi", "Body", at)
        .await
        .unwrap_err();

    match err {
        Error::AuditIncomplete { path, reason } => {
            assert!(path.exists());
            assert!(path.to_string_lossy().ends_with(".json.pending"));
            assert!(!reason.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fs::read(&occupied).unwrap(), b"{}");
    let pending = AuditLog::new(&paths.sent_dir).pending().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].1.recipient, "erin@example.com");
}

#[tokio::test]
async fn same_second_sends_do_not_overwrite() {
    let server = MockServer::start().await;
    accept_sends(&server, 2).await;
    let (_home, paths) = home();
    seed_cache(&paths, valid_token("cached"));

    let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
    let mailer = mailer(&server, &paths);
    let first = mailer.send_at("bob@example.com", "One", "1", at).await.unwrap();
    let second = mailer.send_at("bob@example.com", "Two", "2", at).await.unwrap();

    assert_ne!(first.path, second.path);
    assert_eq!(
        files_in(&paths.sent_dir),
        vec!["20240301-093000-bob-1.json", "20240301-093000-bob.json"]
    );
}

struct LongSubject;

impl Validator for LongSubject {
    fn id(&self) -> &str {
        "email.subject_length"
    }

    fn version(&self) -> &str {
        "0.1.0"
    }

    fn validate(&self, context: &SendContext) -> ValidatorResult {
        if context.subject.len() > 10 {
            ValidatorResult::warn("Subject is long")
        } else {
            ValidatorResult::pass("Subject length ok")
        }
    }
}

#[tokio::test]
async fn warnings_do_not_block() {
    let server = MockServer::start().await;
    accept_sends(&server, 1).await;
    let (_home, paths) = home();
    seed_cache(&paths, valid_token("cached"));

    let config = config_for(&server);
    let tokens = TokenProvider::new(
        &config,
        Box::new(FileCredentialCache::new(&paths.token_cache)),
        Box::new(CountingPrompt::default()),
    )
    .unwrap();
    let mailer = Mailer::new(
        tokens,
        SendGate::standard(&paths.sent_dir).with(LongSubject),
        AuditLog::new(&paths.sent_dir),
        GraphClient::new(&config.graph_endpoint).unwrap(),
    );

    let receipt = mailer
        .send("carol@example.com", "A rather long subject", "Body")
        .await
        .unwrap();

    assert_eq!(receipt.warnings.len(), 1);
    assert_eq!(receipt.warnings[0].validator_id, "email.subject_length");
    assert_eq!(receipt.record.validator_id, "email.audit");
}
