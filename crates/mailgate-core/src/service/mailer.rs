//! The send pipeline: token, gate, provisional audit entry, send, commit.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::graph::{GraphClient, InboxMessage, OutgoingMessage};
use crate::audit::{AuditLog, AuditRecord};
use crate::auth::{DeviceCodePrompt, TokenProvider};
use crate::cache;
use crate::config::{AppConfig, Paths};
use crate::error::{Error, Result};
use crate::gate::{AuditReadinessValidator, SendContext, SendGate, ValidatorStatus, Verdict};

/// Outcome of an accepted send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    /// Final audit record path.
    pub path: PathBuf,
    /// What was written there.
    pub record: AuditRecord,
    /// Verdicts that allowed the send with a warning.
    pub warnings: Vec<Verdict>,
}

/// Sends mail only once a send has been certified and can be audited.
#[derive(Debug)]
pub struct Mailer {
    tokens: TokenProvider,
    gate: SendGate,
    audit: AuditLog,
    graph: GraphClient,
}

impl Mailer {
    /// Assembles a mailer from its parts.
    #[must_use]
    pub const fn new(
        tokens: TokenProvider,
        gate: SendGate,
        audit: AuditLog,
        graph: GraphClient,
    ) -> Self {
        Self {
            tokens,
            gate,
            audit,
            graph,
        }
    }

    /// The standard mailer for a home directory: configured cache backend,
    /// audit-readiness gate over the sent directory, Graph endpoint from
    /// the configuration. One HTTP client, bounded by the configured
    /// request timeout, is shared by auth and Graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache backend is unavailable, an endpoint
    /// URL is invalid or the HTTP client cannot be built.
    pub fn from_config(
        config: &AppConfig,
        paths: &Paths,
        prompt: Box<dyn DeviceCodePrompt>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()?;
        let tokens = TokenProvider::new(config, cache::open(config, paths)?, prompt)?
            .with_http_client(http.clone());
        let graph = GraphClient::new(&config.graph_endpoint)?.with_http_client(http);

        Ok(Self::new(
            tokens,
            SendGate::standard(&paths.sent_dir),
            AuditLog::new(&paths.sent_dir),
            graph,
        ))
    }

    /// Token provider used for every request.
    #[must_use]
    pub const fn tokens(&self) -> &TokenProvider {
        &self.tokens
    }

    /// Lets the caller cancel an interactive sign-in.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.tokens = self.tokens.with_cancellation(cancel);
        self
    }

    /// Audit log the pipeline writes to.
    #[must_use]
    pub const fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Sends one plain text message stamped with the current time.
    ///
    /// # Errors
    ///
    /// See [`Mailer::send_at`].
    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<SendReceipt> {
        self.send_at(to, subject, body, Utc::now()).await
    }

    /// Sends one plain text message stamped with `at`.
    ///
    /// Order: token, gate, provisional audit entry, transmission, final
    /// record. Success is reported only once the final record exists.
    ///
    /// # Errors
    ///
    /// - `Auth` / `Credential` when no token can be obtained
    /// - `ValidationFailed` when a validator fails; nothing is sent
    /// - `Send` when the provider answers with anything but 202; the
    ///   provisional entry is removed
    /// - `Transport` when no answer arrived in time; the provisional entry
    ///   stays because the outcome is unknown
    /// - `AuditIncomplete` when the provider accepted but the final record
    ///   could not be written
    pub async fn send_at(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        at: DateTime<Utc>,
    ) -> Result<SendReceipt> {
        let token = self.tokens.access_token().await?;

        let context = SendContext::new(to, subject, body, at);
        let verdicts = self.gate.check(&context)?;
        let verdict = verdicts
            .iter()
            .find(|v| v.validator_id == AuditReadinessValidator::ID)
            .or_else(|| verdicts.first())
            .ok_or_else(|| Error::Config("send gate returned no verdict".into()))?;

        let entry = self.audit.begin(&context, verdict)?;
        let pending_path = entry.path().to_path_buf();

        match self
            .graph
            .send_mail(&token, &OutgoingMessage::from(&context))
            .await
        {
            Ok(()) => {}
            Err(e @ Error::Send { .. }) => {
                if let Err(cleanup) = self.audit.abandon(entry) {
                    warn!(path = %pending_path.display(), "Could not discard pending entry: {cleanup}");
                }
                return Err(e);
            }
            Err(e) => {
                warn!(
                    path = %pending_path.display(),
                    "Send outcome unknown; pending audit entry kept: {e}"
                );
                return Err(e);
            }
        }

        let (path, record) = self
            .audit
            .commit(entry)
            .map_err(|e| Error::AuditIncomplete {
                path: pending_path,
                reason: e.to_string(),
            })?;

        info!(to = %record.recipient, path = %path.display(), "Message sent");
        Ok(SendReceipt {
            path,
            record,
            warnings: verdicts
                .into_iter()
                .filter(|v| v.result.status == ValidatorStatus::Warn)
                .collect(),
        })
    }

    /// Newest inbox messages for the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if no token can be obtained or Graph rejects the
    /// request.
    pub async fn recent_messages(&self, top: u32) -> Result<Vec<InboxMessage>> {
        let token = self.tokens.access_token().await?;
        self.graph.recent_messages(&token, top).await
    }
}
