//! Gate data types.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Everything known about one send attempt. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendContext {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body: String,
    /// ISO-8601 timestamp of the attempt.
    pub timestamp: String,
}

impl SendContext {
    /// Builds a context stamped with `at` in `...Z` form.
    #[must_use]
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            timestamp: at.to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }

    /// Looks up a field by the name validators report it under.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "to" => Some(&self.to),
            "subject" => Some(&self.subject),
            "body" => Some(&self.body),
            "timestamp" => Some(&self.timestamp),
            _ => None,
        }
    }
}

/// Outcome class of a validator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorStatus {
    /// Send may proceed.
    Pass,
    /// Send may proceed; the reason is logged.
    Warn,
    /// Send must not proceed.
    Fail,
}

/// Result of one validator on one context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorResult {
    /// Outcome class.
    pub status: ValidatorStatus,
    /// Human-readable reason.
    pub reason: String,
}

impl ValidatorResult {
    /// Passing result.
    #[must_use]
    pub fn pass(reason: impl Into<String>) -> Self {
        Self {
            status: ValidatorStatus::Pass,
            reason: reason.into(),
        }
    }

    /// Non-blocking warning.
    #[must_use]
    pub fn warn(reason: impl Into<String>) -> Self {
        Self {
            status: ValidatorStatus::Warn,
            reason: reason.into(),
        }
    }

    /// Blocking failure.
    #[must_use]
    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            status: ValidatorStatus::Fail,
            reason: reason.into(),
        }
    }

    /// True unless the status is `Fail`.
    #[must_use]
    pub fn allows_send(&self) -> bool {
        self.status != ValidatorStatus::Fail
    }
}

/// A validator's result tagged with the validator identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Validator id, e.g. `email.audit`.
    pub validator_id: String,
    /// Validator version.
    pub validator_version: String,
    /// What the validator decided.
    pub result: ValidatorResult,
}
