//! Audit record data model.

use serde::{Deserialize, Serialize};

use crate::gate::{SendContext, Verdict};

/// Lifecycle of an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    /// Written before transmission; not yet reconciled.
    Pending,
    /// Provider accepted the message.
    Sent,
}

impl std::fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Sent => write!(f, "sent"),
        }
    }
}

/// One audit record, as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Validator that certified the send.
    #[serde(rename = "validator", default)]
    pub validator_id: String,
    /// Version of that validator.
    #[serde(rename = "version", default)]
    pub validator_version: String,
    /// ISO-8601 UTC timestamp, `Z` suffixed.
    pub timestamp: String,
    /// Recipient address.
    #[serde(rename = "to")]
    pub recipient: String,
    /// Subject line.
    pub subject: String,
    /// Entry status.
    pub status: AuditStatus,
    /// A copy was saved to the sender's Sent Items.
    #[serde(rename = "outlook", default)]
    pub outlook_flag: bool,
}

impl AuditRecord {
    /// Builds a pending record for a context certified by `verdict`.
    #[must_use]
    pub fn pending(context: &SendContext, verdict: &Verdict) -> Self {
        Self {
            validator_id: verdict.validator_id.clone(),
            validator_version: verdict.validator_version.clone(),
            timestamp: context.timestamp.clone(),
            recipient: context.to.clone(),
            subject: context.subject.clone(),
            status: AuditStatus::Pending,
            outlook_flag: true,
        }
    }
}
