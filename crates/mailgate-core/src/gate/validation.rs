//! Validators and the gate that runs them.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::{debug, warn};

use super::model::{SendContext, ValidatorResult, ValidatorStatus, Verdict};
use crate::error::{Error, Result};

/// A replaceable pre-send policy.
///
/// Implementations only certify; they must not write anything.
pub trait Validator: Send + Sync {
    /// Stable identifier, recorded in the audit trail.
    fn id(&self) -> &str;

    /// Version of the policy.
    fn version(&self) -> &str;

    /// Judges a send context. Must be deterministic for an unchanged
    /// context and filesystem.
    fn validate(&self, context: &SendContext) -> ValidatorResult;
}

/// Parses an ISO-8601 timestamp; a trailing `Z` means UTC, and naive
/// values are taken as UTC. Surrounding whitespace is rejected.
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    // chrono's format parser skips leading whitespace before numbers.
    if value.trim() != value {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = value.strip_suffix('Z').unwrap_or(value);
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(dt.and_utc());
        }
    }

    NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Certifies that a send can be audited: required fields present, a
/// parseable timestamp, and an existing audit directory.
#[derive(Debug, Clone)]
pub struct AuditReadinessValidator {
    audit_dir: PathBuf,
}

impl AuditReadinessValidator {
    /// Validator id.
    pub const ID: &'static str = "email.audit";

    /// Validator version.
    pub const VERSION: &'static str = "1.0.0";

    /// Fields that must be present and non-empty, checked in this order.
    pub const REQUIRED_FIELDS: [&'static str; 3] = ["to", "subject", "timestamp"];

    /// Creates the validator for the given audit directory.
    #[must_use]
    pub fn new(audit_dir: impl AsRef<Path>) -> Self {
        Self {
            audit_dir: audit_dir.as_ref().to_path_buf(),
        }
    }
}

impl Validator for AuditReadinessValidator {
    fn id(&self) -> &str {
        Self::ID
    }

    fn version(&self) -> &str {
        Self::VERSION
    }

    fn validate(&self, context: &SendContext) -> ValidatorResult {
        for field in Self::REQUIRED_FIELDS {
            if context.field(field).is_none_or(str::is_empty) {
                return ValidatorResult::fail(format!("Missing required field: {field}"));
            }
        }

        if parse_timestamp(&context.timestamp).is_none() {
            return ValidatorResult::fail("Invalid timestamp format");
        }

        if !self.audit_dir.is_dir() {
            return ValidatorResult::fail("Audit directory does not exist");
        }

        ValidatorResult::pass("Audit trail ready")
    }
}

/// Ordered list of validators run before every send.
#[derive(Default)]
pub struct SendGate {
    validators: Vec<Box<dyn Validator>>,
}

impl std::fmt::Debug for SendGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.validators.iter().map(|v| v.id()))
            .finish()
    }
}

impl SendGate {
    /// Creates an empty gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The default gate: audit readiness for `audit_dir`.
    #[must_use]
    pub fn standard(audit_dir: impl AsRef<Path>) -> Self {
        Self::new().with(AuditReadinessValidator::new(audit_dir))
    }

    /// Appends a validator; validators run in insertion order.
    #[must_use]
    pub fn with(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    /// Number of registered validators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// True when no validator is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Runs every validator in order and returns their verdicts.
    ///
    /// # Errors
    ///
    /// `ValidationFailed` for the first validator that fails; `Config` when
    /// the gate is empty, since an empty gate certifies nothing.
    pub fn check(&self, context: &SendContext) -> Result<Vec<Verdict>> {
        if self.validators.is_empty() {
            return Err(Error::Config("send gate has no validators".into()));
        }

        let mut verdicts = Vec::with_capacity(self.validators.len());
        for validator in &self.validators {
            let result = validator.validate(context);
            match result.status {
                ValidatorStatus::Fail => {
                    warn!(validator = validator.id(), reason = %result.reason, "Send blocked");
                    return Err(Error::ValidationFailed {
                        validator: validator.id().to_string(),
                        reason: result.reason,
                    });
                }
                ValidatorStatus::Warn => {
                    warn!(validator = validator.id(), reason = %result.reason, "Validator warning");
                }
                ValidatorStatus::Pass => {
                    debug!(validator = validator.id(), reason = %result.reason, "Validator passed");
                }
            }
            verdicts.push(Verdict {
                validator_id: validator.id().to_string(),
                validator_version: validator.version().to_string(),
                result,
            });
        }
        Ok(verdicts)
    }
}
