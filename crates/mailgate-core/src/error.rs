//! Error types for the core library.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in core operations.
///
/// Every variant is terminal for the current invocation; nothing in the
/// pipeline retries.
#[derive(Debug, Error)]
pub enum Error {
    /// No configuration file; the user has to run setup first.
    #[error("No configuration found at {}; run `mailgate setup` first", .0.display())]
    ConfigMissing(PathBuf),

    /// Configuration present but unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token acquisition failed (silent and interactive).
    #[error("Authentication failed: {0}")]
    Auth(#[from] mailgate_oauth::Error),

    /// The send gate rejected the send context.
    #[error("Validation failed ({validator}): {reason}")]
    ValidationFailed {
        /// Id of the validator that failed.
        validator: String,
        /// Reason reported by the validator.
        reason: String,
    },

    /// The mail provider answered with a status other than the expected one.
    #[error("Send failed: {status} - {body}")]
    Send {
        /// HTTP status returned by the provider.
        status: u16,
        /// Response body, verbatim.
        body: String,
    },

    /// The request never produced a provider status.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider accepted the message but the audit record could not be
    /// finalized. The provisional entry at `path` is left in place.
    #[error("Message accepted but audit record not finalized ({reason}); pending entry: {}", path.display())]
    AuditIncomplete {
        /// Provisional audit entry that remains on disk.
        path: PathBuf,
        /// Underlying failure.
        reason: String,
    },

    /// Template file does not exist.
    #[error("Template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    /// Credential cache storage error.
    #[error("Credential error: {0}")]
    Credential(#[from] crate::cache::CredentialError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid endpoint URL.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
