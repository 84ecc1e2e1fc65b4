//! # mailgate-core
//!
//! Authentication-and-audit pipeline for sending mail through Microsoft
//! Graph.
//!
//! This crate provides:
//! - Configuration and on-disk layout ([`AppConfig`], [`Paths`])
//! - Credential cache backends (file, optionally the system keyring)
//! - Token acquisition: cached, refreshed, or via device code sign-in
//! - **Send gate** - validators that must pass before anything is sent
//! - **Audit log** - one immutable JSON record per accepted send
//! - Graph mail client and the [`Mailer`] that ties it together
//! - Message templates

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod audit;
pub mod auth;
pub mod cache;
pub mod config;
mod error;
pub mod gate;
pub mod service;
pub mod templates;

pub use audit::{AuditLog, AuditRecord, AuditStatus};
pub use auth::{DeviceCodePrompt, TokenProvider};
pub use cache::{CredentialCache, CredentialError, CredentialResult};
pub use config::{AppConfig, CacheBackend, Paths};
pub use error::{Error, Result};
pub use gate::{SendContext, SendGate, Validator, ValidatorResult, ValidatorStatus, Verdict};
pub use service::{GraphClient, InboxMessage, Mailer, OutgoingMessage, SendReceipt};
pub use templates::{Template, TemplateStore};
