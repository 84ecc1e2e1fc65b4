//! Append-only audit trail of accepted sends.
//!
//! One JSON file per send in the audit directory, named
//! `<yyyyMMdd-HHmmss>-<recipient local part>.json`. Records are never
//! rewritten once finalized.
//!
//! A send first writes a provisional `<name>.json.pending` entry, then
//! either finalizes it after the provider accepts the message or discards
//! it after a rejection. A pending entry that survives a run marks a send
//! whose outcome was never reconciled.

mod model;
mod repository;

pub use model::{AuditRecord, AuditStatus};
pub use repository::{AuditLog, DEFAULT_LIST_LIMIT, PendingEntry, file_stem};
