//! Send gate: pre-transmission checks.
//!
//! A [`SendGate`] runs an ordered list of [`Validator`]s over the
//! [`SendContext`] of each send. The first `fail` aborts the send; `warn`
//! is logged and let through.

mod model;
mod validation;

pub use model::{SendContext, ValidatorResult, ValidatorStatus, Verdict};
pub use validation::{AuditReadinessValidator, SendGate, Validator, parse_timestamp};
