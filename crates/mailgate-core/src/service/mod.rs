//! Mail services.
//!
//! [`GraphClient`] talks to Microsoft Graph; [`Mailer`] wraps it in the
//! gated, audited send pipeline.

mod graph;
mod mailer;

pub use graph::{GraphClient, InboxMessage, OutgoingMessage};
pub use mailer::{Mailer, SendReceipt};
