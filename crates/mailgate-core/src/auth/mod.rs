//! Token acquisition and the serialized account store.
//!
//! [`TokenProvider::access_token`] tries the cache (a still-valid token,
//! then a refresh) and only falls back to the device code flow when that
//! yields nothing.

mod model;
mod provider;

pub use model::{CachedAccount, DEFAULT_ACCOUNT, TokenCache};
pub use provider::{DeviceCodePrompt, REQUIRED_SCOPES, TokenProvider};
