//! # mailgate-oauth
//!
//! `OAuth2` support for the mailgate pipeline.
//!
//! ## Features
//!
//! - **Device Flow** (RFC 8628) with bounded, cancellable polling
//! - **Token management**: refresh, expiration checking, ID token claims
//! - **Provider configuration**: Microsoft identity platform (per tenant) or
//!   any custom endpoint pair
//!
//! ## Device Flow
//!
//! ```ignore
//! use mailgate_oauth::{DeviceFlow, OAuthClient, PollOptions, Provider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = Provider::microsoft("my-tenant-id")?;
//!     let client = OAuthClient::new("your_client_id", provider);
//!     let flow = DeviceFlow::new(client);
//!
//!     let auth = flow.request_device_authorization(None).await?;
//!     println!("Visit: {}", auth.verification_uri);
//!     println!("Enter code: {}", auth.user_code);
//!
//!     let token = flow.wait_for_token(&auth, &PollOptions::default()).await?;
//!     println!("Authorized! Token expires at {:?}", token.expires_at);
//!     Ok(())
//! }
//! ```
//!
//! ## Token Refresh
//!
//! ```ignore
//! if token.is_expired() {
//!     let new_token = client.refresh_token(&token, None).await?;
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod flow;
pub mod provider;
pub mod token;

pub use error::{Error, Result};
pub use flow::{DeviceAuthorization, DeviceFlow, OAuthClient, PollOptions};
pub use provider::Provider;
pub use token::{IdClaims, Token};
