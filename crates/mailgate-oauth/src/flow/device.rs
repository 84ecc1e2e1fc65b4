//! Device Authorization Flow implementation (RFC 8628).

use super::OAuthClient;
use crate::error::{Error, Result};
use crate::token::{ErrorResponse, Token, TokenResponse};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Device authorization response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceAuthorization {
    /// Device code for polling.
    pub device_code: String,
    /// User code to display to the user.
    pub user_code: String,
    /// Verification URI where user should go.
    pub verification_uri: String,
    /// Complete verification URI (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_uri_complete: Option<String>,
    /// Expiration time in seconds.
    pub expires_in: u32,
    /// Polling interval in seconds (minimum 5 seconds).
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Ready-made instructions from the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

const fn default_interval() -> u32 {
    5
}

/// Shortest wait between polls, whatever the provider advertises.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Added to the polling interval on every `slow_down` (RFC 8628 3.5).
pub const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

impl DeviceAuthorization {
    /// Interval to start polling with, never below [`MIN_POLL_INTERVAL`].
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval)).max(MIN_POLL_INTERVAL)
    }
}

/// Bounds on how long [`DeviceFlow::wait_for_token`] may block.
///
/// The wait always ends when the provider expires the device code. A
/// caller-supplied `timeout` can shorten that, and `cancel` ends it
/// immediately.
#[derive(Debug, Clone, Default)]
pub struct PollOptions {
    /// Upper bound on the wait, independent of the code lifetime.
    pub timeout: Option<Duration>,
    /// Cancels the wait when triggered.
    pub cancel: CancellationToken,
}

impl PollOptions {
    /// Sets the wait timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Uses the given cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Device Authorization Flow for `OAuth2`.
///
/// This flow is suitable for devices with limited input capabilities
/// or no browser (e.g., CLI applications).
#[derive(Debug)]
pub struct DeviceFlow {
    client: OAuthClient,
}

impl DeviceFlow {
    /// Creates a new device flow.
    #[must_use]
    pub const fn new(client: OAuthClient) -> Self {
        Self { client }
    }

    /// Requests device authorization from the server.
    ///
    /// Returns the device code and user code that should be displayed to the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider has no device endpoint or the
    /// authorization request fails.
    pub async fn request_device_authorization(
        &self,
        scopes: Option<&[String]>,
    ) -> Result<DeviceAuthorization> {
        let device_auth_url = self
            .client
            .provider
            .device_auth_url
            .as_ref()
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "Provider {} does not support device flow",
                    self.client.provider.name
                ))
            })?;

        let scope_str = self.client.scope_string(scopes);

        let mut params = HashMap::new();
        params.insert("client_id", self.client.client_id.as_str());
        if !scope_str.is_empty() {
            params.insert("scope", &scope_str);
        }

        let response = self
            .client
            .http_client
            .post(device_auth_url.clone())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let error: ErrorResponse = response.json().await?;
            return Err(error.into_error());
        }

        let auth: DeviceAuthorization = response.json().await?;
        debug!(
            expires_in = auth.expires_in,
            interval = auth.interval,
            "Device authorization issued"
        );
        Ok(auth)
    }

    /// Polls once for token completion after waiting `interval`.
    ///
    /// # Errors
    ///
    /// Returns `Error::AccessDenied` if the user declined, `Error::TokenExpired`
    /// if the device code expired, and `OAuth` errors with code
    /// `authorization_pending` or `slow_down` which mean "keep polling".
    pub async fn poll_for_token(&self, device_code: &str, interval: Duration) -> Result<Token> {
        tokio::time::sleep(interval).await;

        let mut params = HashMap::new();
        params.insert("grant_type", "urn:ietf:params:oauth:grant-type:device_code");
        params.insert("device_code", device_code);
        params.insert("client_id", &self.client.client_id);

        let response = self
            .client
            .http_client
            .post(self.client.provider.token_url.clone())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let error: ErrorResponse = response.json().await?;

            return match error.error.as_str() {
                "authorization_pending" | "slow_down" => Err(error.into_error()),
                "access_denied" | "authorization_declined" => Err(Error::AccessDenied),
                "expired_token" => Err(Error::TokenExpired),
                _ => Err(error.into_error()),
            };
        }

        let token_response: TokenResponse = response.json().await?;
        Token::from_response(token_response)
    }

    /// Polls until the user approves, denies, the code expires, the
    /// timeout elapses or the wait is cancelled.
    ///
    /// # Errors
    ///
    /// `Error::TokenExpired` when the code lifetime runs out,
    /// `Error::Timeout` when `options.timeout` runs out first,
    /// `Error::Cancelled` on cancellation, plus any terminal provider error.
    pub async fn wait_for_token(
        &self,
        auth: &DeviceAuthorization,
        options: &PollOptions,
    ) -> Result<Token> {
        let lifetime = Duration::from_secs(u64::from(auth.expires_in));
        let (budget, on_deadline) = match options.timeout {
            Some(timeout) if timeout < lifetime => (timeout, Error::Timeout(timeout.as_secs())),
            _ => (lifetime, Error::TokenExpired),
        };
        let deadline = Instant::now() + budget;
        let mut interval = auth.poll_interval();

        loop {
            if Instant::now() >= deadline {
                return Err(on_deadline);
            }

            let polled = tokio::select! {
                biased;
                () = options.cancel.cancelled() => return Err(Error::Cancelled),
                polled = tokio::time::timeout_at(
                    deadline,
                    self.poll_for_token(&auth.device_code, interval),
                ) => polled,
            };

            // Deadline hit mid-poll; the check above reports it.
            let Ok(result) = polled else { continue };

            match result {
                Ok(token) => {
                    info!("Device authorization completed");
                    return Ok(token);
                }
                Err(ref e) if e.code() == Some("authorization_pending") => {}
                Err(ref e) if e.code() == Some("slow_down") => {
                    interval += SLOW_DOWN_STEP;
                    debug!(interval_secs = interval.as_secs(), "Provider asked to slow down");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Complete device authorization flow.
    ///
    /// Requests a device code, hands it to `present` for display, then
    /// waits for the user within the bounds of `options`.
    ///
    /// # Errors
    ///
    /// Returns an error if authorization fails, expires, times out or is
    /// cancelled.
    pub async fn authorize<F>(
        &self,
        scopes: Option<&[String]>,
        options: &PollOptions,
        present: F,
    ) -> Result<(DeviceAuthorization, Token)>
    where
        F: FnOnce(&DeviceAuthorization),
    {
        let auth = self.request_device_authorization(scopes).await?;
        present(&auth);
        let token = self.wait_for_token(&auth, options).await?;
        Ok((auth, token))
    }
}
