//! Microsoft Graph mail endpoints.

use chrono::{DateTime, Utc};
use mailgate_oauth::Token;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::gate::SendContext;

/// A plain text message for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body: String,
}

impl From<&SendContext> for OutgoingMessage {
    fn from(context: &SendContext) -> Self {
        Self {
            to: context.to.clone(),
            subject: context.subject.clone(),
            body: context.body.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMailRequest<'a> {
    message: GraphMessage<'a>,
    save_to_sent_items: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphMessage<'a> {
    subject: &'a str,
    body: ItemBody<'a>,
    to_recipients: Vec<Recipient<&'a str>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemBody<'a> {
    content_type: &'static str,
    content: &'a str,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Recipient<T> {
    email_address: EmailAddress<T>,
}

#[derive(Serialize, Deserialize)]
struct EmailAddress<T> {
    address: T,
}

impl OutgoingMessage {
    /// `sendMail` request body; the copy is saved to Sent Items.
    fn to_request(&self) -> SendMailRequest<'_> {
        SendMailRequest {
            message: GraphMessage {
                subject: &self.subject,
                body: ItemBody {
                    content_type: "Text",
                    content: &self.body,
                },
                to_recipients: vec![Recipient {
                    email_address: EmailAddress { address: &self.to },
                }],
            },
            save_to_sent_items: true,
        }
    }
}

/// Summary of a received message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxMessage {
    /// Subject line.
    pub subject: String,
    /// Sender address, if present.
    pub from: Option<String>,
    /// When the message arrived.
    pub received: Option<DateTime<Utc>>,
    /// Whether it has been read.
    pub is_read: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphMessageSummary {
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    from: Option<Recipient<Option<String>>>,
    #[serde(default)]
    received_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    is_read: bool,
}

#[derive(Deserialize)]
struct MessagePage {
    #[serde(default)]
    value: Vec<GraphMessageSummary>,
}

/// Client for the Graph `/me` mail endpoints.
#[derive(Debug, Clone)]
pub struct GraphClient {
    http: Client,
    base: String,
}

impl GraphClient {
    /// Creates a client for a Graph base URL such as
    /// `https://graph.microsoft.com/v1.0`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a valid URL.
    pub fn new(endpoint: &str) -> Result<Self> {
        Url::parse(endpoint)?;
        Ok(Self {
            http: Client::new(),
            base: endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Uses a shared HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    /// Sends `message` as the signed-in user.
    ///
    /// Only `202 Accepted` counts as success. Nothing is retried.
    ///
    /// # Errors
    ///
    /// `Send` with the status and verbatim body for any other status;
    /// `Transport` when no response was received.
    pub async fn send_mail(&self, token: &Token, message: &OutgoingMessage) -> Result<()> {
        let url = format!("{}/me/sendMail", self.base);
        debug!(to = %message.to, "POST {url}");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&token.access_token)
            .json(&message.to_request())
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::ACCEPTED {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::Send {
            status: status.as_u16(),
            body,
        })
    }

    /// Newest inbox messages, at most `top`.
    ///
    /// # Errors
    ///
    /// `Send` with status and body for a non-success status; `Transport`
    /// when no response was received.
    pub async fn recent_messages(&self, token: &Token, top: u32) -> Result<Vec<InboxMessage>> {
        let url = format!("{}/me/messages", self.base);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&token.access_token)
            .query(&[
                ("$top", top.to_string()),
                ("$orderby", "receivedDateTime desc".to_string()),
                ("$select", "subject,from,receivedDateTime,isRead".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Send {
                status: status.as_u16(),
                body,
            });
        }

        let page: MessagePage = response.json().await?;
        Ok(page
            .value
            .into_iter()
            .map(|m| InboxMessage {
                subject: m.subject.unwrap_or_default(),
                from: m.from.and_then(|r| r.email_address.address),
                received: m.received_date_time,
                is_read: m.is_read,
            })
            .collect())
    }
}
