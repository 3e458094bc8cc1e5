use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{LineError, LineResult};

pub const DEFAULT_API_BASE: &str = "https://api.line.me";
pub const DEFAULT_DATA_API_BASE: &str = "https://api-data.line.me";

/// Outgoing message object
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SendMessage {
    Text { text: String },
}

impl SendMessage {
    pub fn text(text: impl Into<String>) -> Self {
        SendMessage::Text { text: text.into() }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyMessageRequest<'a> {
    reply_token: &'a str,
    messages: &'a [SendMessage],
}

/// Error body returned by the Messaging API
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(default)]
    details: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    property: String,
}

/// Client for the Messaging API endpoints the bot uses
#[derive(Debug, Clone)]
pub struct MessagingClient {
    client: Client,
    channel_access_token: String,
    api_base: String,
    data_api_base: String,
}

impl MessagingClient {
    /// Create a client against the public API hosts
    pub fn new(channel_access_token: impl Into<String>) -> Self {
        Self::with_base_urls(channel_access_token, DEFAULT_API_BASE, DEFAULT_DATA_API_BASE)
    }

    /// Create a client against custom hosts (proxies, tests)
    pub fn with_base_urls(
        channel_access_token: impl Into<String>,
        api_base: &str,
        data_api_base: &str,
    ) -> Self {
        Self {
            client: Client::new(),
            channel_access_token: channel_access_token.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
            data_api_base: data_api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Reply to the chat an event came from
    pub async fn reply_message(&self, reply_token: &str, messages: &[SendMessage]) -> LineResult<()> {
        let url = format!("{}/v2/bot/message/reply", self.api_base);
        let body = ReplyMessageRequest {
            reply_token,
            messages,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.channel_access_token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        debug!(messages = messages.len(), "Sent reply");
        Ok(())
    }

    /// Download the binary content (image, video, audio, file) of a user message
    pub async fn get_message_content(&self, message_id: &str) -> LineResult<Bytes> {
        let url = format!("{}/v2/bot/message/{}/content", self.data_api_base, message_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.channel_access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let content = response.bytes().await?;
        debug!(message_id, bytes = content.len(), "Fetched message content");
        Ok(content)
    }
}

async fn api_error(response: reqwest::Response) -> LineError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    let message = match serde_json::from_str::<ApiErrorBody>(&body) {
        Ok(error) if error.details.is_empty() => error.message,
        Ok(error) => {
            let details: Vec<String> = error
                .details
                .iter()
                .map(|d| format!("{}: {}", d.property, d.message))
                .collect();
            format!("{} ({})", error.message, details.join(", "))
        }
        Err(_) => body,
    };

    LineError::Api { status, message }
}
