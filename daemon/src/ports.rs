//! Seams to the external services the dispatcher talks to.

use async_trait::async_trait;
use bytes::Bytes;
use gemini_core::client::GeminiClient;
use gemini_core::errors::GeminiResult;
use gemini_core::types::Content;
use line_messaging::client::{MessagingClient, SendMessage};
use line_messaging::errors::LineResult;

/// Which configured model a generation call should use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Text,
    Vision,
}

/// Produces one reply text from prompt contents
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(&self, model: ModelKind, contents: Vec<Content>) -> GeminiResult<String>;
}

/// The messaging platform operations a flow needs
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn reply_text(&self, reply_token: &str, text: &str) -> LineResult<()>;

    async fn fetch_content(&self, message_id: &str) -> LineResult<Bytes>;
}

#[async_trait]
impl ReplyGenerator for GeminiClient {
    async fn generate(&self, model: ModelKind, contents: Vec<Content>) -> GeminiResult<String> {
        let model_name = match model {
            ModelKind::Text => self.config().text_model(),
            ModelKind::Vision => self.config().vision_model(),
        };
        self.generate_text(model_name, contents).await
    }
}

#[async_trait]
impl Messenger for MessagingClient {
    async fn reply_text(&self, reply_token: &str, text: &str) -> LineResult<()> {
        self.reply_message(reply_token, &[SendMessage::text(text)]).await
    }

    async fn fetch_content(&self, message_id: &str) -> LineResult<Bytes> {
        self.get_message_content(message_id).await
    }
}
