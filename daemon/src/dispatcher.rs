//! Per-event handling of a webhook batch.
//!
//! Events run one after another in arrival order. Each handler returns its
//! own `Result`; a failure is logged and the batch moves on.

use std::sync::Arc;

use gemini_core::errors::GeminiError;
use gemini_memory::exchange::append_exchange;
use gemini_memory::key::{MemoryKey, MemoryScope};
use gemini_memory::retention::RetentionPolicy;
use gemini_memory::store::MemoryStoreRef;
use gemini_memory::MemoryStoreError;
use line_messaging::errors::LineError;
use line_messaging::webhook::{Event, ImageMessage, MessageContent, MessageEvent, TextMessage};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::HistoryMode;
use crate::ports::{Messenger, ModelKind, ReplyGenerator};
use crate::prompt;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("event has no reply token")]
    MissingReplyToken,

    #[error("generation failed: {0}")]
    Generation(#[from] GeminiError),

    #[error("memory storage failed: {0}")]
    Memory(#[from] MemoryStoreError),

    #[error("fetching message content failed: {0}")]
    Content(#[source] LineError),

    #[error("sending reply failed: {0}")]
    Reply(#[source] LineError),
}

/// Behaviour knobs of the reply flows
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub memory_root: String,
    pub memory_scope: MemoryScope,
    pub retention: RetentionPolicy,
    pub max_conflict_retries: usize,
    pub history_mode: HistoryMode,
    pub image_prompt: String,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            memory_root: gemini_memory::key::DEFAULT_MEMORY_ROOT.to_string(),
            memory_scope: MemoryScope::default(),
            retention: RetentionPolicy::default(),
            max_conflict_retries: 3,
            history_mode: HistoryMode::default(),
            image_prompt: prompt::DEFAULT_IMAGE_PROMPT.to_string(),
        }
    }
}

/// Outcome counts of one dispatched batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub succeeded: usize,
    pub failed: usize,
}

/// Routes webhook events to their flows
pub struct Dispatcher {
    generator: Arc<dyn ReplyGenerator>,
    messenger: Arc<dyn Messenger>,
    memory: MemoryStoreRef,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(
        generator: Arc<dyn ReplyGenerator>,
        messenger: Arc<dyn Messenger>,
        memory: MemoryStoreRef,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            generator,
            messenger,
            memory,
            settings,
        }
    }

    /// Handles every event of a batch in order, never stopping early
    pub async fn dispatch(&self, events: &[Event]) -> DispatchReport {
        let mut report = DispatchReport::default();

        for (index, event) in events.iter().enumerate() {
            if let Some(common) = event.common() {
                debug!(
                    index,
                    kind = event.kind(),
                    event_id = ?common.webhook_event_id,
                    redelivery = common.is_redelivery(),
                    "Got event"
                );
            }

            match self.handle_event(event).await {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    report.failed += 1;
                    error!(index, kind = event.kind(), error = %e, "Event handling failed");
                }
            }
        }

        report
    }

    /// Handles one event
    pub async fn handle_event(&self, event: &Event) -> Result<(), DispatchError> {
        match event {
            Event::Message(message_event) => match &message_event.message {
                MessageContent::Text(text) => self.reply_to_text(message_event, text).await,
                MessageContent::Image(image) => self.reply_to_image(message_event, image).await,
                MessageContent::Video(video) => {
                    info!(message_id = %video.id, "Got video message");
                    Ok(())
                }
                MessageContent::Other => {
                    info!("Got unsupported message type");
                    Ok(())
                }
            },
            Event::Follow(_) => {
                info!("Got followed event");
                Ok(())
            }
            Event::Unfollow(_) => {
                info!("Got unfollowed event");
                Ok(())
            }
            Event::Postback(postback) => {
                info!(data = %postback.postback.data, "Got postback");
                Ok(())
            }
            Event::Beacon(beacon) => {
                info!(hwid = %beacon.beacon.hwid, "Got beacon");
                Ok(())
            }
            Event::Other => {
                info!("Got unhandled event type");
                Ok(())
            }
        }
    }

    fn memory_key(&self, event: &MessageEvent) -> MemoryKey {
        MemoryKey::resolve(
            &self.settings.memory_root,
            self.settings.memory_scope,
            event.common.conversation_id(),
        )
    }

    /// Text flow: load memory, generate, store the exchange, reply.
    ///
    /// An unreadable memory counts as empty for the prompt. Before storing,
    /// such a memory is read again so the write never replaces history it
    /// could not see; if it is still unreadable nothing is stored and no
    /// reply is sent, as with any failed save.
    async fn reply_to_text(&self, event: &MessageEvent, text: &TextMessage) -> Result<(), DispatchError> {
        let reply_token = event
            .reply_token
            .as_deref()
            .ok_or(DispatchError::MissingReplyToken)?;
        let key = self.memory_key(event);

        let loaded = match self.memory.load(&key).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(%key, error = %e, "Load memory failed, continuing without history");
                None
            }
        };

        let history = loaded.as_ref().map(|s| s.turns.as_slice()).unwrap_or_default();
        let contents = prompt::text_contents(self.settings.history_mode, history, &text.text);
        let reply = self.generator.generate(ModelKind::Text, contents).await?;
        debug!(message_id = %text.id, reply_len = reply.len(), "Generated text reply");

        let snapshot = match loaded {
            Some(snapshot) => snapshot,
            None => self.memory.load(&key).await?,
        };

        append_exchange(
            self.memory.as_ref(),
            &key,
            snapshot,
            &text.text,
            &reply,
            self.settings.retention,
            self.settings.max_conflict_retries,
        )
        .await?;

        self.messenger
            .reply_text(reply_token, &reply)
            .await
            .map_err(DispatchError::Reply)?;

        info!(%key, message_id = %text.id, "Replied to text message");
        Ok(())
    }

    /// Image flow: fetch the image, ask for a description, reply. Memory is not touched.
    async fn reply_to_image(&self, event: &MessageEvent, image: &ImageMessage) -> Result<(), DispatchError> {
        let reply_token = event
            .reply_token
            .as_deref()
            .ok_or(DispatchError::MissingReplyToken)?;
        info!(message_id = %image.id, "Got image message");

        let data = self
            .messenger
            .fetch_content(&image.id)
            .await
            .map_err(DispatchError::Content)?;

        let contents = prompt::image_contents(&data, &self.settings.image_prompt);
        let reply = self.generator.generate(ModelKind::Vision, contents).await?;

        self.messenger
            .reply_text(reply_token, &reply)
            .await
            .map_err(DispatchError::Reply)?;

        info!(message_id = %image.id, "Replied to image message");
        Ok(())
    }
}
