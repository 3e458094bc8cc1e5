//! Mock collaborators for dispatcher and endpoint tests.
//!
//! Every mock records its calls so tests can assert how often each external
//! service was reached and with what.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use gemini_core::errors::{GeminiError, GeminiResult};
use gemini_core::types::Content;
use gemini_linebot::{DispatchSettings, Dispatcher, Messenger, ModelKind, ReplyGenerator};
use gemini_memory::{
    ConversationTurn, InMemoryMemoryStore, MemoryKey, MemoryResult, MemoryScope, MemorySnapshot,
    MemoryStore, MemoryStoreError,
};
use line_messaging::errors::{LineError, LineResult};
use serde_json::{json, Value};

/// Generator answering every call with a fixed reply, or failing
#[derive(Debug, Default)]
pub struct MockGenerator {
    reply: Option<String>,
    calls: Mutex<Vec<(ModelKind, Vec<Content>)>>,
}

impl MockGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(ModelKind, Vec<Content>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ReplyGenerator for MockGenerator {
    async fn generate(&self, model: ModelKind, contents: Vec<Content>) -> GeminiResult<String> {
        self.calls.lock().unwrap().push((model, contents));
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => Err(GeminiError::HttpError {
                status_code: 503,
                message: "model unavailable".to_string(),
            }),
        }
    }
}

/// Messenger recording replies and serving fixed content
#[derive(Debug, Default)]
pub struct MockMessenger {
    content: Option<Bytes>,
    fail_replies: bool,
    replies: Mutex<Vec<(String, String)>>,
    fetches: Mutex<Vec<String>>,
}

impl MockMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(content: &'static [u8]) -> Self {
        Self {
            content: Some(Bytes::from_static(content)),
            ..Self::default()
        }
    }

    pub fn failing_replies() -> Self {
        Self {
            fail_replies: true,
            ..Self::default()
        }
    }

    pub fn replies(&self) -> Vec<(String, String)> {
        self.replies.lock().unwrap().clone()
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    async fn reply_text(&self, reply_token: &str, text: &str) -> LineResult<()> {
        self.replies
            .lock()
            .unwrap()
            .push((reply_token.to_string(), text.to_string()));
        if self.fail_replies {
            return Err(LineError::Api {
                status: 400,
                message: "Invalid reply token".to_string(),
            });
        }
        Ok(())
    }

    async fn fetch_content(&self, message_id: &str) -> LineResult<Bytes> {
        self.fetches.lock().unwrap().push(message_id.to_string());
        self.content.clone().ok_or(LineError::Api {
            status: 404,
            message: "Not found".to_string(),
        })
    }
}

/// In-memory store with switchable failures and call counters
#[derive(Debug, Default)]
pub struct MockMemoryStore {
    inner: InMemoryMemoryStore,
    /// Loads still to fail; `usize::MAX` fails every load
    load_failures: AtomicUsize,
    fail_save: bool,
    load_calls: AtomicUsize,
    save_calls: AtomicUsize,
}

impl MockMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_load() -> Self {
        Self::failing_first_loads(usize::MAX)
    }

    pub fn failing_first_loads(count: usize) -> Self {
        Self {
            load_failures: AtomicUsize::new(count),
            ..Self::default()
        }
    }

    pub fn failing_save() -> Self {
        Self {
            fail_save: true,
            ..Self::default()
        }
    }

    pub async fn seed(&self, key: &MemoryKey, turns: &[ConversationTurn]) {
        self.inner.save(key, turns, None).await.unwrap();
    }

    pub async fn turns(&self, key: &MemoryKey) -> Vec<ConversationTurn> {
        self.inner.load(key).await.unwrap().turns
    }

    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MemoryStore for MockMemoryStore {
    async fn load(&self, key: &MemoryKey) -> MemoryResult<MemorySnapshot> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .load_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                0 => None,
                usize::MAX => Some(usize::MAX),
                left => Some(left - 1),
            })
            .is_ok();
        if failing {
            return Err(MemoryStoreError::Http {
                status: 401,
                message: "Permission denied".to_string(),
            });
        }
        self.inner.load(key).await
    }

    async fn save(
        &self,
        key: &MemoryKey,
        turns: &[ConversationTurn],
        expected_revision: Option<&str>,
    ) -> MemoryResult<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_save {
            return Err(MemoryStoreError::Storage("disk full".to_string()));
        }
        self.inner.save(key, turns, expected_revision).await
    }
}

/// Mocks wired into a dispatcher, kept around for assertions
pub struct Harness {
    pub generator: Arc<MockGenerator>,
    pub messenger: Arc<MockMessenger>,
    pub memory: Arc<MockMemoryStore>,
    pub dispatcher: Dispatcher,
}

impl Harness {
    pub fn new(generator: MockGenerator, messenger: MockMessenger, memory: MockMemoryStore) -> Self {
        Self::with_settings(generator, messenger, memory, DispatchSettings::default())
    }

    pub fn with_settings(
        generator: MockGenerator,
        messenger: MockMessenger,
        memory: MockMemoryStore,
        settings: DispatchSettings,
    ) -> Self {
        let generator = Arc::new(generator);
        let messenger = Arc::new(messenger);
        let memory = Arc::new(memory);
        let dispatcher = Dispatcher::new(generator.clone(), messenger.clone(), memory.clone(), settings);

        Self {
            generator,
            messenger,
            memory,
            dispatcher,
        }
    }

    /// A second harness over the same mocks
    pub fn from_shared(other: &Harness) -> Self {
        let dispatcher = Dispatcher::new(
            other.generator.clone(),
            other.messenger.clone(),
            other.memory.clone(),
            DispatchSettings::default(),
        );

        Self {
            generator: other.generator.clone(),
            messenger: other.messenger.clone(),
            memory: other.memory.clone(),
            dispatcher,
        }
    }
}

pub fn text_event(reply_token: &str, user_id: &str, text: &str) -> Value {
    json!({
        "type": "message",
        "replyToken": reply_token,
        "source": {"type": "user", "userId": user_id},
        "timestamp": 1700000000000u64,
        "mode": "active",
        "webhookEventId": format!("evt-{}", reply_token),
        "deliveryContext": {"isRedelivery": false},
        "message": {"type": "text", "id": format!("msg-{}", reply_token), "text": text}
    })
}

pub fn image_event(reply_token: &str, user_id: &str, message_id: &str) -> Value {
    json!({
        "type": "message",
        "replyToken": reply_token,
        "source": {"type": "user", "userId": user_id},
        "timestamp": 1700000000000u64,
        "message": {"type": "image", "id": message_id, "contentProvider": {"type": "line"}}
    })
}

pub fn video_event(reply_token: &str) -> Value {
    json!({
        "type": "message",
        "replyToken": reply_token,
        "source": {"type": "user", "userId": "Uvideo"},
        "message": {"type": "video", "id": "vid-1", "duration": 1000}
    })
}

pub fn follow_event() -> Value {
    json!({"type": "follow", "replyToken": "rt-follow", "source": {"type": "user", "userId": "Ufollow"}})
}

pub fn postback_event(data: &str) -> Value {
    json!({"type": "postback", "replyToken": "rt-postback", "postback": {"data": data}})
}

pub fn beacon_event(hwid: &str) -> Value {
    json!({"type": "beacon", "replyToken": "rt-beacon", "beacon": {"hwid": hwid, "type": "enter"}})
}

pub fn callback_body(events: Vec<Value>) -> Vec<u8> {
    serde_json::to_vec(&json!({"destination": "Ubot", "events": events})).unwrap()
}

pub fn sourceless_text_event(reply_token: &str, text: &str) -> Value {
    json!({
        "type": "message",
        "replyToken": reply_token,
        "timestamp": 1700000000000u64,
        "message": {"type": "text", "id": format!("msg-{}", reply_token), "text": text}
    })
}

pub fn root_key() -> MemoryKey {
    let settings = DispatchSettings::default();
    MemoryKey::resolve(&settings.memory_root, MemoryScope::Global, None)
}

pub fn unscoped_key() -> MemoryKey {
    let settings = DispatchSettings::default();
    MemoryKey::resolve(&settings.memory_root, settings.memory_scope, None)
}

pub fn user_key(user_id: &str) -> MemoryKey {
    let settings = DispatchSettings::default();
    MemoryKey::resolve(&settings.memory_root, settings.memory_scope, Some(user_id))
}
