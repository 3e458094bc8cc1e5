//! Webhook payloads delivered by the platform.
//!
//! Event and message kinds form closed enums; kinds this crate does not
//! model decode to `Other` instead of failing the whole batch.

use serde::Deserialize;
use tracing::debug;

use crate::errors::WebhookError;
use crate::signature::verify_signature;

/// Body of one webhook request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackRequest {
    /// Bot user id the events are addressed to
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub events: Vec<Event>,
}

/// A webhook event
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    Message(MessageEvent),
    Follow(FollowEvent),
    Unfollow(UnfollowEvent),
    Postback(PostbackEvent),
    Beacon(BeaconEvent),
    #[serde(other)]
    Other,
}

/// Fields shared by every event kind
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCommon {
    pub source: Option<Source>,
    #[serde(default)]
    pub timestamp: i64,
    pub mode: Option<String>,
    pub webhook_event_id: Option<String>,
    pub delivery_context: Option<DeliveryContext>,
}

impl EventCommon {
    pub fn is_redelivery(&self) -> bool {
        self.delivery_context
            .as_ref()
            .is_some_and(|context| context.is_redelivery)
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.source.as_ref().and_then(Source::conversation_id)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryContext {
    #[serde(default)]
    pub is_redelivery: bool,
}

/// Where an event came from
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Source {
    #[serde(rename_all = "camelCase")]
    User { user_id: Option<String> },
    #[serde(rename_all = "camelCase")]
    Group {
        group_id: String,
        user_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Room {
        room_id: String,
        user_id: Option<String>,
    },
}

impl Source {
    /// Identifier of the chat the event belongs to: the group or room for
    /// multi-person chats, the user otherwise.
    pub fn conversation_id(&self) -> Option<&str> {
        match self {
            Source::User { user_id } => user_id.as_deref(),
            Source::Group { group_id, .. } => Some(group_id),
            Source::Room { room_id, .. } => Some(room_id),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    #[serde(flatten)]
    pub common: EventCommon,
    pub reply_token: Option<String>,
    pub message: MessageContent,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowEvent {
    #[serde(flatten)]
    pub common: EventCommon,
    pub reply_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnfollowEvent {
    #[serde(flatten)]
    pub common: EventCommon,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostbackEvent {
    #[serde(flatten)]
    pub common: EventCommon,
    pub reply_token: Option<String>,
    pub postback: Postback,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postback {
    #[serde(default)]
    pub data: String,
    pub params: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeaconEvent {
    #[serde(flatten)]
    pub common: EventCommon,
    pub reply_token: Option<String>,
    pub beacon: Beacon,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Beacon {
    pub hwid: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub dm: Option<String>,
}

/// Message payload of a message event
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    Text(TextMessage),
    Image(ImageMessage),
    Video(VideoMessage),
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextMessage {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMessage {
    pub id: String,
    pub content_provider: Option<ContentProvider>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMessage {
    pub id: String,
    pub duration: Option<u64>,
    pub content_provider: Option<ContentProvider>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentProvider {
    #[serde(rename = "type")]
    pub kind: String,
    pub original_content_url: Option<String>,
}

impl Event {
    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Message(_) => "message",
            Event::Follow(_) => "follow",
            Event::Unfollow(_) => "unfollow",
            Event::Postback(_) => "postback",
            Event::Beacon(_) => "beacon",
            Event::Other => "other",
        }
    }

    pub fn common(&self) -> Option<&EventCommon> {
        match self {
            Event::Message(e) => Some(&e.common),
            Event::Follow(e) => Some(&e.common),
            Event::Unfollow(e) => Some(&e.common),
            Event::Postback(e) => Some(&e.common),
            Event::Beacon(e) => Some(&e.common),
            Event::Other => None,
        }
    }
}

impl MessageContent {
    pub fn kind(&self) -> &'static str {
        match self {
            MessageContent::Text(_) => "text",
            MessageContent::Image(_) => "image",
            MessageContent::Video(_) => "video",
            MessageContent::Other => "other",
        }
    }
}

/// Verifies the signature of a raw webhook body and decodes it.
///
/// A missing or mismatching signature is `InvalidSignature`; a body that is
/// not a webhook payload is `Parse`.
pub fn parse_request(
    channel_secret: &str,
    signature: Option<&str>,
    body: &[u8],
) -> Result<CallbackRequest, WebhookError> {
    let signature = signature.ok_or(WebhookError::InvalidSignature)?;
    if !verify_signature(channel_secret, body, signature) {
        return Err(WebhookError::InvalidSignature);
    }

    let request: CallbackRequest = serde_json::from_slice(body)?;
    debug!(
        destination = %request.destination,
        events = request.events.len(),
        "Parsed webhook request"
    );
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::sign_body;

    const SECRET: &str = "testsecret";

    const SAMPLE: &str = r#"{
        "destination": "Ubot",
        "events": [
            {
                "type": "message",
                "message": {"type": "text", "id": "m1", "text": "hello", "quoteToken": "q"},
                "webhookEventId": "01FZ74A0TDDPYRVKNK77XKC3ZR",
                "deliveryContext": {"isRedelivery": false},
                "timestamp": 1625665242211,
                "source": {"type": "user", "userId": "U80696558e1aa831"},
                "replyToken": "rt-text",
                "mode": "active"
            },
            {
                "type": "message",
                "message": {"type": "image", "id": "img123", "contentProvider": {"type": "line"}},
                "timestamp": 1625665242212,
                "source": {"type": "group", "groupId": "Ca56f94", "userId": "U1"},
                "replyToken": "rt-image",
                "mode": "active"
            },
            {
                "type": "message",
                "message": {"type": "video", "id": "vid1", "duration": 60000, "contentProvider": {"type": "line"}},
                "source": {"type": "room", "roomId": "Ra8dbf4"},
                "replyToken": "rt-video"
            },
            {
                "type": "message",
                "message": {"type": "sticker", "id": "s1", "packageId": "1", "stickerId": "1"},
                "source": {"type": "user", "userId": "U2"},
                "replyToken": "rt-sticker"
            },
            {"type": "follow", "replyToken": "rt-follow", "source": {"type": "user", "userId": "U3"}},
            {"type": "unfollow", "source": {"type": "user", "userId": "U3"}},
            {"type": "postback", "replyToken": "rt-pb", "postback": {"data": "action=buy&itemid=111"}},
            {"type": "beacon", "replyToken": "rt-beacon", "beacon": {"hwid": "d41d8cd98f", "type": "enter"}},
            {"type": "memberJoined", "joined": {"members": []}, "replyToken": "rt-joined"}
        ]
    }"#;

    #[test]
    fn test_parses_every_kind() {
        let body = SAMPLE.as_bytes();
        let request = parse_request(SECRET, Some(&sign_body(SECRET, body).unwrap()), body).unwrap();

        let kinds: Vec<&str> = request.events.iter().map(Event::kind).collect();
        assert_eq!(
            kinds,
            vec!["message", "message", "message", "message", "follow", "unfollow", "postback", "beacon", "other"]
        );

        match &request.events[0] {
            Event::Message(event) => {
                assert_eq!(event.reply_token.as_deref(), Some("rt-text"));
                assert_eq!(event.common.conversation_id(), Some("U80696558e1aa831"));
                assert!(!event.common.is_redelivery());
                match &event.message {
                    MessageContent::Text(text) => assert_eq!(text.text, "hello"),
                    other => panic!("unexpected message: {other:?}"),
                }
            }
            other => panic!("unexpected event: {other:?}"),
        }

        match &request.events[1] {
            Event::Message(event) => {
                assert_eq!(event.common.conversation_id(), Some("Ca56f94"));
                assert!(matches!(&event.message, MessageContent::Image(image) if image.id == "img123"));
            }
            other => panic!("unexpected event: {other:?}"),
        }

        match &request.events[3] {
            Event::Message(event) => assert_eq!(event.message.kind(), "other"),
            other => panic!("unexpected event: {other:?}"),
        }

        match &request.events[6] {
            Event::Postback(event) => assert_eq!(event.postback.data, "action=buy&itemid=111"),
            other => panic!("unexpected event: {other:?}"),
        }

        match &request.events[7] {
            Event::Beacon(event) => assert_eq!(event.beacon.hwid, "d41d8cd98f"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_empty_events_for_verification_ping() {
        let body = br#"{"destination":"Ubot","events":[]}"#;
        let request = parse_request(SECRET, Some(&sign_body(SECRET, body).unwrap()), body).unwrap();
        assert!(request.events.is_empty());
    }

    #[test]
    fn test_bad_signature() {
        let body = SAMPLE.as_bytes();
        let result = parse_request(SECRET, Some(&sign_body("other", body).unwrap()), body);
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));

        let result = parse_request(SECRET, None, body);
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn test_signed_garbage_is_parse_error() {
        let body = b"not json";
        let result = parse_request(SECRET, Some(&sign_body(SECRET, body).unwrap()), body);
        assert!(matches!(result, Err(WebhookError::Parse(_))));
    }
}
