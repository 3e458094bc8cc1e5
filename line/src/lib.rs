// LINE Messaging API support:
// - Webhook signature verification
// - Webhook event payloads
// - Reply and content API client

pub mod client;
pub mod errors;
pub mod signature;
pub mod webhook;

pub use client::{MessagingClient, SendMessage};
pub use errors::{LineError, LineResult, WebhookError};
pub use signature::{sign_body, verify_signature};
pub use webhook::{parse_request, CallbackRequest, Event, EventCommon, MessageContent, Source};
