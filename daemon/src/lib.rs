//! Webhook daemon that answers LINE chat events with Gemini.
//!
//! Inbound webhook requests are verified and decoded by `line-messaging`,
//! dispatched event by event, and text/image messages are answered through
//! the generative model with conversation memory kept in `gemini-memory`.

pub mod config;
pub mod dispatcher;
pub mod http_server;
pub mod ports;
pub mod prompt;

pub use config::{BotConfig, Cli, ConfigError, HistoryMode};
pub use dispatcher::{DispatchError, DispatchReport, DispatchSettings, Dispatcher};
pub use http_server::{build_router, run_server, AppState};
pub use ports::{Messenger, ModelKind, ReplyGenerator};
