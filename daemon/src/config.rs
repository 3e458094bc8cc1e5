use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;

use clap::Parser;
use gemini_core::config::{GeminiConfig, DEFAULT_MODEL};
use gemini_memory::key::{MemoryScope, DEFAULT_MEMORY_ROOT};
use gemini_memory::retention::{RetentionPolicy, DEFAULT_MAX_TURNS};
use line_messaging::client::{DEFAULT_API_BASE, DEFAULT_DATA_API_BASE};
use thiserror::Error;

use crate::dispatcher::DispatchSettings;
use crate::prompt::DEFAULT_IMAGE_PROMPT;

const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// How stored conversation history reaches the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryMode {
    /// History serialized into the text of a single prompt
    #[default]
    Prompt,
    /// History sent as multi-turn contents
    Structured,
}

impl FromStr for HistoryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prompt" => Ok(HistoryMode::Prompt),
            "structured" | "chat" => Ok(HistoryMode::Structured),
            other => Err(format!("unknown history mode: {}", other)),
        }
    }
}

impl fmt::Display for HistoryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryMode::Prompt => f.write_str("prompt"),
            HistoryMode::Structured => f.write_str("structured"),
        }
    }
}

/// Command line and environment settings
#[derive(Parser, Debug, Clone)]
#[command(
    name = "linebot-daemon",
    about = "LINE webhook daemon answering chats with Gemini",
    version
)]
pub struct Cli {
    /// Channel secret used to verify webhook signatures
    #[arg(long, env = "ChannelSecret", hide_env_values = true)]
    pub channel_secret: Option<String>,

    /// Channel access token for the Messaging API
    #[arg(long, env = "ChannelAccessToken", hide_env_values = true)]
    pub channel_access_token: Option<String>,

    /// Gemini API key
    #[arg(long, env = "GOOGLE_GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Gemini model for text replies
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Gemini model for image descriptions
    #[arg(long, env = "GEMINI_VISION_MODEL", default_value = DEFAULT_MODEL)]
    pub vision_model: String,

    /// Gemini API root
    #[arg(long, env = "GEMINI_API_BASE")]
    pub gemini_api_base: Option<String>,

    /// Optional system instruction sent with every generation
    #[arg(long, env = "SYSTEM_PROMPT")]
    pub system_prompt: Option<String>,

    /// Realtime Database URL; memory stays in process when unset
    #[arg(long, env = "FIREBASE_URL")]
    pub firebase_url: Option<String>,

    /// Service account key, as JSON content or a path to the key file
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS", hide_env_values = true)]
    pub firebase_credentials: Option<String>,

    /// Database path under which conversations are stored
    #[arg(long, env = "MEMORY_ROOT", default_value = DEFAULT_MEMORY_ROOT)]
    pub memory_root: String,

    /// `conversation` keeps one thread per chat, `global` a single shared thread
    #[arg(long, env = "MEMORY_SCOPE", default_value = "conversation")]
    pub memory_scope: MemoryScope,

    /// Turns kept per conversation (0 keeps everything)
    #[arg(long, env = "MEMORY_MAX_TURNS", default_value_t = DEFAULT_MAX_TURNS)]
    pub memory_max_turns: usize,

    /// Re-reads allowed when memory changes between read and write
    #[arg(long, env = "MEMORY_CONFLICT_RETRIES", default_value_t = 3)]
    pub memory_conflict_retries: usize,

    /// `prompt` folds history into the prompt text, `structured` sends it as turns
    #[arg(long, env = "HISTORY_MODE", default_value = "prompt")]
    pub history_mode: HistoryMode,

    /// Instruction sent along with images
    #[arg(long, env = "IMAGE_PROMPT", default_value = DEFAULT_IMAGE_PROMPT)]
    pub image_prompt: String,

    /// Messaging API root
    #[arg(long, env = "LINE_API_BASE", default_value = DEFAULT_API_BASE)]
    pub line_api_base: String,

    /// Messaging API content root
    #[arg(long, env = "LINE_DATA_API_BASE", default_value = DEFAULT_DATA_API_BASE)]
    pub line_data_api_base: String,

    /// HTTP listen address
    #[arg(long, env = "HTTP_ADDR")]
    pub http_addr: Option<SocketAddr>,

    /// Listen port on all interfaces, used when no address is given
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Validated daemon configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub channel_secret: String,
    pub channel_access_token: String,
    pub gemini: GeminiConfig,
    pub line_api_base: String,
    pub line_data_api_base: String,
    pub firebase_url: Option<String>,
    /// Service account key JSON content
    pub firebase_credentials: Option<String>,
    pub dispatch: DispatchSettings,
    pub http_addr: SocketAddr,
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

/// Accepts either inline JSON or a path to a key file.
fn resolve_credentials(value: Option<String>) -> Result<Option<String>, ConfigError> {
    let Some(value) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if value.starts_with('{') {
        return Ok(Some(value));
    }

    let path = Path::new(&value);
    std::fs::read_to_string(path).map(Some).map_err(|e| {
        ConfigError::Invalid(format!(
            "GOOGLE_APPLICATION_CREDENTIALS is neither JSON nor a readable file ({}): {}",
            path.display(),
            e
        ))
    })
}

impl Cli {
    /// Checks required settings and assembles the daemon configuration
    pub fn into_config(self) -> Result<BotConfig, ConfigError> {
        let channel_secret = required(self.channel_secret, "ChannelSecret")?;
        let channel_access_token = required(self.channel_access_token, "ChannelAccessToken")?;
        let gemini_api_key = required(self.gemini_api_key, "GOOGLE_GEMINI_API_KEY")?;

        let gemini = GeminiConfig::with_api_key(gemini_api_key).merge(&GeminiConfig {
            api_key: None,
            system_prompt: self.system_prompt,
            model_name: Some(self.model),
            vision_model_name: Some(self.vision_model),
            base_url: self.gemini_api_base,
            temperature: None,
        });

        let http_addr = match (self.http_addr, self.port) {
            (Some(addr), _) => addr,
            (None, Some(port)) => SocketAddr::from(([0, 0, 0, 0], port)),
            (None, None) => DEFAULT_HTTP_ADDR
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("default address: {}", e)))?,
        };

        let memory_root = self.memory_root.trim().trim_matches('/').to_string();
        if memory_root.is_empty() {
            return Err(ConfigError::Invalid("MEMORY_ROOT must not be empty".to_string()));
        }

        let dispatch = DispatchSettings {
            memory_root,
            memory_scope: self.memory_scope,
            retention: RetentionPolicy {
                max_turns: self.memory_max_turns,
            },
            max_conflict_retries: self.memory_conflict_retries,
            history_mode: self.history_mode,
            image_prompt: self.image_prompt,
        };

        Ok(BotConfig {
            channel_secret,
            channel_access_token,
            gemini,
            line_api_base: self.line_api_base,
            line_data_api_base: self.line_data_api_base,
            firebase_url: self.firebase_url.filter(|url| !url.trim().is_empty()),
            firebase_credentials: resolve_credentials(self.firebase_credentials)?,
            dispatch,
            http_addr,
        })
    }
}
