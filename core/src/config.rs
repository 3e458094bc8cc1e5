use crate::errors::{GeminiError, GeminiResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Configuration struct for Gemini API
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub system_prompt: Option<String>,
    /// Model used for text replies
    pub model_name: Option<String>,
    /// Model used for image descriptions
    pub vision_model_name: Option<String>,
    /// API root, overridable for proxies and tests
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            system_prompt: None,
            model_name: Some(DEFAULT_MODEL.to_string()),
            vision_model_name: Some(DEFAULT_MODEL.to_string()),
            base_url: Some(DEFAULT_BASE_URL.to_string()),
            temperature: None,
        }
    }
}

impl GeminiConfig {
    /// Creates a configuration with the given key and default models
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            api_key: other.api_key.clone().or_else(|| self.api_key.clone()),
            system_prompt: other
                .system_prompt
                .clone()
                .or_else(|| self.system_prompt.clone()),
            model_name: other.model_name.clone().or_else(|| self.model_name.clone()),
            vision_model_name: other
                .vision_model_name
                .clone()
                .or_else(|| self.vision_model_name.clone()),
            base_url: other.base_url.clone().or_else(|| self.base_url.clone()),
            temperature: other.temperature.or(self.temperature),
        }
    }

    pub fn text_model(&self) -> &str {
        self.model_name.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn vision_model(&self) -> &str {
        self.vision_model_name.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// Rejects configurations the client cannot work with
    pub fn validate(&self) -> GeminiResult<()> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(()),
            _ => Err(GeminiError::ConfigError(
                "API key is required to initialize the Gemini client".to_string(),
            )),
        }
    }
}
