use reqwest::Client;
use tracing::debug;

use crate::config::{GeminiConfig, DEFAULT_BASE_URL};
use crate::errors::{GeminiError, GeminiResult};
use crate::types::*;

/// Client for interacting with the Gemini API
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
    api_key: String,
}

impl GeminiClient {
    /// Create a new Gemini API client
    pub fn new(config: GeminiConfig) -> GeminiResult<Self> {
        config.validate()?;
        let api_key = config.api_key.clone().unwrap_or_default();

        Ok(Self {
            client: Client::new(),
            config,
            api_key,
        })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Get the generateContent URL for a model
    fn get_generate_url(&self, model: &str) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        format!("{}/v1beta/models/{}:generateContent", base, model)
    }

    /// Generate content using the Gemini API
    pub async fn generate_content(
        &self,
        model: &str,
        request: GenerateContentRequest,
    ) -> GeminiResult<GenerateContentResponse> {
        let url = self.get_generate_url(model);
        debug!(model, contents = request.contents.len(), "Sending generateContent request");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| GeminiError::RequestError(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.map_err(|e| {
                GeminiError::ResponseError(format!("Failed to read error response: {}", e))
            })?;

            return Err(GeminiError::HttpError {
                status_code: status.as_u16(),
                message: format!("API request failed: {}", error_body),
            });
        }

        let response_body = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| GeminiError::ParsingError(format!("Failed to parse response: {}", e)))?;

        Ok(response_body)
    }

    /// Builds a request around the given contents, applying the configured
    /// system prompt and temperature.
    pub fn build_request(&self, contents: Vec<Content>) -> GenerateContentRequest {
        let system_instruction = self.config.system_prompt.as_ref().map(|prompt| Content {
            parts: vec![Part::text(prompt.clone())],
            role: None,
        });

        let generation_config = self.config.temperature.map(|temperature| GenerationConfig {
            temperature: Some(temperature),
            ..GenerationConfig::default()
        });

        GenerateContentRequest {
            contents,
            system_instruction,
            generation_config,
        }
    }

    /// Generates a single completion and returns all of its text fragments joined.
    ///
    /// An answer without any text is an error rather than an empty string.
    pub async fn generate_text(&self, model: &str, contents: Vec<Content>) -> GeminiResult<String> {
        let request = self.build_request(contents);
        let response = self.generate_content(model, request).await?;
        let text = response.collect_text();

        if text.is_empty() {
            let reason = response
                .prompt_feedback
                .as_ref()
                .and_then(|feedback| feedback.block_reason.clone())
                .or_else(|| {
                    response
                        .candidates
                        .iter()
                        .find_map(|candidate| candidate.finish_reason.clone())
                })
                .unwrap_or_else(|| "no text in response".to_string());
            return Err(GeminiError::EmptyResponse(reason));
        }

        Ok(text)
    }
}
