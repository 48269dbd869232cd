//! Gemini `generateContent` image client.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};
use upscaler_types::models::GeminiConfig;
use upscaler_types::protocol::{GenerateContentRequest, GenerateContentResponse};

use super::{GenerationOutput, GenerationRequest, ImageGenerator};
use crate::error::GenerationError;

const API_KEY_HEADER: &str = "x-goog-api-key";
const MAX_ERROR_MESSAGE_CHARS: usize = 300;

pub(crate) fn build_url(base_url: &str, model: &str) -> String {
    format!("{}/v1beta/models/{}:generateContent", base_url.trim_end_matches('/'), model)
}

/// Pull `error.message` out of a Google error body, else a truncated body.
pub(crate) fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.chars().take(MAX_ERROR_MESSAGE_CHARS).collect())
}

/// Client for one model with one API key.
#[derive(Clone)]
pub struct GeminiImageClient {
    http: Client,
    url: String,
    api_key: String,
}

impl GeminiImageClient {
    pub fn new(http: Client, base_url: &str, model: &str, api_key: impl Into<String>) -> Self {
        Self { http, url: build_url(base_url, model), api_key: api_key.into() }
    }

    /// `None` when no server-side key is configured.
    pub fn from_config(http: Client, config: &GeminiConfig) -> Option<Self> {
        let api_key = config.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())?;
        Some(Self::new(http, &config.base_url, &config.model, api_key))
    }
}

#[async_trait]
impl ImageGenerator for GeminiImageClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, GenerationError> {
        let body = GenerateContentRequest::image_edit(
            &request.prompt,
            &request.mime_type,
            &request.image_base64,
            request.image_config,
            request.system_instruction.as_deref(),
        );

        info!(
            "[Gemini] generateContent ({} {}, {} KiB input)",
            request.image_config.image_size,
            request.image_config.aspect_ratio,
            request.image_base64.len() / 1024
        );

        let response =
            self.http.post(&self.url).header(API_KEY_HEADER, &self.api_key).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = extract_error_message(&text);
            warn!("[Gemini] Upstream {}: {}", status.as_u16(), message);
            return Err(GenerationError::Upstream { status: status.as_u16(), message });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        debug!("[Gemini] {} candidate(s) returned", parsed.candidates.len());
        GenerationOutput::from_response(parsed)
    }
}
