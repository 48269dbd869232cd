//! Google Gemini GenerateContent API types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{AspectRatio, ImageSize};

/// Finish reasons that mean the provider refused to produce output.
const POLICY_FINISH_REASONS: &[&str] =
    &["SAFETY", "IMAGE_SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "RECITATION", "SPII"];

/// Gemini content part.
///
/// `ImageRef` is not produced by the provider; the gateway substitutes it for
/// `InlineData` when a result is delivered through object storage.
///
/// Sibling keys such as `thought` or `thoughtSignature` ride along in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    InlineData {
        #[serde(rename = "inlineData", alias = "inline_data")]
        inline_data: InlineData,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    ImageRef {
        #[serde(rename = "imageUrl")]
        image_url: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
    Other(Value),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into(), extra: Map::new() }
    }

    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::InlineData {
            inline_data: InlineData { mime_type: mime_type.into(), data: data.into() },
            extra: Map::new(),
        }
    }

    pub fn image_ref(image_url: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::ImageRef { image_url: image_url.into(), mime_type: mime_type.into(), extra: Map::new() }
    }
}

/// Gemini inline data (base64 payload).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default = "default_mime_type", alias = "mime_type")]
    pub mime_type: String,
    pub data: String,
}

fn default_mime_type() -> String {
    "image/png".to_string()
}

/// Gemini content block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self { role: Some("user".to_string()), parts }
    }
}

/// `generationConfig.imageConfig`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub aspect_ratio: AspectRatio,
    pub image_size: ImageSize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub image_config: ImageConfig,
}

/// Body of `models/{model}:generateContent`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    pub generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    /// One user turn holding the instruction followed by the source image.
    pub fn image_edit(
        prompt: &str,
        mime_type: &str,
        image_base64: &str,
        image_config: ImageConfig,
        system_instruction: Option<&str>,
    ) -> Self {
        Self {
            contents: vec![Content::user(vec![
                Part::text(prompt),
                Part::inline(mime_type, image_base64),
            ])],
            system_instruction: system_instruction
                .map(|text| Content { role: None, parts: vec![Part::text(text)] }),
            generation_config: GenerationConfig {
                response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
                image_config,
            },
        }
    }
}

/// A single response candidate. Fields the gateway does not inspect are kept
/// verbatim so the candidate can be forwarded in provider shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Candidate {
    /// Index of the first part carrying inline image bytes.
    pub fn inline_image_index(&self) -> Option<usize> {
        self.content.as_ref()?.parts.iter().position(|part| {
            matches!(part, Part::InlineData { inline_data, .. } if !inline_data.data.is_empty())
        })
    }

    pub fn blocked_by_policy(&self) -> bool {
        self.finish_reason.as_deref().is_some_and(|r| POLICY_FINISH_REASONS.contains(&r))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

/// Response of `generateContent`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<Value>,
}

impl GenerateContentResponse {
    /// `(candidate, part)` position of the first inline image.
    pub fn first_inline_image(&self) -> Option<(usize, usize)> {
        self.candidates
            .iter()
            .enumerate()
            .find_map(|(ci, c)| c.inline_image_index().map(|pi| (ci, pi)))
    }

    /// Provider-side refusal reason, if any.
    pub fn block_reason(&self) -> Option<String> {
        if let Some(reason) = self.prompt_feedback.as_ref().and_then(|f| f.block_reason.clone()) {
            return Some(reason);
        }
        self.candidates
            .iter()
            .find(|c| c.blocked_by_policy())
            .and_then(|c| c.finish_reason.clone())
    }
}
