//! Generation client: one image in, one enhanced image out.

mod data_url;
mod gemini;

pub use data_url::{split_data_url, SourceImage};
pub use gemini::GeminiImageClient;

use async_trait::async_trait;
use upscaler_types::protocol::{Candidate, GenerateContentResponse, ImageConfig, InlineData, Part};

use crate::error::GenerationError;

/// Everything the provider needs for one page.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Base64 payload without any data-URL prefix
    pub image_base64: String,
    pub mime_type: String,
    pub prompt: String,
    pub image_config: ImageConfig,
    pub system_instruction: Option<String>,
}

/// Provider response that is known to contain an inline image.
#[derive(Debug, Clone)]
pub struct GenerationOutput {
    candidates: Vec<Candidate>,
    image_at: (usize, usize),
}

impl GenerationOutput {
    /// Accept a provider response only if it carries an image.
    pub fn from_response(response: GenerateContentResponse) -> Result<Self, GenerationError> {
        if let Some(image_at) = response.first_inline_image() {
            return Ok(Self { candidates: response.candidates, image_at });
        }
        match response.block_reason() {
            Some(reason) => Err(GenerationError::Blocked { reason }),
            None => Err(GenerationError::NoCandidate),
        }
    }

    /// The generated image.
    pub fn image(&self) -> Option<&InlineData> {
        let (ci, pi) = self.image_at;
        match self.candidates.get(ci)?.content.as_ref()?.parts.get(pi)? {
            Part::InlineData { inline_data, .. } => Some(inline_data),
            _ => None,
        }
    }

    /// Provider-shaped candidates, ready to forward.
    pub fn into_candidates(self) -> Vec<Candidate> {
        self.candidates
    }
}

/// Upstream image model.
///
/// Implementations perform exactly one outbound call per `generate` and never
/// retry; they know nothing about quota.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest)
        -> Result<GenerationOutput, GenerationError>;
}
