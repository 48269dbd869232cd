//! Credential modes and the upscaling strategy behind each.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use upscaler_core::{GeminiImageClient, GenerationRequest, ImageGenerator};
use upscaler_types::models::{ImageSize, DEFAULT_IMAGE_MODEL, DEFAULT_PROMPT};
use upscaler_types::protocol::{
    Candidate, ErrorBody, ImageConfig, Part, ProxyRequest, ProxySuccess, VerifyCodeRequest,
    VerifyCodeResponse,
};

use crate::error::ClientError;
use crate::types::{ClientConfig, PageImage, UpscaleOutcome, UpscaledImage};

/// Sent with every direct request.
pub const SYSTEM_INSTRUCTION: &str = "You are a professional image restoration expert.";

/// How the session is authorized. Resolved once per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// User's own Gemini key, calls go straight to the provider
    Direct { api_key: String },
    /// Metered access code, calls go through the gateway
    Proxied { access_code: String },
}

impl AuthMode {
    /// Pick the mode from whatever the user supplied. An access code wins
    /// over an API key.
    pub fn resolve(api_key: Option<String>, access_code: Option<String>) -> Result<Self, ClientError> {
        let non_blank = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        match (non_blank(access_code), non_blank(api_key)) {
            (Some(access_code), _) => Ok(Self::Proxied { access_code }),
            (None, Some(api_key)) => Ok(Self::Direct { api_key }),
            (None, None) => Err(ClientError::NoCredentials),
        }
    }

    /// Build the strategy for this mode.
    pub fn upscaler(&self, config: &ClientConfig) -> Result<Arc<dyn PageUpscaler>, ClientError> {
        let http = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        let upscaler: Arc<dyn PageUpscaler> = match self {
            Self::Direct { api_key } => Arc::new(DirectUpscaler::new(GeminiImageClient::new(
                http,
                &config.gemini_base_url,
                DEFAULT_IMAGE_MODEL,
                api_key.as_str(),
            ))),
            Self::Proxied { access_code } => {
                Arc::new(ProxiedUpscaler::new(http, &config.server_url, access_code))
            },
        };
        Ok(upscaler)
    }
}

/// One page in, one enhanced page out.
#[async_trait]
pub trait PageUpscaler: Send + Sync {
    async fn upscale(&self, page: &PageImage, size: ImageSize) -> Result<UpscaleOutcome, ClientError>;
}

/// Calls Gemini with the user's key.
pub struct DirectUpscaler {
    generator: GeminiImageClient,
}

impl DirectUpscaler {
    pub fn new(generator: GeminiImageClient) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl PageUpscaler for DirectUpscaler {
    async fn upscale(&self, page: &PageImage, size: ImageSize) -> Result<UpscaleOutcome, ClientError> {
        let request = GenerationRequest {
            image_base64: BASE64.encode(&page.bytes),
            mime_type: page.mime_type.clone(),
            prompt: DEFAULT_PROMPT.to_string(),
            image_config: ImageConfig { aspect_ratio: page.aspect_ratio(), image_size: size },
            system_instruction: Some(SYSTEM_INSTRUCTION.to_string()),
        };

        let output = self.generator.generate(&request).await?;
        let inline = output
            .image()
            .ok_or_else(|| ClientError::InvalidResponse("No image generated in response".to_string()))?;
        let bytes = BASE64
            .decode(inline.data.as_bytes())
            .map_err(|e| ClientError::InvalidResponse(format!("image is not base64: {e}")))?;

        Ok(UpscaleOutcome {
            image: UpscaledImage { bytes, mime_type: inline.mime_type.clone() },
            quota: None,
        })
    }
}

/// Calls the gateway with an access code.
pub struct ProxiedUpscaler {
    http: Client,
    server_url: String,
    access_code: String,
}

impl ProxiedUpscaler {
    pub fn new(http: Client, server_url: &str, access_code: &str) -> Self {
        Self {
            http,
            server_url: server_url.trim_end_matches('/').to_string(),
            access_code: access_code.to_string(),
        }
    }

    /// Ask the gateway whether this session's code is usable.
    pub async fn verify(&self) -> Result<VerifyCodeResponse, ClientError> {
        verify_access_code(&self.http, &self.server_url, &self.access_code).await
    }

    async fn fetch_image(&self, candidates: &[Candidate]) -> Result<UpscaledImage, ClientError> {
        let part = candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|content| content.parts.iter())
            .find(|p| matches!(p, Part::InlineData { .. } | Part::ImageRef { .. }));

        match part {
            Some(Part::InlineData { inline_data, .. }) => {
                let bytes = BASE64
                    .decode(inline_data.data.as_bytes())
                    .map_err(|e| ClientError::InvalidResponse(format!("image is not base64: {e}")))?;
                Ok(UpscaledImage { bytes, mime_type: inline_data.mime_type.clone() })
            },
            Some(Part::ImageRef { image_url, mime_type, .. }) => {
                debug!("Downloading offloaded result");
                let resp = self.http.get(image_url).send().await?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(ClientError::InvalidResponse(format!(
                        "offloaded image download failed: {status}"
                    )));
                }
                let bytes = resp.bytes().await?.to_vec();
                Ok(UpscaledImage { bytes, mime_type: mime_type.clone() })
            },
            _ => Err(ClientError::InvalidResponse("No image in proxy response".to_string())),
        }
    }
}

#[async_trait]
impl PageUpscaler for ProxiedUpscaler {
    async fn upscale(&self, page: &PageImage, size: ImageSize) -> Result<UpscaleOutcome, ClientError> {
        let body = ProxyRequest {
            image: BASE64.encode(&page.bytes),
            prompt: DEFAULT_PROMPT.to_string(),
            access_code: self.access_code.clone(),
            image_size: Some(size.to_string()),
            aspect_ratio: Some(page.aspect_ratio().to_string()),
            validate_only: false,
        };

        let resp = self.http.post(format!("{}/api/proxy", self.server_url)).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(rejection(resp).await);
        }

        let payload: ProxySuccess =
            resp.json().await.map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        let image = self.fetch_image(&payload.candidates).await?;
        info!("{} enhanced, {} of {} left", page.name, payload.quota.remaining, payload.quota.total);

        Ok(UpscaleOutcome { image, quota: Some(payload.quota) })
    }
}

/// `POST {server}/api/verify-code`. Never consumes quota.
pub async fn verify_access_code(
    http: &Client,
    server_url: &str,
    access_code: &str,
) -> Result<VerifyCodeResponse, ClientError> {
    let resp = http
        .post(format!("{}/api/verify-code", server_url.trim_end_matches('/')))
        .json(&VerifyCodeRequest { access_code: Some(access_code.to_string()) })
        .send()
        .await?;

    if !resp.status().is_success() {
        return Err(rejection(resp).await);
    }
    resp.json().await.map_err(|e| ClientError::InvalidResponse(e.to_string()))
}

async fn rejection(resp: reqwest::Response) -> ClientError {
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => ClientError::Rejected { status, message: body.error, quota: body.quota },
        Err(_) => ClientError::Rejected {
            status,
            message: if text.is_empty() { format!("Proxy Error: {status}") } else { text },
            quota: None,
        },
    }
}
