//! Proxy request handler.
//!
//! ```text
//! Validating ──► Generating ──► SizeCheck ──┬──────────────► Committing ──► Done
//!     │              │             │         └─► Offloading ──┘    │
//!     ▼              ▼             ▼                 ▼              ▼
//!  401/403        500 (config,   413 (no          500 (upload    500 (store)
//!                  upstream)      offload)          failed)
//! ```
//!
//! Offloading swaps every inline image for a link, then the payload is
//! measured again; one still over the ceiling is a 413.
//!
//! Every exit left of `Committing` leaves the store untouched. The decrement is
//! the last store operation on the success path.

mod router;


pub use router::build_gateway_router;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::io;
use std::sync::Arc;
use tracing::{error, info, warn};
use upscaler_types::models::{AspectRatio, GatewayConfig, ImageSize, Quota};
use upscaler_types::protocol::{
    ErrorBody, ImageConfig, Part, ProxyRequest, ProxySuccess, ValidationStatus,
    VerifyCodeResponse,
};
use upscaler_types::{AccessCodeRecord, ProxyError};

use crate::common::mask_code;
use crate::error::OffloadError;
use crate::generation::{split_data_url, GeminiImageClient, GenerationRequest, ImageGenerator};
use crate::offload::{PayloadOffloader, S3Offloader};
use crate::quota::QuotaStore;

/// Successful outcomes of [`GenerationGateway::handle`].
#[derive(Debug, Clone)]
pub enum GatewayReply {
    /// `validateOnly` short-circuit
    Validated(ValidationStatus),
    /// Image delivered and quota charged
    Generated(ProxySuccess),
}

/// A terminal failure plus the caller's unchanged balance when it is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayRejection {
    pub error: ProxyError,
    pub quota: Option<Quota>,
}

impl GatewayRejection {
    pub fn new(error: ProxyError) -> Self {
        Self { error, quota: None }
    }

    pub fn with_quota(error: ProxyError, quota: Quota) -> Self {
        Self { error, quota: Some(quota) }
    }

    pub fn status_code(&self) -> u16 {
        self.error.http_status_code()
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody { error: self.error.to_string(), quota: self.quota }
    }
}

impl From<ProxyError> for GatewayRejection {
    fn from(error: ProxyError) -> Self {
        Self::new(error)
    }
}

/// Orchestrates validation, generation, offload and the quota charge.
///
/// Holds no per-request state; one instance serves all requests.
pub struct GenerationGateway {
    store: Arc<dyn QuotaStore>,
    generator: Option<Arc<dyn ImageGenerator>>,
    offloader: Option<Arc<dyn PayloadOffloader>>,
    max_inline_payload_bytes: usize,
    default_prompt: String,
}

impl GenerationGateway {
    /// Assemble from explicit collaborators. A `None` generator means the
    /// provider credential is missing; a `None` offloader disables offload.
    pub fn new(
        config: &GatewayConfig,
        store: Arc<dyn QuotaStore>,
        generator: Option<Arc<dyn ImageGenerator>>,
        offloader: Option<Arc<dyn PayloadOffloader>>,
    ) -> Self {
        Self {
            store,
            generator,
            offloader,
            max_inline_payload_bytes: config.max_inline_payload_bytes,
            default_prompt: config.default_prompt.clone(),
        }
    }

    /// Build the Gemini client and S3 offloader described by `config`.
    pub fn from_config(
        config: &GatewayConfig,
        store: Arc<dyn QuotaStore>,
        http: reqwest::Client,
    ) -> Result<Self, OffloadError> {
        let generator = GeminiImageClient::from_config(http, &config.gemini)
            .map(|c| Arc::new(c) as Arc<dyn ImageGenerator>);
        if generator.is_none() {
            warn!("[Gateway] GEMINI_API_KEY is not set; generation requests will fail");
        }

        let offloader = match &config.offload {
            Some(offload) => Some(Arc::new(S3Offloader::new(offload)?) as Arc<dyn PayloadOffloader>),
            None => {
                info!("[Gateway] Offload storage not configured; oversized results get 413");
                None
            },
        };

        Ok(Self::new(config, store, generator, offloader))
    }

    pub fn max_inline_payload_bytes(&self) -> usize {
        self.max_inline_payload_bytes
    }

    /// Run one `/api/proxy` request through the state machine.
    pub async fn handle(&self, request: ProxyRequest) -> Result<GatewayReply, GatewayRejection> {
        // Validating
        let code = request.access_code.trim();
        let record = self.load_record(code).await?;
        let quota = record.quota();

        if !record.valid {
            info!("[Gateway] Disabled code {} rejected", mask_code(code));
            return Err(GatewayRejection::with_quota(ProxyError::CodeDisabled, quota));
        }
        if !record.has_quota() {
            info!("[Gateway] Code {} has no quota left", mask_code(code));
            return Err(GatewayRejection::with_quota(ProxyError::QuotaExceeded, quota));
        }
        if request.validate_only {
            return Ok(GatewayReply::Validated(ValidationStatus { valid: true, quota }));
        }

        // Generating
        let generator = self.generator.as_ref().ok_or_else(|| {
            error!("[Gateway] Generation requested but GEMINI_API_KEY is not configured");
            GatewayRejection::with_quota(
                ProxyError::ServerConfig { message: "GEMINI_API_KEY config missing".to_string() },
                quota,
            )
        })?;
        let generation =
            self.build_generation_request(&request).map_err(|e| GatewayRejection::with_quota(e, quota))?;

        let output = generator.generate(&generation).await.map_err(|e| {
            warn!("[Gateway] Generation failed for {}: {}", mask_code(code), e);
            GatewayRejection::with_quota(e.into(), quota)
        })?;
        let candidates = output.into_candidates();

        // SizeCheck (measured with the pre-charge quota)
        let mut payload = ProxySuccess { candidates, quota };
        let payload_size = self.measure(&payload).map_err(|e| GatewayRejection::with_quota(e, quota))?;

        // Offloading
        if payload_size > self.max_inline_payload_bytes {
            info!(
                "[Gateway] Payload too large ({:.2} MB), switching to offload",
                payload_size as f64 / 1024.0 / 1024.0
            );
            self.offload_images(&mut payload, payload_size)
                .await
                .map_err(|e| GatewayRejection::with_quota(e, quota))?;

            let remaining_size =
                self.measure(&payload).map_err(|e| GatewayRejection::with_quota(e, quota))?;
            if remaining_size > self.max_inline_payload_bytes {
                warn!("[Gateway] Payload still {} bytes after offload, returning 413", remaining_size);
                return Err(GatewayRejection::with_quota(self.too_large(remaining_size), quota));
            }
        }

        // Committing
        let remaining = self.store.decrement(code).await.map_err(|e| {
            error!("[Gateway] Quota decrement failed for {}: {}", mask_code(code), e);
            GatewayRejection::with_quota(e.into(), quota)
        })?;
        payload.quota = Quota::new(record.total, remaining);

        info!(
            "[Gateway] Delivered image for {} ({} left)",
            mask_code(code),
            payload.quota.remaining
        );
        Ok(GatewayReply::Generated(payload))
    }

    /// Answer `/api/verify-code`. Never mutates quota.
    pub async fn verify(&self, access_code: Option<&str>) -> Result<VerifyCodeResponse, GatewayRejection> {
        let code = access_code.map(str::trim).filter(|c| !c.is_empty()).ok_or_else(|| {
            GatewayRejection::new(ProxyError::InvalidRequest {
                message: "Access Code is required".to_string(),
            })
        })?;

        let record = self.store.get_record(code).await.map_err(|e| {
            error!("[Gateway] Verify lookup failed: {}", e);
            GatewayRejection::new(e.into())
        })?;

        let response = match record {
            None => VerifyCodeResponse {
                valid: false,
                quota: None,
                error: Some(ProxyError::InvalidCode.to_string()),
            },
            Some(record) if !record.valid => VerifyCodeResponse {
                valid: false,
                quota: None,
                error: Some(ProxyError::CodeDisabled.to_string()),
            },
            Some(record) if !record.has_quota() => VerifyCodeResponse {
                valid: false,
                quota: Some(record.verified_quota()),
                error: Some(ProxyError::QuotaExceeded.to_string()),
            },
            Some(record) => VerifyCodeResponse {
                valid: true,
                quota: Some(record.verified_quota()),
                error: None,
            },
        };
        Ok(response)
    }

    async fn load_record(&self, code: &str) -> Result<AccessCodeRecord, GatewayRejection> {
        if code.is_empty() {
            return Err(ProxyError::InvalidCode.into());
        }
        match self.store.get_record(code).await {
            Ok(Some(record)) => Ok(record),
            Ok(None) => {
                info!("[Gateway] Unknown access code {}", mask_code(code));
                Err(ProxyError::InvalidCode.into())
            },
            Err(e) => {
                error!("[Gateway] Quota lookup failed: {}", e);
                Err(GatewayRejection::new(e.into()))
            },
        }
    }

    fn build_generation_request(
        &self,
        request: &ProxyRequest,
    ) -> Result<GenerationRequest, ProxyError> {
        let invalid = |message: String| ProxyError::InvalidRequest { message };

        let aspect_ratio = match request.aspect_ratio.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(label) => label.parse::<AspectRatio>().map_err(|e| invalid(e.to_string()))?,
            None => AspectRatio::default(),
        };
        let image_size = match request.image_size.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(label) => label.parse::<ImageSize>().map_err(|e| invalid(e.to_string()))?,
            None => ImageSize::default(),
        };

        let source = split_data_url(&request.image);
        if source.base64.is_empty() {
            return Err(invalid("image is required".to_string()));
        }

        let prompt = if request.prompt.trim().is_empty() {
            self.default_prompt.clone()
        } else {
            request.prompt.clone()
        };

        Ok(GenerationRequest {
            image_base64: source.base64.to_string(),
            mime_type: source.mime_type,
            prompt,
            image_config: ImageConfig { aspect_ratio, image_size },
            system_instruction: None,
        })
    }

    fn too_large(&self, size_bytes: usize) -> ProxyError {
        ProxyError::PayloadTooLarge { size_bytes, limit_bytes: self.max_inline_payload_bytes }
    }

    fn measure(&self, payload: &ProxySuccess) -> Result<usize, ProxyError> {
        serialized_len(payload).map_err(|e| ProxyError::UpstreamGeneration {
            message: format!("unserializable response: {e}"),
        })
    }

    /// Swap every inline image for a storage link.
    async fn offload_images(
        &self,
        payload: &mut ProxySuccess,
        payload_size: usize,
    ) -> Result<(), ProxyError> {
        let Some(offloader) = self.offloader.as_ref() else {
            warn!("[Gateway] Offload storage missing, returning 413");
            return Err(self.too_large(payload_size));
        };

        let parts = payload
            .candidates
            .iter_mut()
            .filter_map(|c| c.content.as_mut())
            .flat_map(|content| content.parts.iter_mut());
        for part in parts {
            let Part::InlineData { inline_data, extra } = part else { continue };

            let mime_type = inline_data.mime_type.clone();
            let offloaded = match BASE64.decode(inline_data.data.as_bytes()) {
                Ok(bytes) => offloader.offload(bytes, &mime_type).await,
                Err(e) => Err(OffloadError::Decode(e)),
            };

            match offloaded {
                Ok(image_url) => {
                    let extra = std::mem::take(extra);
                    *part = Part::ImageRef { image_url, mime_type, extra };
                },
                Err(OffloadError::NotConfigured) => return Err(self.too_large(payload_size)),
                Err(e) => {
                    error!("[Gateway] Offload failed: {}", e);
                    return Err(ProxyError::Offload { message: e.to_string() });
                },
            }
        }
        Ok(())
    }
}

/// Byte length of the JSON encoding without materializing it.
fn serialized_len<T: serde::Serialize>(value: &T) -> Result<usize, serde_json::Error> {
    struct Counter(usize);

    impl io::Write for Counter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0 += buf.len();
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let mut counter = Counter(0);
    serde_json::to_writer(&mut counter, value)?;
    Ok(counter.0)
}
