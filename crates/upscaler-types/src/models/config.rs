//! Gateway configuration.
//!
//! Every credential the proxy flow needs is carried here and injected into the
//! gateway at construction; handlers never read the process environment.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::ConfigError;

/// Default Gemini REST endpoint.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// Image-capable model used for page enhancement.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-3-pro-image-preview";
/// 4.4 MiB, under the 4.5 MB platform response limit.
pub const DEFAULT_MAX_INLINE_PAYLOAD_BYTES: usize = 4_613_734;
/// Instruction sent when the caller leaves `prompt` empty.
pub const DEFAULT_PROMPT: &str = "Redraw this page at high resolution. Keep the layout, text, \
     colors and every element exactly as they are; only sharpen edges, clean compression \
     artifacts and make small text crisp and legible.";

/// Top-level configuration for the proxy flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct GatewayConfig {
    /// Upstream image provider
    #[validate(nested)]
    pub gemini: GeminiConfig,
    /// Object storage used for oversized responses; `None` disables offload
    #[serde(default)]
    #[validate(nested)]
    pub offload: Option<OffloadConfig>,
    /// Serialized success payloads above this size are offloaded
    #[validate(range(min = 1024_usize))]
    #[serde(default = "default_max_inline_payload_bytes")]
    pub max_inline_payload_bytes: usize,
    /// Used when the request carries a blank prompt
    #[serde(default = "default_prompt")]
    pub default_prompt: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            offload: None,
            max_inline_payload_bytes: DEFAULT_MAX_INLINE_PAYLOAD_BYTES,
            default_prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

impl GatewayConfig {
    /// Run field validation and map the result into [`ConfigError`].
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate().map_err(|e| ConfigError::from_validation(&e))
    }
}

/// Gemini `generateContent` settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct GeminiConfig {
    /// Server-side provider key; requests fail with a config error when absent
    #[serde(default)]
    pub api_key: Option<String>,
    #[validate(url)]
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    #[validate(length(min = 1_u64))]
    #[serde(default = "default_image_model")]
    pub model: String,
    /// Request timeout in seconds
    #[validate(range(min = 5_u64, max = 3600_u64))]
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: DEFAULT_IMAGE_MODEL.to_string(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// S3-compatible bucket (Cloudflare R2 by default) for large results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct OffloadConfig {
    #[validate(length(min = 1_u64))]
    pub account_id: String,
    #[validate(length(min = 1_u64))]
    pub access_key_id: String,
    #[validate(length(min = 1_u64))]
    pub secret_access_key: String,
    #[validate(length(min = 1_u64))]
    pub bucket: String,
    /// Overrides the R2 endpoint derived from `account_id`
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Lifetime of the presigned retrieval URL
    #[validate(range(min = 60_u64, max = 604_800_u64))]
    #[serde(default = "default_url_ttl")]
    pub url_ttl_secs: u64,
}

impl OffloadConfig {
    /// Build from the four R2 settings; any missing value disables offload.
    pub fn from_parts(
        account_id: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        bucket: Option<String>,
    ) -> Option<Self> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Some(Self {
            account_id: non_empty(account_id)?,
            access_key_id: non_empty(access_key_id)?,
            secret_access_key: non_empty(secret_access_key)?,
            bucket: non_empty(bucket)?,
            endpoint: None,
            url_ttl_secs: default_url_ttl(),
        })
    }

    pub fn resolved_endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}.r2.cloudflarestorage.com", self.account_id))
    }
}

fn default_max_inline_payload_bytes() -> usize {
    DEFAULT_MAX_INLINE_PAYLOAD_BYTES
}

fn default_prompt() -> String {
    DEFAULT_PROMPT.to_string()
}

fn default_gemini_base_url() -> String {
    DEFAULT_GEMINI_BASE_URL.to_string()
}

fn default_image_model() -> String {
    DEFAULT_IMAGE_MODEL.to_string()
}

pub const fn default_request_timeout() -> u64 {
    120
}

const fn default_url_ttl() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(GatewayConfig::default().check().is_ok());
    }

    #[test]
    fn test_offload_requires_all_parts() {
        let missing = OffloadConfig::from_parts(
            Some("acct".to_string()),
            Some("key".to_string()),
            None,
            Some("bucket".to_string()),
        );
        assert!(missing.is_none());

        let blank = OffloadConfig::from_parts(
            Some("acct".to_string()),
            Some("key".to_string()),
            Some("   ".to_string()),
            Some("bucket".to_string()),
        );
        assert!(blank.is_none());

        let full = OffloadConfig::from_parts(
            Some("acct".to_string()),
            Some("key".to_string()),
            Some("secret".to_string()),
            Some("bucket".to_string()),
        )
        .expect("all parts present");
        assert_eq!(full.url_ttl_secs, 3600);
        assert_eq!(full.resolved_endpoint(), "https://acct.r2.cloudflarestorage.com");
    }

    #[test]
    fn test_tiny_payload_ceiling_rejected() {
        let config = GatewayConfig { max_inline_payload_bytes: 10, ..GatewayConfig::default() };
        let err = config.check().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: GatewayConfig =
            serde_json::from_str(r#"{"gemini": {"api_key": "k"}}"#).unwrap();
        assert_eq!(config.gemini.model, DEFAULT_IMAGE_MODEL);
        assert_eq!(config.max_inline_payload_bytes, DEFAULT_MAX_INLINE_PAYLOAD_BYTES);
        assert!(config.offload.is_none());
    }
}
