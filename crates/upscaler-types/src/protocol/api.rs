//! Gateway HTTP bodies (`/api/proxy`, `/api/verify-code`).

use serde::{Deserialize, Serialize};

use super::gemini::Candidate;
use crate::models::{Quota, VerifiedQuota};

/// `POST /api/proxy` request.
///
/// Shape labels stay strings here; the gateway parses them so an unknown label
/// becomes a 400 rather than a body-decoding failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    /// Base64 image, optionally `data:image/...;base64,` prefixed
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub access_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub validate_only: bool,
}

/// Successful generation: provider-shaped candidates plus the balance after charging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProxySuccess {
    pub candidates: Vec<Candidate>,
    pub quota: Quota,
}

/// `validateOnly` answer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationStatus {
    pub valid: bool,
    pub quota: Quota,
}

/// Error body shared by both endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota: Option<Quota>,
}

/// `POST /api/verify-code` request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeRequest {
    #[serde(default)]
    pub access_code: Option<String>,
}

/// `POST /api/verify-code` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifyCodeResponse {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota: Option<VerifiedQuota>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
