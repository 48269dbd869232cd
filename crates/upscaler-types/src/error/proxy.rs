//! Proxy-flow errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal outcomes of a gateway request other than success.
///
/// None of these variants is ever produced after the quota decrement, so any
/// of them implies the caller's balance was not charged.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum ProxyError {
    /// No record exists for the supplied access code
    #[error("Invalid access code")]
    InvalidCode,

    /// The record exists but an operator switched it off
    #[error("Access code disabled")]
    CodeDisabled,

    /// `remaining <= 0`
    #[error("Quota exceeded")]
    QuotaExceeded,

    /// Missing provider or storage credential on the server
    #[error("Server configuration error: {message}")]
    ServerConfig { message: String },

    /// The provider returned no usable image
    #[error("Generation failed: {message}. Quota was not charged")]
    UpstreamGeneration { message: String },

    /// Response exceeds the transport ceiling and no offload path exists
    #[error("Image too large ({size_bytes} bytes > {limit_bytes} bytes) and offload storage is not configured. Please use '2K'")]
    PayloadTooLarge { size_bytes: usize, limit_bytes: usize },

    /// Image generated but the upload to object storage failed
    #[error("Image generated but failed to deliver ({message}). Quota was not charged")]
    Offload { message: String },

    /// Malformed request body
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Quota store unreachable or returned garbage
    #[error("Quota store error: {message}")]
    Store { message: String },

    #[error("Method Not Allowed")]
    MethodNotAllowed,
}

impl ProxyError {
    /// Get HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest { .. } => 400,
            Self::InvalidCode | Self::CodeDisabled => 401,
            Self::QuotaExceeded => 403,
            Self::MethodNotAllowed => 405,
            Self::PayloadTooLarge { .. } => 413,
            Self::ServerConfig { .. }
            | Self::UpstreamGeneration { .. }
            | Self::Offload { .. }
            | Self::Store { .. } => 500,
        }
    }

    /// Operator-facing failures that say nothing about the caller's request.
    pub fn is_server_fault(&self) -> bool {
        matches!(self, Self::ServerConfig { .. } | Self::Store { .. })
    }

    /// Failures that happened after the provider was already invoked.
    pub fn is_wasted_generation(&self) -> bool {
        matches!(
            self,
            Self::UpstreamGeneration { .. } | Self::PayloadTooLarge { .. } | Self::Offload { .. }
        )
    }
}
