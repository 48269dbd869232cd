//! Error types for the gateway's collaborators.
//!
//! Each collaborator reports its own failure type; the gateway decides how a
//! failure maps onto [`ProxyError`] because the mapping depends on where in
//! the flow it happened.

use thiserror::Error;
use upscaler_types::ProxyError;

/// Quota store failures.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    /// Redis command or connection failed.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A hash field that must be an integer is not.
    #[error("Corrupt record {key}: field '{field}' has value {value:?}")]
    CorruptRecord { key: String, field: String, value: String },

    /// Operation on a code that has no record.
    #[error("No record for {key}")]
    NotFound { key: String },
}

/// Image provider failures.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GenerationError {
    /// Network request failed (HTTP client).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Provider answered with a non-success status.
    #[error("Upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Content-policy rejection.
    #[error("Blocked by provider: {reason}")]
    Blocked { reason: String },

    /// Provider answered but produced no image.
    #[error("No candidates returned")]
    NoCandidate,
}

/// Object storage failures.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum OffloadError {
    /// Storage credentials are absent.
    #[error("Offload storage is not configured")]
    NotConfigured,

    /// Operator could not be built from the configuration.
    #[error("Storage setup failed: {0}")]
    Init(opendal::Error),

    #[error("Upload failed: {0}")]
    Upload(opendal::Error),

    #[error("Presigning failed: {0}")]
    Presign(opendal::Error),

    /// Generated payload was not valid base64.
    #[error("Invalid image payload: {0}")]
    Decode(#[from] base64::DecodeError),
}

impl From<StoreError> for ProxyError {
    fn from(e: StoreError) -> Self {
        ProxyError::Store { message: e.to_string() }
    }
}

impl From<GenerationError> for ProxyError {
    fn from(e: GenerationError) -> Self {
        ProxyError::UpstreamGeneration { message: e.to_string() }
    }
}
