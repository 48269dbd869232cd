//! Error types for the upscaler client.

use thiserror::Error;
use upscaler_core::GenerationError;
use upscaler_types::models::Quota;

/// Errors that can occur while upscaling a page.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Neither an API key nor an access code was supplied.
    #[error("No API key or access code configured")]
    NoCredentials,

    /// HTTP request failed.
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an invalid or unparseable response.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Gateway refused the request.
    #[error("Gateway rejected request ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Error message from the gateway.
        message: String,
        /// Balance reported with the rejection, if any.
        quota: Option<Quota>,
    },

    /// Direct call to the provider failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Source page could not be read or decoded.
    #[error("Cannot read page {name}: {message}")]
    Page { name: String, message: String },

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

impl ClientError {
    /// Quota carried by a gateway rejection.
    pub fn quota(&self) -> Option<Quota> {
        match self {
            Self::Rejected { quota, .. } => *quota,
            _ => None,
        }
    }
}

/// Local archive failures.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Archive I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive index is corrupt: {0}")]
    Index(#[from] serde_json::Error),
}

/// Export rendering failures.
#[derive(Error, Debug)]
pub enum ExportError {
    /// No page has a result to export.
    #[error("Nothing to export: no page has completed")]
    NothingToExport,

    #[error("Image could not be decoded or encoded: {0}")]
    Image(#[from] image::ImageError),

    #[error("PDF assembly failed: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("ZIP packaging failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Export I/O error: {0}")]
    Io(#[from] std::io::Error),
}
