//! Large-payload offload.
//!
//! When a success payload would exceed the transport ceiling, the generated
//! image is uploaded to object storage and the response carries a
//! time-limited link instead of inline bytes.

mod s3;

pub use s3::S3Offloader;

use async_trait::async_trait;
use rand::Rng;

use crate::error::OffloadError;

/// Destination for oversized results.
#[async_trait]
pub trait PayloadOffloader: Send + Sync {
    /// Store `bytes` and return a retrieval URL.
    async fn offload(&self, bytes: Vec<u8>, mime_type: &str) -> Result<String, OffloadError>;
}

/// File extension for a generated image's mime type.
pub fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        _ => "png",
    }
}

/// Unique object name: `gen_<unix_ms>_<7 random chars>.<ext>`.
pub fn object_name(mime_type: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(7)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!(
        "gen_{}_{}.{}",
        chrono::Utc::now().timestamp_millis(),
        suffix,
        extension_for(mime_type)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("image/png"), "png");
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("image/webp"), "webp");
        assert_eq!(extension_for("application/octet-stream"), "png");
    }

    #[test]
    fn test_object_name_shape() {
        let name = object_name("image/png");
        assert!(name.starts_with("gen_"));
        assert!(name.ends_with(".png"));

        let parts: Vec<&str> = name.trim_end_matches(".png").split('_').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 7);
    }

    #[test]
    fn test_object_names_are_unique() {
        assert_ne!(object_name("image/png"), object_name("image/png"));
    }
}
