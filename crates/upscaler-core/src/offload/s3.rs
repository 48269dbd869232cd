//! S3-compatible offload via OpenDAL (Cloudflare R2 by default).

use async_trait::async_trait;
use opendal::{services::S3, Operator};
use std::time::Duration;
use tracing::{error, info};
use upscaler_types::OffloadConfig;

use super::{object_name, PayloadOffloader};
use crate::error::OffloadError;

pub struct S3Offloader {
    operator: Operator,
    url_ttl: Duration,
}

impl S3Offloader {
    pub fn new(config: &OffloadConfig) -> Result<Self, OffloadError> {
        let builder = S3::default()
            .root("/")
            .bucket(&config.bucket)
            .endpoint(&config.resolved_endpoint())
            .region("auto")
            .access_key_id(&config.access_key_id)
            .secret_access_key(&config.secret_access_key);

        let operator = Operator::new(builder).map_err(OffloadError::Init)?.finish();
        info!("[Offload] Object storage ready (bucket: {})", config.bucket);

        Ok(Self { operator, url_ttl: Duration::from_secs(config.url_ttl_secs) })
    }
}

#[async_trait]
impl PayloadOffloader for S3Offloader {
    async fn offload(&self, bytes: Vec<u8>, mime_type: &str) -> Result<String, OffloadError> {
        let name = object_name(mime_type);
        let size = bytes.len();

        self.operator
            .write_with(&name, bytes)
            .content_type(mime_type)
            .await
            .map_err(|e| {
                error!("[Offload] Upload of {} failed: {}", name, e);
                OffloadError::Upload(e)
            })?;

        let presigned =
            self.operator.presign_read(&name, self.url_ttl).await.map_err(OffloadError::Presign)?;

        info!(
            "[Offload] Uploaded {} ({:.2} MB), link valid {}s",
            name,
            size as f64 / 1024.0 / 1024.0,
            self.url_ttl.as_secs()
        );
        Ok(presigned.uri().to_string())
    }
}
