//! Fakes for gateway tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use upscaler_types::models::GatewayConfig;
use upscaler_types::protocol::GenerateContentResponse;
use upscaler_types::AccessCodeRecord;

use crate::error::{GenerationError, OffloadError, StoreError};
use crate::gateway::GenerationGateway;
use crate::generation::{GenerationOutput, GenerationRequest, ImageGenerator};
use crate::offload::PayloadOffloader;
use crate::quota::{MemoryQuotaStore, QuotaStore};

pub const TEST_CODE: &str = "PAGE-1234";

/// Generator that returns fixed-size images or a fixed failure.
pub struct FakeGenerator {
    image_base64_len: usize,
    images: usize,
    text: String,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeGenerator {
    /// Succeeds with a base64 payload of `len` characters (multiple of 4).
    pub fn returning(len: usize) -> Self {
        Self {
            image_base64_len: len,
            images: 1,
            text: "Here is the page".to_string(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::returning(0) }
    }

    /// Number of inline image parts per response.
    pub fn with_images(self, images: usize) -> Self {
        Self { images, ..self }
    }

    /// Text part of `len` characters ahead of the images.
    pub fn with_text_len(self, len: usize) -> Self {
        Self { text: "t".repeat(len), ..self }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageGenerator for FakeGenerator {
    async fn generate(
        &self,
        _request: &GenerationRequest,
    ) -> Result<GenerationOutput, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(GenerationError::Upstream {
                status: 503,
                message: "model overloaded".to_string(),
            });
        }
        let mut parts = vec![serde_json::json!({"text": self.text})];
        parts.extend((0..self.images).map(|_| {
            serde_json::json!({"inlineData": {"mimeType": "image/png", "data": "A".repeat(self.image_base64_len)}})
        }));
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": parts},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        GenerationOutput::from_response(response)
    }
}

enum Outcome {
    Url(String),
    UploadFails,
    NotConfigured,
}

/// Offloader that records uploads.
pub struct FakeOffloader {
    outcome: Outcome,
    calls: AtomicUsize,
    uploaded_bytes: AtomicUsize,
}

impl FakeOffloader {
    fn with_outcome(outcome: Outcome) -> Self {
        Self { outcome, calls: AtomicUsize::new(0), uploaded_bytes: AtomicUsize::new(0) }
    }

    pub fn succeeding(url: &str) -> Self {
        Self::with_outcome(Outcome::Url(url.to_string()))
    }

    pub fn failing() -> Self {
        Self::with_outcome(Outcome::UploadFails)
    }

    /// Behaves as if no credentials were configured.
    pub fn unconfigured() -> Self {
        Self::with_outcome(Outcome::NotConfigured)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn uploaded_bytes(&self) -> usize {
        self.uploaded_bytes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PayloadOffloader for FakeOffloader {
    async fn offload(&self, bytes: Vec<u8>, _mime_type: &str) -> Result<String, OffloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.uploaded_bytes.fetch_add(bytes.len(), Ordering::SeqCst);
        match &self.outcome {
            Outcome::Url(url) => Ok(url.clone()),
            Outcome::NotConfigured => Err(OffloadError::NotConfigured),
            Outcome::UploadFails => Err(OffloadError::Upload(opendal::Error::new(
                opendal::ErrorKind::Unexpected,
                "bucket unreachable",
            ))),
        }
    }
}

/// Store that reads normally but loses its connection on every decrement.
pub struct BrokenDecrementStore {
    inner: MemoryQuotaStore,
}

impl BrokenDecrementStore {
    pub fn holding(record: AccessCodeRecord) -> Self {
        Self { inner: MemoryQuotaStore::with_records([(TEST_CODE.to_string(), record)]) }
    }

    pub fn snapshot(&self) -> Option<AccessCodeRecord> {
        self.inner.snapshot(TEST_CODE)
    }
}

#[async_trait]
impl QuotaStore for BrokenDecrementStore {
    async fn get_record(&self, code: &str) -> Result<Option<AccessCodeRecord>, StoreError> {
        self.inner.get_record(code).await
    }

    async fn decrement(&self, _code: &str) -> Result<i64, StoreError> {
        Err(StoreError::Redis(redis::RedisError::from((redis::ErrorKind::IoError, "connection reset"))))
    }

    async fn put_record(&self, code: &str, record: &AccessCodeRecord) -> Result<(), StoreError> {
        self.inner.put_record(code, record).await
    }

    async fn set_valid(&self, code: &str, valid: bool) -> Result<bool, StoreError> {
        self.inner.set_valid(code, valid).await
    }
}

/// Store holding a single [`TEST_CODE`] record.
pub fn store_with(total: i64, remaining: i64, valid: bool) -> Arc<MemoryQuotaStore> {
    Arc::new(MemoryQuotaStore::with_records([(
        TEST_CODE.to_string(),
        AccessCodeRecord { total, remaining, valid },
    )]))
}

/// Gateway over the given fakes with an inline ceiling of `max_inline` bytes.
pub fn gateway(
    store: Arc<MemoryQuotaStore>,
    generator: Option<Arc<FakeGenerator>>,
    offloader: Option<Arc<FakeOffloader>>,
    max_inline: usize,
) -> GenerationGateway {
    gateway_over(store, generator, offloader, max_inline)
}

/// Same as [`gateway`] over any store implementation.
pub fn gateway_over(
    store: Arc<dyn QuotaStore>,
    generator: Option<Arc<FakeGenerator>>,
    offloader: Option<Arc<FakeOffloader>>,
    max_inline: usize,
) -> GenerationGateway {
    let config = GatewayConfig { max_inline_payload_bytes: max_inline, ..GatewayConfig::default() };
    GenerationGateway::new(
        &config,
        store,
        generator.map(|g| g as Arc<dyn ImageGenerator>),
        offloader.map(|o| o as Arc<dyn PayloadOffloader>),
    )
}
