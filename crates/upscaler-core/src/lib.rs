//! # Upscaler Core
//!
//! Quota-gated generation gateway.
//!
//! ```text
//! upscaler-core/src/
//! ├── quota/        # Access-code records in a key-value store (Redis / in-memory)
//! ├── generation/   # Gemini image client and data-URL handling
//! ├── offload/      # Object storage for responses over the transport ceiling
//! ├── gateway/      # Validate → generate → size check → offload → commit
//! ├── handlers/     # axum handlers for /api/proxy and /api/verify-code
//! ├── middleware/   # CORS
//! └── common/       # HTTP client builder, log masking
//! ```
//!
//! The gateway only ever charges an access code after the generated image is
//! known to be deliverable, and charges it through a single atomic store
//! operation.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod common;
pub mod error;
pub mod gateway;
pub mod generation;
pub mod handlers;
pub mod middleware;
pub mod offload;
pub mod quota;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use error::{GenerationError, OffloadError, StoreError};
pub use gateway::{build_gateway_router, GatewayRejection, GatewayReply, GenerationGateway};
pub use generation::{GeminiImageClient, GenerationOutput, GenerationRequest, ImageGenerator};
pub use offload::{PayloadOffloader, S3Offloader};
pub use quota::{MemoryQuotaStore, QuotaStore, RedisQuotaStore};
