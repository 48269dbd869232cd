//! Domain models shared by the gateway, its server, and its clients.

mod config;
mod image;
mod quota;

pub use config::{
    GatewayConfig, GeminiConfig, OffloadConfig, DEFAULT_GEMINI_BASE_URL, DEFAULT_IMAGE_MODEL,
    DEFAULT_MAX_INLINE_PAYLOAD_BYTES, DEFAULT_PROMPT,
};
pub use image::{AspectRatio, ImageSize, UnsupportedLabel};
pub use quota::{AccessCodeRecord, Quota, VerifiedQuota};
