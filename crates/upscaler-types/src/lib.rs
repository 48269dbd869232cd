//! # Upscaler Types
//!
//! Core types, wire DTOs, and error definitions for the page upscaling gateway.
//!
//! - **`error`** - Typed error hierarchy for the proxy flow and configuration
//! - **`models`** - Domain models (access codes, quota, image shape, config)
//! - **`protocol`** - Gemini `generateContent` types and the gateway's HTTP DTOs
//!
//! ## Architecture Role
//!
//! `upscaler-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!                upscaler-types (this crate)
//!                        │
//!              ┌─────────┴─────────┐
//!              ▼                   ▼
//!        upscaler-core ◄──── upscaler-client
//!              │
//!              ▼
//!        upscaler-server
//! ```

pub mod error;
pub mod models;
pub mod protocol;

pub use error::{ConfigError, ProxyError};

pub use models::{
    AccessCodeRecord, AspectRatio, GatewayConfig, GeminiConfig, ImageSize, OffloadConfig, Quota,
    VerifiedQuota,
};
