//! Application State
//!
//! Holds the gateway and a description of the quota store behind it.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use upscaler_core::common::build_http_client;
use upscaler_core::{GenerationGateway, MemoryQuotaStore, QuotaStore, RedisQuotaStore};
use upscaler_types::models::GatewayConfig;
use upscaler_types::AccessCodeRecord;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub(crate) inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub gateway: Arc<GenerationGateway>,
    pub store_kind: &'static str,
    pub started_at: Instant,
}

impl AppState {
    /// Connect the configured store and build the gateway over it.
    pub async fn initialize(
        config: &GatewayConfig,
        redis_url: &str,
        memory_store: bool,
        seed_codes: &[(String, i64)],
    ) -> Result<Self> {
        let (store, store_kind): (Arc<dyn QuotaStore>, &'static str) = if memory_store {
            warn!("[Quota] Using in-memory store; access codes are lost on restart");
            let store = MemoryQuotaStore::with_records(
                seed_codes.iter().map(|(code, total)| (code.clone(), AccessCodeRecord::issue(*total))),
            );
            info!("[Quota] Seeded {} access code(s)", seed_codes.len());
            (Arc::new(store), "memory")
        } else {
            let redis = RedisQuotaStore::connect(redis_url)
                .await
                .context("connecting to the quota store (use --memory-store for local runs)")?;
            (Arc::new(redis), "redis")
        };

        let http = build_http_client(config.gemini.request_timeout_secs)
            .map_err(|e| anyhow::anyhow!(e))?;
        let gateway = GenerationGateway::from_config(config, store, http)
            .context("configuring offload storage")?;

        info!(
            "✅ Gateway ready (model: {}, inline ceiling: {} bytes, offload: {})",
            config.gemini.model,
            config.max_inline_payload_bytes,
            if config.offload.is_some() { "on" } else { "off" }
        );

        Ok(Self::new_with_components(Arc::new(gateway), store_kind))
    }

    pub fn new_with_components(gateway: Arc<GenerationGateway>, store_kind: &'static str) -> Self {
        Self { inner: Arc::new(AppStateInner { gateway, store_kind, started_at: Instant::now() }) }
    }

    pub fn gateway(&self) -> Arc<GenerationGateway> {
        self.inner.gateway.clone()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.inner.started_at.elapsed().as_secs()
    }
}
