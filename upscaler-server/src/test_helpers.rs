//! Test helpers for upscaler-server unit tests.

use std::sync::Arc;

use upscaler_core::{GenerationGateway, MemoryQuotaStore, QuotaStore};
use upscaler_types::models::GatewayConfig;
use upscaler_types::AccessCodeRecord;

use crate::state::AppState;

pub const TEST_CODE: &str = "TEST-0001";

/// In-memory `AppState` holding one fresh [`TEST_CODE`] with 5 generations
/// and no provider key.
pub fn test_app_state() -> AppState {
    let store: Arc<dyn QuotaStore> = Arc::new(MemoryQuotaStore::with_records([(
        TEST_CODE.to_string(),
        AccessCodeRecord::issue(5),
    )]));
    let gateway = GenerationGateway::new(&GatewayConfig::default(), store, None, None);
    AppState::new_with_components(Arc::new(gateway), "memory")
}
