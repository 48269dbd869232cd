use axum::{routing::post, Router};
use std::sync::Arc;

use super::GenerationGateway;
use crate::handlers;

/// Routes served by the gateway. State is resolved here so the result merges
/// into any outer router.
pub fn build_gateway_router(gateway: Arc<GenerationGateway>) -> Router<()> {
    Router::new()
        .route(
            "/api/proxy",
            post(handlers::handle_proxy).fallback(handlers::handle_method_not_allowed),
        )
        .route(
            "/api/verify-code",
            post(handlers::handle_verify_code).fallback(handlers::handle_method_not_allowed),
        )
        .with_state(gateway)
}
