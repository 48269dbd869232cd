use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use upscaler_core::build_gateway_router;
use upscaler_core::middleware::cors_layer;

pub fn build_router(state: AppState, max_body_bytes: usize, allowed_origins: &[String]) -> Router {
    let gateway_router = build_gateway_router(state.gateway());

    let public_routes = Router::<AppState>::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .route("/version", get(version_info));

    public_routes
        .with_state(state)
        .merge(gateway_router)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins))
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, axum::Json(serde_json::json!({"status": "ok"})))
}

async fn version_info(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({
            "version": option_env!("GIT_VERSION").unwrap_or("dev"),
            "build_time": option_env!("BUILD_TIME").unwrap_or("unknown"),
            "cargo_version": env!("CARGO_PKG_VERSION"),
            "quota_store": state.inner.store_kind,
            "uptime_secs": state.uptime_secs(),
        })),
    )
}
