// Gateway endpoint handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::debug;
use upscaler_types::protocol::{ErrorBody, ProxyRequest, VerifyCodeRequest};
use upscaler_types::ProxyError;

use crate::gateway::{GatewayRejection, GatewayReply, GenerationGateway};


impl IntoResponse for GatewayRejection {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.body())).into_response()
    }
}

/// Body extraction failures. An over-limit body keeps its 413, anything else is a 400.
fn bad_body(rejection: JsonRejection) -> Response {
    debug!("[Gateway] Rejected request body: {}", rejection.body_text());
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        let body = ErrorBody { error: rejection.body_text(), quota: None };
        return (StatusCode::PAYLOAD_TOO_LARGE, Json(body)).into_response();
    }
    GatewayRejection::new(ProxyError::InvalidRequest { message: rejection.body_text() })
        .into_response()
}

/// `POST /api/proxy`
pub async fn handle_proxy(
    State(gateway): State<Arc<GenerationGateway>>,
    body: Result<Json<ProxyRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };

    match gateway.handle(request).await {
        Ok(GatewayReply::Validated(status)) => (StatusCode::OK, Json(status)).into_response(),
        Ok(GatewayReply::Generated(payload)) => (StatusCode::OK, Json(payload)).into_response(),
        Err(rejection) => rejection.into_response(),
    }
}

/// `POST /api/verify-code`
pub async fn handle_verify_code(
    State(gateway): State<Arc<GenerationGateway>>,
    body: Result<Json<VerifyCodeRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_body(rejection),
    };

    match gateway.verify(request.access_code.as_deref()).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(rejection) => rejection.into_response(),
    }
}

/// Any method other than POST on a gateway endpoint.
pub async fn handle_method_not_allowed() -> Response {
    GatewayRejection::new(ProxyError::MethodNotAllowed).into_response()
}
