use crate::api::MgmtState;
use crate::api::schemas::health::ReadinessResponse;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

pub async fn livez() -> impl IntoResponse {
    StatusCode::OK
}

/// 503 while the store is unreachable or an enabled push pipeline has lost its worker.
pub async fn readyz(State(state): State<MgmtState>) -> impl IntoResponse {
    let readiness = state.health_service.readiness().await;
    let status_code = if readiness.is_ready() { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(ReadinessResponse::from(readiness)))
}
