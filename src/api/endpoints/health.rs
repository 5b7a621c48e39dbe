//! Health check endpoint.

use axum::extract::State;
use axum::Json;

use crate::api::types::{ApiContext, HealthResponse};

/// `GET /health`: liveness plus credential-manager readiness. Never
/// triggers a token refresh.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        credentials: ctx.processor.credentials().status(),
    })
}
