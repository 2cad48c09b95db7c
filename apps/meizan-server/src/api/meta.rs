use axum::extract::State;
use axum::response::IntoResponse;
use serde_json::json;

use crate::responses::json_ok;
use crate::{router, AppState};

/// Health probe.
#[utoipa::path(
    get,
    path = "/healthz",
    tag = "Meta",
    responses((status = 200, description = "Service healthy", body = serde_json::Value))
)]
pub async fn healthz() -> impl IntoResponse {
    json_ok(json!({"ok": true}))
}

/// Service identity and mounted endpoints.
#[utoipa::path(
    get,
    path = "/about",
    tag = "Meta",
    responses((status = 200, description = "Service metadata", body = serde_json::Value))
)]
pub async fn about(State(state): State<AppState>) -> impl IntoResponse {
    json_ok(json!({
        "service": "meizan-server",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.config().openai_model,
        "endpoints": router::endpoints(),
    }))
}
