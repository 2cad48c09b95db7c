//! HTTP surface of the chat recommendation pipeline.

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use std::net::SocketAddr;
use utoipa::ToSchema;

use crate::access_log::client_ip;
use crate::chat::{self, ChatOk};
use crate::AppState;

#[derive(Serialize, ToSchema)]
pub struct ChatSuccess {
    pub success: bool,
    pub status: &'static str,
    #[serde(flatten)]
    pub body: ChatOk,
}

/// Conversational mountain recommendations.
#[utoipa::path(
    post,
    path = "/chat",
    tag = "Chat",
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Verified suggestions", body = ChatSuccess),
        (status = 400, description = "Malformed body or messages"),
        (status = 429, description = "Rate limited; Retry-After header in seconds"),
        (status = 500, description = "Configuration or data-access failure"),
        (status = 502, description = "Model call failed or produced invalid output")
    )
)]
pub async fn chat_recommend(
    State(state): State<AppState>,
    parts: Parts,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let peer = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|c| c.0);
    let ip = client_ip(&parts.headers, peer);
    let body = body.ok().map(|Json(v)| v);
    match chat::handle_chat(&state, &ip, body.as_ref()).await {
        Ok(ok) => Json(ChatSuccess {
            success: true,
            status: "ok",
            body: ok,
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}
