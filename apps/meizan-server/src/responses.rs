//! Response envelopes: success wrapper and the `ChatError` → HTTP
//! failure mapping.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::chat::ChatError;

pub fn json_ok(payload: serde_json::Value) -> Response {
    Json(payload).into_response()
}

fn failure(status: StatusCode, error: &str, details: Option<&str>) -> Response {
    let mut body = json!({"success": false, "error": error});
    if let Some(details) = details {
        body["details"] = json!(details);
    }
    (status, Json(body)).into_response()
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        match &self {
            ChatError::Config => {
                failure(StatusCode::INTERNAL_SERVER_ERROR, &self.to_string(), None)
            }
            ChatError::BadInput(msg) => failure(StatusCode::BAD_REQUEST, msg, None),
            ChatError::RateLimited { retry_after } => {
                let mut resp = failure(StatusCode::TOO_MANY_REQUESTS, &self.to_string(), None);
                let secs = retry_after.as_secs_f64().ceil().max(0.0) as u64;
                if let Ok(value) = secs.to_string().parse() {
                    resp.headers_mut().insert(header::RETRY_AFTER, value);
                }
                resp
            }
            ChatError::Data(source) => failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                &self.to_string(),
                Some(&source.to_string()),
            ),
            ChatError::UpstreamCall(source) => failure(
                StatusCode::BAD_GATEWAY,
                &self.to_string(),
                Some(&source.to_string()),
            ),
            ChatError::UpstreamOutput { raw } => {
                // Raw model text is surfaced for diagnosis.
                let body = json!({
                    "success": false,
                    "error": self.to_string(),
                    "model_raw": raw,
                });
                (StatusCode::BAD_GATEWAY, Json(body)).into_response()
            }
        }
    }
}
