//! Route registration. The builder records every endpoint it mounts so
//! `/about` can enumerate the surface without a second source of truth.

use axum::routing::{get, post, MethodRouter};
use axum::Router;
use once_cell::sync::OnceCell;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::{access_log, api, openapi, AppState};

static ENDPOINTS: OnceCell<Vec<String>> = OnceCell::new();

/// Endpoints mounted by the last-built router (stable per process).
pub fn endpoints() -> &'static [String] {
    ENDPOINTS.get().map(Vec::as_slice).unwrap_or(&[])
}

struct RouterBuilder {
    router: Router<AppState>,
    endpoints: Vec<String>,
}

impl RouterBuilder {
    fn new() -> Self {
        Self {
            router: Router::new(),
            endpoints: Vec::new(),
        }
    }

    fn route(mut self, method: &str, path: &'static str, mr: MethodRouter<AppState>) -> Self {
        self.endpoints.push(format!("{method} {path}"));
        self.router = self.router.route(path, mr);
        self
    }
}

pub fn build(state: AppState) -> Router {
    let builder = RouterBuilder::new()
        .route("GET", "/healthz", get(api::meta::healthz))
        .route("GET", "/about", get(api::meta::about))
        .route("GET", "/spec/openapi.json", get(openapi::openapi_json))
        .route("POST", "/chat", post(api::chat::chat_recommend));
    let _ = ENDPOINTS.set(builder.endpoints.clone());
    builder
        .router
        .layer(axum::middleware::from_fn(access_log::access_log_mw))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
