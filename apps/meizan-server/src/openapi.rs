use axum::response::IntoResponse;
use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "meizan-server",
        description = "Chat-based mountain recommendations for Japan's 100 Famous Mountains"
    ),
    paths(
        crate::api::chat::chat_recommend,
        crate::api::meta::healthz,
        crate::api::meta::about
    ),
    components(schemas(
        crate::api::chat::ChatSuccess,
        crate::chat::ChatOk,
        crate::chat::RequestEcho,
        crate::chat::ChatMeta,
        crate::chat::validate::Suggestion
    ))
)]
pub struct ApiDoc;

pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
