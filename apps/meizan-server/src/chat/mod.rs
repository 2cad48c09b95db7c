//! The chat recommendation pipeline: request shape validation, rate
//! limiting, hint extraction, candidate selection, the model call, and
//! post-hoc output verification. Terminal at the first unrecoverable
//! failure; every terminal outcome (success included) emits exactly one
//! structured `chat_api` event with counts and timing, never raw
//! message text.

pub mod openai;
pub mod prompt;
pub mod validate;

use std::time::{Duration, Instant};

use meizan_core::{select, Locale, Preferences};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;

use crate::mountains::StoreError;
use crate::AppState;
use openai::ModelCallError;
use validate::Suggestion;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Server missing OPENAI_API_KEY")]
    Config,
    #[error("{0}")]
    BadInput(&'static str),
    #[error("Rate limit exceeded. Please try again shortly.")]
    RateLimited { retry_after: Duration },
    #[error("Failed to load candidates")]
    Data(#[source] StoreError),
    #[error("Model call failed")]
    UpstreamCall(#[source] ModelCallError),
    #[error("Invalid model output")]
    UpstreamOutput { raw: String },
}

/// Normalized echo of the accepted request, returned for client-side
/// debugging.
#[derive(Debug, Serialize, ToSchema)]
pub struct RequestEcho {
    #[schema(value_type = String)]
    pub locale: Locale,
    pub completed_ids_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub preferences: Option<Preferences>,
    pub messages_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatMeta {
    pub candidates_count: usize,
    /// Suggestions the model claimed but that failed id verification.
    pub dropped_suggestions: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatOk {
    pub request: RequestEcho,
    pub suggestions: Vec<Suggestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followups: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disclaimer: Option<String>,
    pub meta: ChatMeta,
}

struct LogContext<'a> {
    ip: &'a str,
    started: Instant,
    locale: Option<Locale>,
    completed: Option<usize>,
    candidates: Option<usize>,
    suggestions: Option<usize>,
}

impl LogContext<'_> {
    fn emit(&self, status: &str, error: Option<String>) {
        tracing::info!(
            target: "chat_api",
            status,
            ip = self.ip,
            locale = self.locale.map(|l| l.as_str()),
            completed_ids_length = self.completed,
            candidates_count = self.candidates,
            suggestions_count = self.suggestions,
            duration_ms = self.started.elapsed().as_millis() as u64,
            error = error.as_deref(),
        );
    }
}

fn status_label(err: &ChatError) -> &'static str {
    match err {
        ChatError::Config => "error:no_api_key",
        ChatError::BadInput(_) => "error:invalid_messages",
        ChatError::RateLimited { .. } => "error:rate_limited",
        ChatError::Data(_) => "error:candidates",
        ChatError::UpstreamCall(_) => "error:model_call",
        ChatError::UpstreamOutput { .. } => "error:invalid_model_output",
    }
}

fn error_summary(err: &ChatError) -> Option<String> {
    match err {
        ChatError::Data(source) => Some(source.to_string()),
        ChatError::UpstreamCall(source) => Some(source.to_string()),
        _ => None,
    }
}

/// Run the pipeline for one request. `body` is the parsed JSON body, or
/// `None` when the payload was not valid JSON.
pub async fn handle_chat(
    state: &AppState,
    client_ip: &str,
    body: Option<&Value>,
) -> Result<ChatOk, ChatError> {
    let mut log = LogContext {
        ip: client_ip,
        started: Instant::now(),
        locale: None,
        completed: None,
        candidates: None,
        suggestions: None,
    };
    let result = run(state, client_ip, body, &mut log).await;
    match &result {
        Ok(_) => log.emit("ok", None),
        Err(err) => log.emit(status_label(err), error_summary(err)),
    }
    result
}

async fn run(
    state: &AppState,
    client_ip: &str,
    body: Option<&Value>,
    log: &mut LogContext<'_>,
) -> Result<ChatOk, ChatError> {
    // Fail closed before touching anything else.
    let model = state.model().ok_or(ChatError::Config)?;

    let body = body.ok_or(ChatError::BadInput("Invalid request body"))?;
    let req = validate::validate_request(body).map_err(ChatError::BadInput)?;
    log.locale = Some(req.locale);
    log.completed = Some(req.completed_ids.len());

    let decision = state
        .limiter()
        .check(&format!("ip:{client_ip}"), Instant::now());
    if !decision.allowed {
        return Err(ChatError::RateLimited {
            retry_after: decision.reset_in,
        });
    }

    let rows = state.store().list().await.map_err(ChatError::Data)?;

    let seed = prompt::latest_user_text(&req.messages).to_string();
    let hints = meizan_heuristics::extract(&seed);
    let candidates = select::select_candidates(
        &rows,
        &req.completed_ids,
        req.preferences.as_ref(),
        select::DEFAULT_POOL_LIMIT,
        &seed,
        &hints,
    );
    log.candidates = Some(candidates.len());

    let messages = prompt::build_prompt(
        req.locale,
        &candidates,
        &req.messages,
        req.completed_ids.len(),
        &hints,
    );
    let raw = model
        .complete_json(&messages)
        .await
        .map_err(ChatError::UpstreamCall)?;

    let parsed =
        validate::parse_model_output(&raw).ok_or(ChatError::UpstreamOutput { raw })?;
    let (suggestions, dropped) = validate::resolve_suggestions(parsed.suggestions, &candidates);
    log.suggestions = Some(suggestions.len());

    Ok(ChatOk {
        request: RequestEcho {
            locale: req.locale,
            completed_ids_length: req.completed_ids.len(),
            preferences: req.preferences,
            messages_count: req.messages.len(),
        },
        suggestions,
        followups: parsed.followups,
        disclaimer: parsed.disclaimer,
        meta: ChatMeta {
            candidates_count: candidates.len(),
            dropped_suggestions: dropped,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::AppStateBuilder;
    use crate::mountains::StaticStore;
    use crate::rate_limit::{InMemoryRateLimiter, MAX_REQUESTS};
    use async_trait::async_trait;
    use meizan_core::Mountain;
    use openai::ModelClient;
    use prompt::PromptMessage;
    use serde_json::json;
    use std::sync::Arc;

    struct CannedModel(Result<String, &'static str>);

    #[async_trait]
    impl ModelClient for CannedModel {
        async fn complete_json(
            &self,
            _messages: &[PromptMessage],
        ) -> Result<String, ModelCallError> {
            match &self.0 {
                Ok(text) => Ok(text.clone()),
                Err(body) => Err(ModelCallError::Status {
                    status: 500,
                    body: body.to_string(),
                }),
            }
        }
    }

    fn dataset() -> Vec<Mountain> {
        vec![
            Mountain {
                id: "m01".into(),
                name_en: "Mount Mitake".into(),
                name_ja: "御岳山".into(),
                name_zh: "御岳山".into(),
                region: "関東".into(),
                prefecture: Some("東京都".into()),
                difficulty: Some("★".into()),
                elevation_m: Some(929),
            },
            Mountain {
                id: "m02".into(),
                name_en: "Mount Fuji".into(),
                name_ja: "富士山".into(),
                name_zh: "富士山".into(),
                region: "中部".into(),
                prefecture: Some("山梨県・静岡県".into()),
                difficulty: Some("★★★".into()),
                elevation_m: Some(3776),
            },
        ]
    }

    fn state_with_model(model: CannedModel) -> AppState {
        AppStateBuilder::for_tests()
            .with_store(Arc::new(StaticStore(dataset())))
            .with_model(Arc::new(model))
            .build()
    }

    fn request_body() -> Value {
        json!({
            "locale": "en",
            "messages": [{"role": "user", "content": "I want an easy winter hike near Tokyo"}]
        })
    }

    #[tokio::test]
    async fn success_verifies_and_remaps_suggestions() {
        let reply = json!({
            "suggestions": [
                {"mountain_id": "m01", "reason": "low and close"},
                {"mountain_id": "mount fuji", "reason": "name, remapped"},
                {"mountain_id": "m99", "reason": "fabricated"}
            ],
            "followups": ["Prefer a ropeway?"]
        })
        .to_string();
        let state = state_with_model(CannedModel(Ok(reply)));
        let ok = handle_chat(&state, "203.0.113.9", Some(&request_body()))
            .await
            .unwrap();
        // Winter near Tokyo: Fuji is over the elevation ceiling, so the
        // candidate pool is just m01 and the name remap has no target.
        assert_eq!(ok.meta.candidates_count, 1);
        assert_eq!(ok.suggestions.len(), 1);
        assert_eq!(ok.suggestions[0].mountain_id, "m01");
        assert_eq!(ok.meta.dropped_suggestions, 2);
        assert_eq!(ok.followups.unwrap().len(), 1);
        assert_eq!(ok.request.messages_count, 1);
    }

    #[tokio::test]
    async fn name_remap_survives_end_to_end() {
        let reply = json!({
            "suggestions": [{"mountain_id": "mount fuji", "reason": "classic"}]
        })
        .to_string();
        let state = state_with_model(CannedModel(Ok(reply)));
        let body = json!({
            "messages": [{"role": "user", "content": "something famous in 中部"}]
        });
        let ok = handle_chat(&state, "x", Some(&body)).await.unwrap();
        assert_eq!(ok.suggestions[0].mountain_id, "m02");
        assert_eq!(ok.meta.dropped_suggestions, 0);
    }

    #[tokio::test]
    async fn missing_credential_fails_closed() {
        let state = AppStateBuilder::for_tests()
            .with_store(Arc::new(StaticStore(dataset())))
            .build();
        let err = handle_chat(&state, "x", Some(&request_body()))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Config));
    }

    #[tokio::test]
    async fn non_json_body_is_client_error() {
        let state = state_with_model(CannedModel(Ok("{}".into())));
        let err = handle_chat(&state, "x", None).await.unwrap_err();
        assert!(matches!(err, ChatError::BadInput(_)));
    }

    #[tokio::test]
    async fn invalid_messages_are_client_error() {
        let state = state_with_model(CannedModel(Ok("{}".into())));
        let err = handle_chat(&state, "x", Some(&json!({"messages": []})))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::BadInput(_)));
    }

    #[tokio::test]
    async fn rate_limit_trips_with_retry_after() {
        let limiter = Arc::new(InMemoryRateLimiter::default());
        let state = AppStateBuilder::for_tests()
            .with_store(Arc::new(StaticStore(dataset())))
            .with_model(Arc::new(CannedModel(Ok("{}".into()))))
            .with_limiter(limiter)
            .build();
        for _ in 0..MAX_REQUESTS {
            handle_chat(&state, "8.8.8.8", Some(&request_body()))
                .await
                .unwrap();
        }
        let err = handle_chat(&state, "8.8.8.8", Some(&request_body()))
            .await
            .unwrap_err();
        match err {
            ChatError::RateLimited { retry_after } => {
                assert!(retry_after <= Duration::from_secs(60));
            }
            other => panic!("expected rate limit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn store_failure_is_data_error() {
        let state = AppStateBuilder::for_tests()
            .with_store(Arc::new(crate::mountains::UnconfiguredStore))
            .with_model(Arc::new(CannedModel(Ok("{}".into()))))
            .build();
        let err = handle_chat(&state, "x", Some(&request_body()))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Data(_)));
    }

    #[tokio::test]
    async fn model_call_failure_is_upstream_error() {
        let state = state_with_model(CannedModel(Err("boom")));
        let err = handle_chat(&state, "x", Some(&request_body()))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::UpstreamCall(_)));
    }

    #[tokio::test]
    async fn malformed_model_output_carries_raw_text() {
        let state = state_with_model(CannedModel(Ok("sorry, no JSON today".into())));
        let err = handle_chat(&state, "x", Some(&request_body()))
            .await
            .unwrap_err();
        match err {
            ChatError::UpstreamOutput { raw } => assert_eq!(raw, "sorry, no JSON today"),
            other => panic!("expected upstream output error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_suggestions_is_still_success() {
        let state = state_with_model(CannedModel(Ok(
            json!({"suggestions": [], "followups": ["Try another region?"]}).to_string(),
        )));
        let ok = handle_chat(&state, "x", Some(&request_body())).await.unwrap();
        assert!(ok.suggestions.is_empty());
        assert_eq!(ok.meta.dropped_suggestions, 0);
    }
}
