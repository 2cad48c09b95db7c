use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

mod access_log;
mod api;
mod app_state;
mod chat;
pub mod config;
mod http_client;
mod mountains;
mod openapi;
mod rate_limit;
mod responses;
mod router;

pub(crate) use app_state::AppState;

use chat::openai::OpenAiClient;
use mountains::{MountainStore, StaticStore, SupabaseStore, UnconfiguredStore};

fn build_store(cfg: &config::Config) -> anyhow::Result<Arc<dyn MountainStore>> {
    if let Some(path) = cfg.dataset_file.as_deref() {
        let store = StaticStore::from_json_file(path)?;
        info!(path, rows = store.0.len(), "mountain table loaded from dataset file");
        return Ok(Arc::new(store));
    }
    if let (Some(url), Some(key)) = (
        cfg.supabase_url.as_deref(),
        cfg.supabase_service_role_key.as_deref(),
    ) {
        info!(url, "mountain table served from Supabase REST");
        return Ok(Arc::new(SupabaseStore::new(url, key)));
    }
    warn!("no mountain data source configured; chat requests will fail with a data error");
    Ok(Arc::new(UnconfiguredStore))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    meizan_otel::init();
    let cfg = config::Config::from_env();

    let store = build_store(&cfg)?;
    let mut builder = AppState::builder(cfg.clone()).with_store(store);
    match cfg.openai_api_key.as_deref() {
        Some(key) => {
            builder =
                builder.with_model(Arc::new(OpenAiClient::new(key, cfg.openai_model.as_str())));
        }
        None => warn!("OPENAI_API_KEY unset; chat requests will fail closed"),
    }
    let state = builder.build();

    let app = router::build(state);
    let addr = cfg.addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "meizan-server listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
