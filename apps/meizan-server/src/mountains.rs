//! Read access to the mountain reference table.
//!
//! Production reads the managed Postgres through its REST gateway; a
//! static in-memory store backs local development (via
//! `MEIZAN_DATASET_FILE`) and tests.

use async_trait::async_trait;
use meizan_core::Mountain;
use thiserror::Error;

const SELECT_COLUMNS: &str = "id,name_en,name_ja,name_zh,region,prefecture,difficulty,elevation_m";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("mountain table request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mountain table returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("mountain dataset unreadable: {0}")]
    Dataset(String),
    #[error("no mountain data source configured (SUPABASE_URL or MEIZAN_DATASET_FILE)")]
    Unconfigured,
}

#[async_trait]
pub trait MountainStore: Send + Sync {
    /// Full table, ordered by id. The dataset is small (100 rows), so
    /// callers filter in memory.
    async fn list(&self) -> Result<Vec<Mountain>, StoreError>;
}

/// PostgREST-backed store (Supabase).
pub struct SupabaseStore {
    base_url: String,
    service_key: String,
}

impl SupabaseStore {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            service_key: service_key.into(),
        }
    }
}

#[async_trait]
impl MountainStore for SupabaseStore {
    async fn list(&self) -> Result<Vec<Mountain>, StoreError> {
        let url = format!("{}/rest/v1/mountains", self.base_url.trim_end_matches('/'));
        let resp = crate::http_client::client()
            .get(&url)
            .query(&[("select", SELECT_COLUMNS), ("order", "id.asc")])
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let rows = resp.json::<Vec<Mountain>>().await?;
        Ok(rows)
    }
}

/// In-memory store: dataset files and tests.
pub struct StaticStore(pub Vec<Mountain>);

impl StaticStore {
    pub fn from_json_file(path: &str) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Dataset(format!("{path}: {e}")))?;
        let mut rows: Vec<Mountain> = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Dataset(format!("{path}: {e}")))?;
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(Self(rows))
    }
}

#[async_trait]
impl MountainStore for StaticStore {
    async fn list(&self) -> Result<Vec<Mountain>, StoreError> {
        Ok(self.0.clone())
    }
}

/// Placeholder used when neither Supabase nor a dataset file is set;
/// every chat request then terminates as a data-access failure.
pub struct UnconfiguredStore;

#[async_trait]
impl MountainStore for UnconfiguredStore {
    async fn list(&self) -> Result<Vec<Mountain>, StoreError> {
        Err(StoreError::Unconfigured)
    }
}
