//! Shared request-handling state: cheap to clone, Arc'd innards.

use std::sync::Arc;

use crate::chat::openai::ModelClient;
use crate::config::Config;
use crate::mountains::{MountainStore, UnconfiguredStore};
use crate::rate_limit::{InMemoryRateLimiter, RateLimiter};

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<dyn MountainStore>,
    model: Option<Arc<dyn ModelClient>>,
    limiter: Arc<dyn RateLimiter>,
}

impl AppState {
    pub fn builder(config: Config) -> AppStateBuilder {
        AppStateBuilder {
            config,
            store: None,
            model: None,
            limiter: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &dyn MountainStore {
        self.store.as_ref()
    }

    /// `None` when the model credential is missing; the chat pipeline
    /// fails closed on it.
    pub fn model(&self) -> Option<Arc<dyn ModelClient>> {
        self.model.clone()
    }

    pub fn limiter(&self) -> &dyn RateLimiter {
        self.limiter.as_ref()
    }
}

pub struct AppStateBuilder {
    config: Config,
    store: Option<Arc<dyn MountainStore>>,
    model: Option<Arc<dyn ModelClient>>,
    limiter: Option<Arc<dyn RateLimiter>>,
}

impl AppStateBuilder {
    #[cfg(test)]
    pub fn for_tests() -> Self {
        AppState::builder(Config {
            bind: "127.0.0.1".into(),
            port: 0,
            openai_api_key: None,
            openai_model: "gpt-4o-mini".into(),
            supabase_url: None,
            supabase_service_role_key: None,
            dataset_file: None,
        })
    }

    pub fn with_store(mut self, store: Arc<dyn MountainStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_model(mut self, model: Arc<dyn ModelClient>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn build(self) -> AppState {
        AppState {
            config: Arc::new(self.config),
            store: self.store.unwrap_or_else(|| Arc::new(UnconfiguredStore)),
            model: self.model,
            limiter: self
                .limiter
                .unwrap_or_else(|| Arc::new(InMemoryRateLimiter::default())),
        }
    }
}
