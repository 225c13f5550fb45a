use std::sync::Arc;

use crate::advice::orchestrator::Advisor;
use crate::catalog::CatalogRepository;
use crate::config::Config;
use crate::llm_client::CompletionGateway;
use crate::rate_limit::RateLimiter;
use crate::sessions::ConversationStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub advisor: Advisor,
    /// Same catalog the advisor reads; admin routes invalidate it.
    pub catalog: Arc<dyn CatalogRepository>,
    pub gateway: Arc<dyn CompletionGateway>,
    /// Same store the advisor writes to; the click route records here.
    pub store: Arc<dyn ConversationStore>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub config: Config,
}

impl AppState {
    pub fn new(
        config: Config,
        catalog: Arc<dyn CatalogRepository>,
        gateway: Arc<dyn CompletionGateway>,
        store: Arc<dyn ConversationStore>,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        let advisor = Advisor::new(catalog.clone(), gateway.clone(), store.clone());
        Self {
            advisor,
            catalog,
            gateway,
            store,
            rate_limiter,
            config,
        }
    }
}
