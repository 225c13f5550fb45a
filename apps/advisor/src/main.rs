mod advice;
mod catalog;
mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod rate_limit;
mod routes;
mod sessions;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::catalog::{CachedCatalog, PgCatalogSource};
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::OpenAiGateway;
use crate::rate_limit::RedisRateLimiter;
use crate::routes::build_router;
use crate::sessions::PgConversationStore;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing or out-of-range env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting advisor v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Catalog with TTL cache
    let catalog = Arc::new(CachedCatalog::new(
        PgCatalogSource::new(db.clone()),
        config.cache_ttl,
    ));
    info!("Catalog cache TTL: {}s", config.cache_ttl.as_secs());

    // Initialize Redis rate limiter
    let redis = redis::Client::open(config.redis_url.clone()).context("Invalid REDIS_URL")?;
    let rate_limiter = Arc::new(RedisRateLimiter::new(
        redis,
        config.rate_limit_max,
        config.rate_limit_window,
    ));
    info!(
        "Rate limit: {} requests per {}s",
        config.rate_limit_max,
        config.rate_limit_window.as_secs()
    );

    // Initialize generation gateway
    let gateway = OpenAiGateway::new(config.generation.clone())
        .context("Failed to build HTTP client")?;
    info!("Generation gateway initialized (model: {})", gateway.model());

    let state = AppState::new(
        config.clone(),
        catalog,
        Arc::new(gateway),
        Arc::new(PgConversationStore::new(db)),
        rate_limiter,
    );

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
