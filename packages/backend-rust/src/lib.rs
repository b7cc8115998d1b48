pub mod cache;
pub mod config;
pub mod engine;
pub mod logging;
pub mod response;
pub mod routes;
pub mod sources;
pub mod state;
pub mod store;

use std::sync::Arc;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::cache::{FeedCacheStore, MemoryFeedCache, RedisFeedCache};
use crate::config::{Config, EngineConfig};
use crate::engine::FeedEngine;
use crate::sources::{CatalogSource, ContentSource, HttpSource};
use crate::state::{AppState, Backends};
use crate::store::{LearningStore, MemoryStore, PgStore};

pub async fn create_app() -> axum::Router {
    let config = Config::from_env();
    let (engine, backends) = build_engine(&config, EngineConfig::from_env()).await;
    build_router(AppState::new(Arc::new(engine), backends))
}

pub fn build_router(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Wire the configured backends. An unreachable database or Redis falls back
/// to the in-memory implementation so the service still starts.
pub async fn build_engine(config: &Config, engine_config: EngineConfig) -> (FeedEngine, Backends) {
    let mut backends = Backends::default();

    let store: Arc<dyn LearningStore> = match config.database_url.as_deref() {
        Some(url) => match connect_postgres(url).await {
            Ok(store) => {
                backends.store = "postgres";
                Arc::new(store)
            }
            Err(err) => {
                tracing::warn!(error = %err, "postgres unavailable, using in-memory store");
                Arc::new(MemoryStore::new())
            }
        },
        None => Arc::new(MemoryStore::new()),
    };

    let cache: Arc<dyn FeedCacheStore> = match config.redis_url.as_deref() {
        Some(url) => match RedisFeedCache::connect(url).await {
            Ok(cache) => {
                backends.cache = "redis";
                Arc::new(cache)
            }
            Err(err) => {
                tracing::warn!(error = %err, "redis unavailable, using in-memory feed cache");
                Arc::new(MemoryFeedCache::new())
            }
        },
        None => Arc::new(MemoryFeedCache::new()),
    };

    let mut sources: Vec<Arc<dyn ContentSource>> =
        vec![Arc::new(CatalogSource::new(Arc::clone(&store)))];
    for url in &config.feed_source_urls {
        sources.push(Arc::new(HttpSource::new(url, engine_config.composer.source_timeout)));
    }

    tracing::info!(
        store = backends.store,
        cache = backends.cache,
        sources = sources.len(),
        "feed engine initialized"
    );

    (FeedEngine::new(store, cache, sources, engine_config), backends)
}

async fn connect_postgres(url: &str) -> Result<PgStore, Box<dyn std::error::Error + Send + Sync>> {
    let store = PgStore::connect(url).await?;
    store.migrate().await?;
    Ok(store)
}
