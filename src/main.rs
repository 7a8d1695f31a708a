use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use film_recommender::{
    api::{create_router, AppState},
    config::Config,
    db::{create_pool, create_redis_client, Cache},
    services::{
        providers::{CatalogProvider, InMemoryCatalog, PgCatalogProvider},
        EngineSettings, ModelCache, RecommendationEngine,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let provider: Arc<dyn CatalogProvider> = match &config.catalog_fixture {
        Some(path) => {
            tracing::info!(fixture = %path, "Using in-memory catalog");
            Arc::new(InMemoryCatalog::from_json_file(path)?)
        }
        None => {
            let pool = create_pool(
                &config.database_url,
                config.db_max_connections,
                config.provider_timeout(),
            )
            .await
            .context("Failed to connect to PostgreSQL")?;
            tracing::info!(max_connections = config.db_max_connections, "Connected to PostgreSQL");
            Arc::new(PgCatalogProvider::new(pool))
        }
    };

    let models = Arc::new(ModelCache::new(
        provider.clone(),
        config.provider_timeout(),
        config.model_max_age(),
    ));
    let settings = EngineSettings {
        limit: config.recommendation_limit,
        provider_timeout: config.provider_timeout(),
    };
    let engine = Arc::new(RecommendationEngine::new(provider, models.clone(), settings));

    // Warm the vector model so the first semantic request does not pay for the fit
    tokio::spawn(async move {
        if let Err(e) = models.ensure_built().await {
            tracing::warn!(error = %e, "Initial vector model build failed");
        }
    });

    let mut state = AppState::new(engine);
    let mut cache_writer = None;
    if let Some(redis_url) = &config.redis_url {
        let client = create_redis_client(redis_url)?;
        let (cache, handle) = Cache::new(client).await;
        state = state.with_cache(cache, config.response_cache_ttl_secs);
        cache_writer = Some(handle);
        tracing::info!(ttl_secs = config.response_cache_ttl_secs, "Response cache enabled");
    }

    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cache_writer {
        handle.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
