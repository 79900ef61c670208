use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use cinematch_api::{
    config::Config,
    db::{self, Cache, SessionStore},
    routes::{create_router, AppState},
    services::{
        deck::DeckBuilder,
        providers::{MovieProvider, TmdbProvider},
        scrape::ScraperChain,
        session::SessionService,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let db_pool = db::create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    let redis_client = db::create_redis_client(&config.redis_url)?;
    let (cache, _cache_writer) = Cache::new(redis_client).await;

    let provider: Arc<dyn MovieProvider> = Arc::new(TmdbProvider::new(
        cache,
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
    ));

    let store = SessionStore::new(db_pool);
    let decks = Arc::new(DeckBuilder::new(Arc::clone(&provider), ScraperChain::new()));
    let sessions = SessionService::new(
        store.clone(),
        decks,
        config.room_code_length,
        config.max_deck_size,
    );

    let state = AppState {
        sessions,
        store,
        provider,
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "cinematch-api listening");
    axum::serve(listener, app).await?;

    Ok(())
}
