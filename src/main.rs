use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stampcard::{
    build_router, reward::seed_catalog, AppConfig, AppState, InMemoryStore, PostgresStore,
    StampStore, ThreadRngDice,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stampcard=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting stamp card server");

    let config = AppConfig::from_env();

    // PostgreSQL when DATABASE_URL is set, otherwise an in-memory store
    let store: Arc<dyn StampStore> = match config.database_url.as_deref() {
        Some(url) => {
            let store = PostgresStore::connect(url, config.database_max_connections).await?;
            store.migrate().await?;
            info!("Connected to PostgreSQL");
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set, data will not survive a restart");
            Arc::new(InMemoryStore::new())
        }
    };

    if config.seed_catalog {
        seed_catalog(store.as_ref()).await?;
    }

    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(store, Arc::new(ThreadRngDice), config);
    let app = build_router(app_state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Server running on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
