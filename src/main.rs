use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use filmorate_api::{
    api::{create_router, AppState},
    config::Config,
    db::{create_pool, MemoryStorage, PgStorage},
    services::Catalog,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "filmorate_api=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // Pick the storage backend
    let catalog = match config.database_url.as_deref() {
        Some(database_url) => {
            let pool = create_pool(database_url, config.database_max_connections).await?;
            let storage = PgStorage::new(pool);
            storage.init_schema().await?;
            tracing::info!("Using PostgreSQL storage");
            Catalog::with_storage(Arc::new(storage))
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory storage");
            Catalog::with_storage(Arc::new(MemoryStorage::new()))
        }
    };

    let state = AppState::new(catalog, config.popular_films_default_count);
    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
