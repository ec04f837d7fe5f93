use std::sync::Arc;

use dotenvy::dotenv;

use stockroom::{
    config::{Config, StorageBackend},
    create_router,
    database::{create_database_pool, run_migrations},
    store::{MemoryStore, PgStore, SharedStore},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    let config = Config::from_env()?;

    let store: SharedStore = match config.storage {
        StorageBackend::Postgres => {
            let url = config.database_url.as_deref().unwrap_or_default();
            let pool = create_database_pool(url).await?;
            run_migrations(&pool).await?;
            Arc::new(PgStore::new(pool))
        }
        StorageBackend::Memory => {
            log::warn!("using the in-memory store, data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    log::info!(
        "OUT movements without a balance row: {}",
        config.out_without_balance
    );

    let addr = format!("0.0.0.0:{}", config.port);
    let app = create_router(AppState::new(store, config));

    log::info!("stockroom listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
