//! Libris Server - Library Circulation System
//!
//! REST API server for book inventory, borrowing and late fees.

use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use libris_server::{
    api,
    config::{AppConfig, StorageBackend},
    repository::{memory::MemoryRepository, CirculationStore, Repository, SettingsStore},
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("libris_server={},tower_http=debug", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Libris Server v{}", env!("CARGO_PKG_VERSION"));

    let (store, settings_store): (Arc<dyn CirculationStore>, Arc<dyn SettingsStore>) =
        match config.storage.backend {
            StorageBackend::Postgres => {
                let pool = PgPoolOptions::new()
                    .max_connections(config.database.max_connections)
                    .min_connections(config.database.min_connections)
                    .connect(&config.database.url)
                    .await?;
                tracing::info!("Connected to database");

                sqlx::migrate!("./migrations").run(&pool).await?;
                tracing::info!("Database migrations completed");

                let repository = Arc::new(Repository::new(pool));
                (
                    repository.clone() as Arc<dyn CirculationStore>,
                    repository as Arc<dyn SettingsStore>,
                )
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage, data is lost on shutdown");
                let repository = Arc::new(MemoryRepository::new());
                (
                    repository.clone() as Arc<dyn CirculationStore>,
                    repository as Arc<dyn SettingsStore>,
                )
            }
        };

    let services = Services::new(store, settings_store, &config.circulation);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = api::router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
