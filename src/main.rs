use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use clicktrack::analytics;
use clicktrack::api::{self, AppState};
use clicktrack::config::{Config, StorageBackend};
use clicktrack::recorder::ClickRecorder;
use clicktrack::redirect;
use clicktrack::storage::{FileStorage, PostgresStorage, SqliteStorage, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    info!("Loaded configuration");

    let storage: Arc<dyn Storage> = match config.storage.backend {
        StorageBackend::File => {
            info!("Using file storage: {}", config.storage.data_file);
            Arc::new(FileStorage::new(&config.storage.data_file))
        }
        StorageBackend::Sqlite => {
            info!("Using SQLite storage: {}", config.storage.database_url);
            Arc::new(SqliteStorage::new(&config.storage.database_url, 5).await?)
        }
        StorageBackend::Postgres => {
            info!("Using PostgreSQL storage");
            Arc::new(PostgresStorage::new(&config.storage.database_url).await?)
        }
    };

    info!("Initializing storage...");
    storage.init().await?;
    info!("Storage initialized successfully");

    // Startup stats, matching what the snapshot currently holds.
    let snapshot = storage.snapshot().await?;
    let report = analytics::aggregate(&snapshot);
    info!(
        "Current stats: {} confirmed posts, {} pending, {} clicks, {} bot requests blocked",
        report.total_posts, report.pending_posts, report.total_clicks, report.bot_requests_blocked
    );

    let recorder = Arc::new(ClickRecorder::new(Arc::clone(&storage)));

    let state = Arc::new(AppState {
        storage: Arc::clone(&storage),
        recorder: Arc::clone(&recorder),
        config: config.clone(),
    });

    let app = redirect::create_redirect_router(recorder, config.destination_url.clone())
        .merge(api::create_api_router(state));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Click tracking listening on http://{}", addr);
    info!("Public URL: {}", config.public_url);
    info!("Redirects to: {}", config.destination_url);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
