//! annotation-sync server entry point.
//!
//! Serves the void notification webhook and the annotation listing over
//! HTTP.

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use annotation_sync::api;
use annotation_sync::app_state::AppState;
use annotation_sync::config::{LogFormat, LrsBackend, SyncConfig};
use annotation_sync::lrs::{EventLog, InMemoryLrs, LrsClient, SnapshotStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = SyncConfig::from_env()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, backend = ?config.lrs_backend, "starting annotation-sync");

    // Build LRS adapters
    let (events, snapshots): (Arc<dyn EventLog>, Arc<dyn SnapshotStore>) =
        match config.lrs_backend {
            LrsBackend::Http => {
                let client = Arc::new(LrsClient::new(&config.lrs)?);
                tracing::info!(endpoint = %config.lrs.endpoint, "using remote lrs");
                (Arc::clone(&client) as Arc<dyn EventLog>, client as Arc<dyn SnapshotStore>)
            }
            LrsBackend::Memory => {
                let store = Arc::new(InMemoryLrs::new());
                tracing::warn!("using in-memory lrs, data is lost on restart");
                (Arc::clone(&store) as Arc<dyn EventLog>, store as Arc<dyn SnapshotStore>)
            }
        };

    // Build application state
    let app_state = AppState::new(&config, events, snapshots);

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
