// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::chart_service::ChartService;
use crate::application::filter_cache::FilterCache;
use crate::application::reading_store::{spawn_periodic_refresh, ReadingStore};
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::dynamo_source::DynamoScanSource;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{get_chart, health_check, refresh_readings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_app_config()?;

    // Create reading source (infrastructure layer)
    let source = Arc::new(DynamoScanSource::new(
        config.source.endpoint,
        config.source.table,
        config.source.api_token,
        config.source.page_limit,
        Duration::from_secs(config.source.timeout_secs),
    )?);

    // Populate the store before serving
    let store = Arc::new(ReadingStore::new(source));
    let initial = store.refresh().await?;
    tracing::info!("Initial load complete: {} readings", initial.len());

    if let Some(interval) = config.store.refresh_interval() {
        tracing::info!("Refreshing readings every {}s", interval.as_secs());
        spawn_periodic_refresh(store.clone(), interval);
    }

    // Create services (application layer)
    let chart_service = ChartService::new(store, Arc::new(FilterCache::new()));

    // Create application state
    let state = Arc::new(AppState { chart_service });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/chart", get(get_chart))
        .route("/refresh", post(refresh_readings))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.bind_addr.parse()?;
    tracing::info!("Starting water-tank-telemetry service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
