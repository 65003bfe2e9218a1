//! Cimiento API Server
//!
//! Main entry point for the scenario projection service.

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cimiento_api::{AppState, create_router};
use cimiento_core::projection::{ProjectionCache, ProjectionOptions};
use cimiento_db::connect_with_pool;
use cimiento_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cimiento=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load()?;

    // Connect to database
    let db = connect_with_pool(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;
    info!("Connected to database");

    // Projection cache and engine options
    let projection = &config.projection;
    let cache = ProjectionCache::with_config(projection.cache_capacity, projection.cache_ttl_secs);
    let options = ProjectionOptions {
        max_horizon_months: projection.max_horizon_months,
        discount_rate_override: None,
    };
    info!(
        cache_capacity = projection.cache_capacity,
        cache_ttl_secs = projection.cache_ttl_secs,
        max_horizon_months = projection.max_horizon_months,
        default_discount_rate = %projection.default_discount_rate,
        "Projection engine configured"
    );

    // Create application state
    let state = AppState::new(db, cache, options, projection.default_discount_rate);

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
