mod api;
mod bids;
mod config;
mod error;
mod prices;
mod query;
mod registry;
mod valuation;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::prices::PriceResolver;
use crate::query::ChainClient;
use crate::registry::AssetRegistry;
use crate::valuation::Orchestrator;

pub use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub config: Arc<AppConfig>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with pretty format
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vantage=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .init();

    // Load configuration
    let config = AppConfig::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        registry = %config.registry.chain_url,
        price_feed = %config.prices.feed_url,
        "Starting Vantage"
    );
    if config.prices.chart_api_token.is_empty() {
        tracing::warn!("Chart feed API token is empty; historical chart prices will fail");
    }

    let timeout = Duration::from_secs(config.http.timeout_seconds);
    let chain = ChainClient::new(timeout);
    let registry = Arc::new(AssetRegistry::new(&config.registry, chain.clone()));
    let resolver = Arc::new(PriceResolver::new(
        &config.prices,
        timeout,
        Arc::clone(&registry),
    ));

    let orchestrator = Arc::new(Orchestrator::new(
        registry,
        resolver,
        chain,
        bids::bid_table(),
        bids::deployment_table(),
    ));

    // Create app state
    let state = AppState {
        orchestrator,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = Router::new()
        .merge(api::create_router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server_addr().parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
