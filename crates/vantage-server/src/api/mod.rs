pub mod dto;
pub mod handlers;

use axum::{routing::get, Router};

use crate::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Bid holdings
        .route("/holdings", get(handlers::get_all_holdings))
        .route("/holdings/{bid_id}", get(handlers::get_bid_holdings))
        // Standalone vault deployments
        .route("/deployments", get(handlers::get_all_deployments))
        .route("/deployments/{deployment_id}", get(handlers::get_deployment))
}
