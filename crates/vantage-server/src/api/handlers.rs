use axum::{
    extract::{Path, State},
    Json,
};
use std::time::Instant;

use vantage_core::{BidHoldings, VenueHoldings};

use super::dto::HealthResponse;
use crate::error::AppResult;
use crate::valuation::deployments::DeploymentResponse;
use crate::AppState;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn get_all_holdings(State(state): State<AppState>) -> Json<Vec<BidHoldings>> {
    let start = Instant::now();
    tracing::info!("Processing all-bids holdings request");

    let holdings = state.orchestrator.all_bids().await;

    tracing::info!(
        duration_ms = %start.elapsed().as_millis(),
        bid_count = holdings.len(),
        "All-bids holdings computed"
    );

    Json(holdings)
}

pub async fn get_bid_holdings(
    State(state): State<AppState>,
    Path(bid_id): Path<u32>,
) -> AppResult<Json<Vec<VenueHoldings>>> {
    let start = Instant::now();
    tracing::info!(bid_id = %bid_id, "Processing bid holdings request");

    let holdings = state.orchestrator.bid_holdings(bid_id).await?;

    tracing::info!(
        bid_id = %bid_id,
        duration_ms = %start.elapsed().as_millis(),
        venue_count = holdings.len(),
        "Bid holdings computed"
    );

    Ok(Json(holdings))
}

pub async fn get_all_deployments(State(state): State<AppState>) -> Json<Vec<DeploymentResponse>> {
    let start = Instant::now();
    tracing::info!("Processing all-deployments request");

    let deployments = state.orchestrator.all_deployments().await;

    tracing::info!(
        duration_ms = %start.elapsed().as_millis(),
        deployment_count = deployments.len(),
        "Deployment holdings computed"
    );

    Json(deployments)
}

pub async fn get_deployment(
    State(state): State<AppState>,
    Path(deployment_id): Path<u32>,
) -> AppResult<Json<DeploymentResponse>> {
    let start = Instant::now();
    tracing::info!(deployment_id = %deployment_id, "Processing deployment request");

    let deployment = state.orchestrator.deployment(deployment_id).await?;

    tracing::info!(
        deployment_id = %deployment_id,
        duration_ms = %start.elapsed().as_millis(),
        "Deployment holdings computed"
    );

    Ok(Json(deployment))
}
