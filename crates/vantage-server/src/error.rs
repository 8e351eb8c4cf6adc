use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use vantage_core::ValuationError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bid not found: {0}")]
    BidNotFound(u32),

    #[error("Deployment not found: {0}")]
    DeploymentNotFound(u32),

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Valuation error: {0}")]
    Valuation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<ValuationError> for AppError {
    fn from(err: ValuationError) -> Self {
        match err {
            ValuationError::BidNotFound(id) => AppError::BidNotFound(id),
            ValuationError::DeploymentNotFound(id) => AppError::DeploymentNotFound(id),
            ValuationError::Upstream(msg) => AppError::Upstream(msg),
            ValuationError::Malformed(field) => {
                AppError::Upstream(format!("malformed upstream response: {field}"))
            }
            other => AppError::Valuation(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::BidNotFound(id) => {
                tracing::info!(bid_id = %id, error_code = "BID_NOT_FOUND", "Bid not found");
                (StatusCode::NOT_FOUND, "BID_NOT_FOUND")
            }
            AppError::DeploymentNotFound(id) => {
                tracing::info!(deployment_id = %id, error_code = "DEPLOYMENT_NOT_FOUND", "Deployment not found");
                (StatusCode::NOT_FOUND, "DEPLOYMENT_NOT_FOUND")
            }
            AppError::InvalidParam(param) => {
                tracing::warn!(param = %param, error_code = "INVALID_PARAM", "Invalid parameter");
                (StatusCode::BAD_REQUEST, "INVALID_PARAM")
            }
            AppError::Upstream(msg) => {
                tracing::error!(message = %msg, error_code = "UPSTREAM_ERROR", "Upstream error");
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR")
            }
            AppError::Valuation(msg) => {
                tracing::error!(message = %msg, error_code = "VALUATION_ERROR", "Valuation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "VALUATION_ERROR")
            }
            AppError::Config(msg) => {
                tracing::error!(message = %msg, error_code = "CONFIG_ERROR", "Configuration error");
                (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR")
            }
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
