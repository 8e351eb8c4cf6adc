//! Error types for Vantage Core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValuationError {
    #[error("token info not found for {0}")]
    TokenNotFound(String),

    #[error("no price found for {0}")]
    PriceNotFound(String),

    #[error("no position found: {0}")]
    PositionNotFound(String),

    #[error("bid not found: {0}")]
    BidNotFound(u32),

    #[error("deployment not found: {0}")]
    DeploymentNotFound(u32),

    #[error("upstream request failed: {0}")]
    Upstream(String),

    #[error("malformed response: missing or invalid {0}")]
    Malformed(String),

    #[error("unsupported protocol: {0}")]
    Unsupported(String),

    #[error("reference asset price is zero or unresolved")]
    ReferencePriceUnavailable,
}

impl ValuationError {
    /// Missing-data errors are recoverable at composite layers (the
    /// offending asset gets dropped); everything else aborts the
    /// operation that hit it.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ValuationError::TokenNotFound(_)
                | ValuationError::PriceNotFound(_)
                | ValuationError::PositionNotFound(_)
        )
    }

    pub fn malformed(field: impl Into<String>) -> Self {
        ValuationError::Malformed(field.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        ValuationError::Upstream(msg.into())
    }
}

pub type ValuationResult<T> = Result<T, ValuationError>;
