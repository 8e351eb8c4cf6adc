//! # Vantage Core
//!
//! Unified data models and types for Vantage - a valuation service for
//! on-chain DeFi positions across Cosmos-ecosystem chains.
//!
//! This crate provides the canonical holdings model every protocol
//! adapter normalizes into, plus the shared error taxonomy.

pub mod error;
pub mod models;

pub use error::*;
pub use models::*;
