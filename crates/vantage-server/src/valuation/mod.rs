//! Valuation orchestration
//!
//! The orchestrator wires configuration to adapters: it resolves the
//! venue's chain catalog, runs the adapter's three operations, and
//! aggregates the results. Bid-level results are memoized under a TTL so
//! repeated requests inside the window issue no network calls at all.

pub mod deployments;
pub mod protocols;

use moka::future::Cache;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use vantage_core::{BidHoldings, Holdings, Protocol, ValuationError, ValuationResult, VenueHoldings};

use crate::bids::{protocol_endpoints, BidConfig};
use crate::prices::{PriceResolver, REFERENCE_PRICE_ID};
use crate::query::ChainClient;
use crate::registry::AssetRegistry;

use deployments::{DeploymentConfig, DeploymentResponse};
use protocols::{PositionAdapter, ValuationContext, VenueConfig};

const RESULT_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

pub struct Orchestrator {
    registry: Arc<AssetRegistry>,
    prices: Arc<PriceResolver>,
    chain: ChainClient,
    bids: BTreeMap<u32, BidConfig>,
    deployments: BTreeMap<u32, DeploymentConfig>,
    cache: Cache<u32, Vec<VenueHoldings>>,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<AssetRegistry>,
        prices: Arc<PriceResolver>,
        chain: ChainClient,
        bids: BTreeMap<u32, BidConfig>,
        deployments: BTreeMap<u32, DeploymentConfig>,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(64)
            .time_to_live(RESULT_CACHE_TTL)
            .build();

        Self {
            registry,
            prices,
            chain,
            bids,
            deployments,
            cache,
        }
    }

    /// Holdings for every venue of one bid, memoized under the TTL.
    /// A single venue's failure is recorded in its entry; the rest of
    /// the bid still computes.
    pub async fn bid_holdings(&self, bid_id: u32) -> ValuationResult<Vec<VenueHoldings>> {
        let bid = self
            .bids
            .get(&bid_id)
            .ok_or(ValuationError::BidNotFound(bid_id))?;

        if let Some(cached) = self.cache.get(&bid_id).await {
            tracing::debug!(bid_id = %bid_id, "Serving bid holdings from cache");
            return Ok(cached);
        }

        let mut holdings = Vec::with_capacity(bid.venues.len());
        for venue in &bid.venues {
            holdings.push(self.venue_holdings(venue).await);
        }

        self.cache.insert(bid_id, holdings.clone()).await;

        Ok(holdings)
    }

    /// One venue's holdings. Never fails: protocols without an adapter
    /// yield the missing placeholder, and computation errors are
    /// recorded in the entry.
    pub async fn venue_holdings(&self, venue: &VenueConfig) -> VenueHoldings {
        let protocol = venue.protocol();
        let adapter = PositionAdapter::from_venue(venue);

        if adapter.is_missing() {
            return VenueHoldings::missing(protocol);
        }

        match self.compute_venue(&adapter, protocol).await {
            Ok(holdings) => holdings,
            Err(e) => {
                tracing::warn!(protocol = %protocol, error = %e, "Venue valuation failed");
                VenueHoldings::failed(protocol, &e)
            }
        }
    }

    async fn compute_venue(
        &self,
        adapter: &PositionAdapter,
        protocol: Protocol,
    ) -> ValuationResult<VenueHoldings> {
        let endpoints = protocol_endpoints(protocol);
        let catalog = self.registry.catalog(endpoints.chain).await?;

        let ctx = ValuationContext {
            chain: &self.chain,
            prices: &self.prices,
            catalog: &catalog,
            lcd: endpoints.lcd,
        };

        let venue_total = adapter.venue_tvl(&ctx).await?;
        let address_principal = adapter.address_principal(&ctx).await?;
        let address_rewards = adapter.address_rewards(&ctx).await?;

        Ok(VenueHoldings::complete(
            protocol,
            venue_total,
            address_principal,
            address_rewards,
        ))
    }

    /// Holdings across every bid; a failed bid becomes an entry with no
    /// holdings instead of aborting the list.
    pub async fn all_bids(&self) -> Vec<BidHoldings> {
        let mut all = Vec::with_capacity(self.bids.len());

        for (bid_id, bid) in &self.bids {
            let holdings = match self.bid_holdings(*bid_id).await {
                Ok(h) => Some(h),
                Err(e) => {
                    tracing::warn!(bid_id = %bid_id, error = %e, "Failed to compute holdings for bid");
                    None
                }
            };

            all.push(BidHoldings {
                bid_id: *bid_id,
                initial_atom_allocation: bid.initial_atom_allocation,
                initial_allocation_usd: self.initial_allocation_usd(bid).await,
                holdings,
            });
        }

        all
    }

    /// USD value of the bid's initial ATOM commitment at its start date,
    /// via the day-granular historical path. Best effort.
    async fn initial_allocation_usd(&self, bid: &BidConfig) -> Option<Decimal> {
        match self
            .prices
            .historical_price(REFERENCE_PRICE_ID, bid.start_timestamp)
            .await
        {
            Ok(price) => Some(bid.initial_atom_allocation * price),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to price initial allocation");
                None
            }
        }
    }

    pub async fn deployment(&self, id: u32) -> ValuationResult<DeploymentResponse> {
        let config = self
            .deployments
            .get(&id)
            .ok_or(ValuationError::DeploymentNotFound(id))?;

        let catalog = self.registry.catalog(config.chain).await?;

        let current =
            deployments::current_vault_holdings(&self.chain, &self.prices, &catalog, config)
                .await?;

        let initial = match deployments::initial_holdings_at(&self.prices, &catalog, config).await {
            Ok(h) => Some(h),
            Err(e) => {
                tracing::warn!(deployment_id = %id, error = %e, "Failed to revalue initial holdings");
                None
            }
        };

        Ok(self.deployment_response(config, initial, Some(current)))
    }

    pub async fn all_deployments(&self) -> Vec<DeploymentResponse> {
        let mut all = Vec::with_capacity(self.deployments.len());

        for (id, config) in &self.deployments {
            match self.deployment(*id).await {
                Ok(response) => all.push(response),
                Err(e) => {
                    tracing::warn!(deployment_id = %id, error = %e, "Failed to compute deployment holdings");
                    all.push(self.deployment_response(config, None, None));
                }
            }
        }

        all
    }

    fn deployment_response(
        &self,
        config: &DeploymentConfig,
        initial: Option<Holdings>,
        current: Option<Holdings>,
    ) -> DeploymentResponse {
        DeploymentResponse {
            deployment_id: config.deployment_id,
            name: config.name.to_string(),
            description: config.description.to_string(),
            start_timestamp: config.start_timestamp,
            end_timestamp: config.end_timestamp,
            initial_holdings: initial,
            current_holdings: current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use vantage_core::Protocol;

    fn test_orchestrator() -> Orchestrator {
        use crate::config::RegistryConfig;

        let chain = ChainClient::new(Duration::from_millis(250));
        let registry = Arc::new(AssetRegistry::new(
            &RegistryConfig {
                chain_url: "http://127.0.0.1:1/{chain}".to_string(),
                fallback_url: "http://127.0.0.1:1/assets".to_string(),
            },
            chain.clone(),
        ));
        let prices = Arc::new(PriceResolver::seeded(vec![("cosmos", dec!(10))]));

        Orchestrator::new(registry, prices, chain, BTreeMap::new(), BTreeMap::new())
    }

    #[tokio::test]
    async fn unknown_bid_is_an_error() {
        let orchestrator = test_orchestrator();
        let err = orchestrator.bid_holdings(999).await.unwrap_err();
        assert!(matches!(err, ValuationError::BidNotFound(999)));
    }

    #[tokio::test]
    async fn missing_protocol_yields_placeholder_without_network() {
        let orchestrator = test_orchestrator();
        // every endpoint is unroutable; a placeholder must not need one
        let holdings = orchestrator
            .venue_holdings(&VenueConfig::Missing {
                protocol: Protocol::Elys,
            })
            .await;

        assert!(holdings.info_missing);
        assert!(holdings.error.is_none());
        assert!(holdings.venue_total.is_none());
    }

    #[tokio::test]
    async fn venue_failure_is_recorded_not_propagated() {
        let orchestrator = test_orchestrator();
        // unroutable registry endpoint: catalog resolution fails, and
        // the failure must land in the entry
        let holdings = orchestrator
            .venue_holdings(&VenueConfig::Mars {
                credit_account_id: "1".to_string(),
                deposited_denom: "uatom".to_string(),
            })
            .await;

        assert!(!holdings.info_missing);
        assert!(holdings.error.is_some());
        assert!(holdings.venue_total.is_none());
    }
}
