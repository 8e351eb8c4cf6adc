//! Protocol adapters
//!
//! One adapter per protocol, all implementing the same three-operation
//! contract: venue-wide TVL, one address's principal holdings, and that
//! address's claimable rewards. The common shape is (a) query raw
//! integer balances on chain, (b) resolve token metadata, (c) decimal
//! adjust, (d) price, (e) sum into holdings - the variants differ in how
//! step (a) maps shares or receipts onto underlying assets.

pub mod astroport;
pub mod duality;
pub mod mars;
pub mod neptune;
pub mod nolus;
pub mod osmosis;

pub use astroport::AstroportPosition;
pub use duality::DualityPosition;
pub use mars::MarsPosition;
pub use neptune::NeptunePosition;
pub use nolus::NolusPosition;
pub use osmosis::OsmosisPosition;

use rust_decimal::Decimal;

use vantage_core::{adjust_raw_amount, Holdings, Protocol, ValuationError, ValuationResult};

use crate::prices::{holdings_from_assets, value_asset, PriceResolver};
use crate::query::ChainClient;
use crate::registry::TokenCatalog;

/// Everything an adapter operation needs to turn on-chain state into
/// valued holdings.
pub struct ValuationContext<'a> {
    pub chain: &'a ChainClient,
    pub prices: &'a PriceResolver,
    pub catalog: &'a TokenCatalog,
    /// LCD/REST base endpoint of the venue's chain
    pub lcd: &'a str,
}

/// One concrete position, as loaded from static configuration. The
/// variant is the protocol discriminator the adapter factory matches on.
#[derive(Debug, Clone)]
pub enum VenueConfig {
    Osmosis {
        pool_id: String,
        address: String,
    },
    Astroport {
        pool_address: String,
        incentive_address: String,
        address: String,
    },
    Duality {
        pool_address: String,
        /// LP share amount recorded for the bid; tracks the funds
        /// deployed per bid
        active_shares: i128,
    },
    Mars {
        credit_account_id: String,
        deposited_denom: String,
    },
    Nolus {
        pool_contract: String,
        pool_token: String,
        address: String,
    },
    Neptune {
        denom: String,
        active_shares: i128,
    },
    /// A venue on a protocol without an adapter yet
    Missing { protocol: Protocol },
}

impl VenueConfig {
    pub fn protocol(&self) -> Protocol {
        match self {
            VenueConfig::Osmosis { .. } => Protocol::Osmosis,
            VenueConfig::Astroport { .. } => Protocol::Astroport,
            VenueConfig::Duality { .. } => Protocol::Duality,
            VenueConfig::Mars { .. } => Protocol::Mars,
            VenueConfig::Nolus { .. } => Protocol::Nolus,
            VenueConfig::Neptune { .. } => Protocol::Neptune,
            VenueConfig::Missing { protocol } => *protocol,
        }
    }
}

/// The adapter sum type. Matching is exhaustive, so adding a protocol
/// without wiring all three operations does not compile.
pub enum PositionAdapter {
    Osmosis(OsmosisPosition),
    Astroport(AstroportPosition),
    Duality(DualityPosition),
    Mars(MarsPosition),
    Nolus(NolusPosition),
    Neptune(NeptunePosition),
    Missing(Protocol),
}

impl PositionAdapter {
    /// Maps a venue configuration onto its adapter. Protocols without an
    /// adapter resolve to the missing-position placeholder here, never
    /// to an error.
    pub fn from_venue(venue: &VenueConfig) -> Self {
        match venue {
            VenueConfig::Osmosis { pool_id, address } => {
                PositionAdapter::Osmosis(OsmosisPosition::new(pool_id.clone(), address.clone()))
            }
            VenueConfig::Astroport {
                pool_address,
                incentive_address,
                address,
            } => PositionAdapter::Astroport(AstroportPosition::new(
                pool_address.clone(),
                incentive_address.clone(),
                address.clone(),
            )),
            VenueConfig::Duality {
                pool_address,
                active_shares,
            } => PositionAdapter::Duality(DualityPosition::new(pool_address.clone(), *active_shares)),
            VenueConfig::Mars {
                credit_account_id,
                deposited_denom,
            } => PositionAdapter::Mars(MarsPosition::new(
                credit_account_id.clone(),
                deposited_denom.clone(),
            )),
            VenueConfig::Nolus {
                pool_contract,
                pool_token,
                address,
            } => PositionAdapter::Nolus(NolusPosition::new(
                pool_contract.clone(),
                pool_token.clone(),
                address.clone(),
            )),
            VenueConfig::Neptune {
                denom,
                active_shares,
            } => PositionAdapter::Neptune(NeptunePosition::new(denom.clone(), *active_shares)),
            VenueConfig::Missing { protocol } => PositionAdapter::Missing(*protocol),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, PositionAdapter::Missing(_))
    }

    /// Total value locked in the specific pool/vault this configuration
    /// names.
    pub async fn venue_tvl(&self, ctx: &ValuationContext<'_>) -> ValuationResult<Holdings> {
        match self {
            PositionAdapter::Osmosis(p) => p.venue_tvl(ctx).await,
            PositionAdapter::Astroport(p) => p.venue_tvl(ctx).await,
            PositionAdapter::Duality(p) => p.venue_tvl(ctx).await,
            PositionAdapter::Mars(p) => p.venue_tvl(ctx).await,
            PositionAdapter::Nolus(p) => p.venue_tvl(ctx).await,
            PositionAdapter::Neptune(p) => p.venue_tvl(ctx).await,
            PositionAdapter::Missing(_) => Ok(Holdings::empty()),
        }
    }

    /// The configured holder's deposited/LP balance, converted to
    /// underlying assets.
    pub async fn address_principal(&self, ctx: &ValuationContext<'_>) -> ValuationResult<Holdings> {
        match self {
            PositionAdapter::Osmosis(p) => p.address_principal(ctx).await,
            PositionAdapter::Astroport(p) => p.address_principal(ctx).await,
            PositionAdapter::Duality(p) => p.address_principal(ctx).await,
            PositionAdapter::Mars(p) => p.address_principal(ctx).await,
            PositionAdapter::Nolus(p) => p.address_principal(ctx).await,
            PositionAdapter::Neptune(p) => p.address_principal(ctx).await,
            PositionAdapter::Missing(_) => Ok(Holdings::empty()),
        }
    }

    /// Claimable rewards, or explicit empty holdings where the protocol
    /// folds rewards into principal.
    pub async fn address_rewards(&self, ctx: &ValuationContext<'_>) -> ValuationResult<Holdings> {
        match self {
            PositionAdapter::Osmosis(p) => p.address_rewards(ctx).await,
            PositionAdapter::Astroport(p) => p.address_rewards(ctx).await,
            PositionAdapter::Duality(p) => p.address_rewards(ctx).await,
            PositionAdapter::Mars(p) => p.address_rewards(ctx).await,
            PositionAdapter::Nolus(p) => p.address_rewards(ctx).await,
            PositionAdapter::Neptune(p) => p.address_rewards(ctx).await,
            PositionAdapter::Missing(_) => Ok(Holdings::empty()),
        }
    }
}

// ============================================================================
// Shared valuation helpers
// ============================================================================

/// What to do when one underlying denom's metadata or price cannot be
/// resolved. The choice is deliberately per-adapter: unifying it would
/// silently change financial totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingAssetPolicy {
    /// Abort the whole holdings computation
    Fail,
    /// Drop the asset from the list and exclude it from totals
    Skip,
}

/// Values a set of raw integer balances into holdings. Each entry is
/// looked up in the catalog, decimal-adjusted and priced; the policy
/// decides whether an unresolvable entry aborts or is dropped.
pub async fn value_coins(
    prices: &PriceResolver,
    catalog: &TokenCatalog,
    coins: &[(String, i128)],
    policy: MissingAssetPolicy,
) -> ValuationResult<Holdings> {
    let mut assets = Vec::with_capacity(coins.len());

    for (denom, raw_amount) in coins {
        let valued = async {
            let info = catalog.lookup(denom)?;
            let adjusted = adjust_raw_amount(*raw_amount, info.decimals)?;
            value_asset(prices, catalog, info, adjusted).await
        }
        .await;

        match valued {
            Ok(asset) => assets.push(asset),
            Err(e) if policy == MissingAssetPolicy::Skip && e.is_not_found() => {
                tracing::warn!(denom = %denom, error = %e, "Skipping unresolvable asset");
                continue;
            }
            Err(e) => return Err(e),
        }
    }

    holdings_from_assets(prices, assets).await
}

/// Values a single raw integer balance of one denom.
pub async fn value_single_coin(
    prices: &PriceResolver,
    catalog: &TokenCatalog,
    denom: &str,
    raw_amount: i128,
) -> ValuationResult<Holdings> {
    value_coins(
        prices,
        catalog,
        &[(denom.to_string(), raw_amount)],
        MissingAssetPolicy::Fail,
    )
    .await
}

/// Parses a raw integer amount string the way LCD endpoints render
/// uint128 values.
pub fn parse_raw(amount: &str, field: &str) -> ValuationResult<i128> {
    amount
        .parse::<i128>()
        .map_err(|_| ValuationError::malformed(format!("{field}: {amount:?}")))
}

/// Parses a decimal-rendered contract value (ratios, redemption rates).
pub fn parse_decimal(value: &str, field: &str) -> ValuationResult<Decimal> {
    value
        .parse::<Decimal>()
        .map_err(|_| ValuationError::malformed(format!("{field}: {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use vantage_core::TokenInfo;

    fn catalog_with(tokens: &[(&str, u32, &str)]) -> TokenCatalog {
        let map: HashMap<String, TokenInfo> = tokens
            .iter()
            .map(|(denom, decimals, id)| {
                (
                    denom.to_string(),
                    TokenInfo {
                        denom: denom.to_string(),
                        display_name: Some(denom.to_uppercase()),
                        decimals: *decimals,
                        price_source_id: Some(id.to_string()),
                    },
                )
            })
            .collect();
        TokenCatalog::from_parts("test-1", map, HashMap::new())
    }

    #[test]
    fn value_coins_adjusts_prices_and_sums() {
        let resolver = PriceResolver::seeded(vec![("cosmos", dec!(10))]);
        let catalog = catalog_with(&[("uatom", 6, "cosmos")]);

        let holdings = tokio_test::block_on(value_coins(
            &resolver,
            &catalog,
            &[("uatom".to_string(), 5_000_000)],
            MissingAssetPolicy::Fail,
        ))
        .unwrap();

        assert_eq!(holdings.balances.len(), 1);
        assert_eq!(holdings.balances[0].amount, dec!(5));
        assert_eq!(holdings.balances[0].usd_value, dec!(50));
        assert_eq!(holdings.total_usd, dec!(50));
        assert_eq!(holdings.total_atom, dec!(5));
    }

    #[test]
    fn skip_policy_drops_unresolvable_assets() {
        let resolver = PriceResolver::seeded(vec![("cosmos", dec!(10))]);
        // one of the two denoms is absent from the catalog
        let catalog = catalog_with(&[("uatom", 6, "cosmos")]);

        let holdings = tokio_test::block_on(value_coins(
            &resolver,
            &catalog,
            &[
                ("uatom".to_string(), 5_000_000),
                ("unknown".to_string(), 1_000_000),
            ],
            MissingAssetPolicy::Skip,
        ))
        .unwrap();

        assert_eq!(holdings.balances.len(), 1);
        assert_eq!(holdings.balances[0].denom, "uatom");
        assert_eq!(holdings.total_usd, dec!(50));
    }

    #[test]
    fn fail_policy_aborts_on_unresolvable_asset() {
        let resolver = PriceResolver::seeded(vec![("cosmos", dec!(10))]);
        let catalog = catalog_with(&[("uatom", 6, "cosmos")]);

        let err = tokio_test::block_on(value_coins(
            &resolver,
            &catalog,
            &[
                ("uatom".to_string(), 5_000_000),
                ("unknown".to_string(), 1_000_000),
            ],
            MissingAssetPolicy::Fail,
        ))
        .unwrap_err();

        assert!(matches!(err, ValuationError::TokenNotFound(_)));
    }

    #[test]
    fn missing_adapter_reports_empty_holdings() {
        let adapter = PositionAdapter::from_venue(&VenueConfig::Missing {
            protocol: Protocol::Elys,
        });
        assert!(adapter.is_missing());
    }

    #[test]
    fn venue_config_exposes_its_protocol() {
        let venue = VenueConfig::Duality {
            pool_address: "neutron1pool".to_string(),
            active_shares: 0,
        };
        assert_eq!(venue.protocol(), Protocol::Duality);
    }

    #[test]
    fn parse_raw_rejects_garbage() {
        assert_eq!(parse_raw("12345", "amount").unwrap(), 12345);
        assert!(parse_raw("12.5", "amount").is_err());
        assert!(parse_raw("", "amount").is_err());
    }
}
