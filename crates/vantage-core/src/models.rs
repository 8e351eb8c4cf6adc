//! Canonical holdings model
//!
//! Every protocol adapter normalizes its on-chain query results into the
//! structures below, so that a lending receipt on Neutron and an LP share
//! on Osmosis end up in the same shape: a list of decimal-adjusted assets
//! with USD values, plus totals in USD and in the reference asset (ATOM).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ValuationError, ValuationResult};

// =============================================================================
// Protocols
// =============================================================================

/// Protocols a venue can live on. Variants without an adapter yet are
/// routed to the missing-position placeholder at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Osmosis,
    Astroport,
    Duality,
    Mars,
    Nolus,
    Neptune,
    Elys,
    Ux,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Osmosis => write!(f, "osmosis"),
            Protocol::Astroport => write!(f, "astroport"),
            Protocol::Duality => write!(f, "duality"),
            Protocol::Mars => write!(f, "mars"),
            Protocol::Nolus => write!(f, "nolus"),
            Protocol::Neptune => write!(f, "neptune"),
            Protocol::Elys => write!(f, "elys"),
            Protocol::Ux => write!(f, "ux"),
        }
    }
}

impl Protocol {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "osmosis" => Some(Protocol::Osmosis),
            "astroport" => Some(Protocol::Astroport),
            "duality" => Some(Protocol::Duality),
            "mars" => Some(Protocol::Mars),
            "nolus" => Some(Protocol::Nolus),
            "neptune" => Some(Protocol::Neptune),
            "elys" => Some(Protocol::Elys),
            "ux" => Some(Protocol::Ux),
            _ => None,
        }
    }
}

// =============================================================================
// Token metadata
// =============================================================================

/// Resolved metadata for one denom on one chain.
///
/// `decimals` is the only source of the power-of-ten divisor applied to
/// raw on-chain amounts of this token; call sites must never infer it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Canonical on-chain identifier (native or IBC denom)
    pub denom: String,

    /// Human-readable symbol, when a registry provides one
    pub display_name: Option<String>,

    /// Power-of-ten exponent between raw ledger units and human units
    pub decimals: u32,

    /// The external price feed's own id for this asset, distinct from
    /// the denom (e.g. "cosmos" for uatom)
    pub price_source_id: Option<String>,
}

/// Converts a raw integer ledger amount into human units using the
/// token's decimals. This is the single decimal-adjustment point for the
/// whole codebase.
pub fn adjust_raw_amount(raw: i128, decimals: u32) -> ValuationResult<Decimal> {
    Decimal::try_from_i128_with_scale(raw, decimals)
        .map_err(|_| ValuationError::malformed(format!("amount out of range: {raw}e-{decimals}")))
}

/// Decimal-adjusts an amount that is already fractional (a share count
/// scaled by a pool ratio, for instance) by the same power of ten.
pub fn adjust_decimal_amount(raw: Decimal, decimals: u32) -> ValuationResult<Decimal> {
    let unit = Decimal::try_from_i128_with_scale(1, decimals)
        .map_err(|_| ValuationError::malformed(format!("decimals out of range: {decimals}")))?;
    Ok(raw * unit)
}

// =============================================================================
// Holdings
// =============================================================================

/// One decimal-adjusted asset position with its USD valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub denom: String,

    /// Amount in human units (raw on-chain integer / 10^decimals)
    pub amount: Decimal,

    pub usd_value: Decimal,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// A valued set of balances. The empty value is a valid result meaning
/// "nothing found" and is distinct from an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Holdings {
    pub balances: Vec<Asset>,
    pub total_usd: Decimal,
    pub total_atom: Decimal,
}

impl Holdings {
    /// Builds holdings from valued assets, deriving `total_usd` as the
    /// sum of the asset values and `total_atom` via the reference-asset
    /// price. Fails rather than dividing by a zero or negative price.
    pub fn from_assets(balances: Vec<Asset>, reference_price: Decimal) -> ValuationResult<Self> {
        if reference_price <= Decimal::ZERO {
            return Err(ValuationError::ReferencePriceUnavailable);
        }

        let total_usd: Decimal = balances.iter().map(|a| a.usd_value).sum();

        Ok(Self {
            balances,
            total_usd,
            total_atom: total_usd / reference_price,
        })
    }

    /// The explicit "nothing found" value.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}

// =============================================================================
// Per-venue / per-bid aggregates
// =============================================================================

/// The three holdings computed for one venue: venue-wide total (TVL),
/// one address's principal, and that address's claimable rewards.
///
/// Adapters guarantee principal and rewards never double-count the same
/// underlying balance; protocols that fold rewards into principal report
/// an explicit empty rewards holdings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueHoldings {
    pub protocol: Protocol,

    /// True when the protocol has no adapter yet; a placeholder, not a
    /// failure
    pub info_missing: bool,

    /// Recorded per-venue failure in multi-venue context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub venue_total: Option<Holdings>,
    pub address_principal: Option<Holdings>,
    pub address_rewards: Option<Holdings>,
}

impl VenueHoldings {
    pub fn complete(
        protocol: Protocol,
        venue_total: Holdings,
        address_principal: Holdings,
        address_rewards: Holdings,
    ) -> Self {
        Self {
            protocol,
            info_missing: false,
            error: None,
            venue_total: Some(venue_total),
            address_principal: Some(address_principal),
            address_rewards: Some(address_rewards),
        }
    }

    /// Placeholder for a venue on a protocol without an adapter.
    pub fn missing(protocol: Protocol) -> Self {
        Self {
            protocol,
            info_missing: true,
            error: None,
            venue_total: None,
            address_principal: None,
            address_rewards: None,
        }
    }

    /// Records a venue-level failure without aborting the surrounding
    /// bid computation.
    pub fn failed(protocol: Protocol, error: &ValuationError) -> Self {
        Self {
            protocol,
            info_missing: false,
            error: Some(error.to_string()),
            venue_total: None,
            address_principal: None,
            address_rewards: None,
        }
    }
}

/// All venue holdings of one bid, plus the bid's initial allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidHoldings {
    pub bid_id: u32,

    /// ATOM committed to the bid when it was opened
    pub initial_atom_allocation: Decimal,

    /// USD value of the initial allocation at the bid's start date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_allocation_usd: Option<Decimal>,

    /// None when the bid's valuation failed entirely
    pub holdings: Option<Vec<VenueHoldings>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn adjust_amount_divides_by_decimals() {
        let adjusted = adjust_raw_amount(5_000_000, 6).unwrap();
        assert_eq!(adjusted, dec!(5));
    }

    #[test]
    fn adjust_amount_round_trips() {
        let raw: i128 = 123_456_789;
        let adjusted = adjust_raw_amount(raw, 6).unwrap();
        assert_eq!(adjusted * dec!(1_000_000), Decimal::from(raw as i64));
    }

    #[test]
    fn adjust_amount_zero_decimals() {
        assert_eq!(adjust_raw_amount(42, 0).unwrap(), dec!(42));
    }

    #[test]
    fn adjust_decimal_amount_scales_fractional_input() {
        assert_eq!(adjust_decimal_amount(dec!(1500000.5), 6).unwrap(), dec!(1.5000005));
    }

    #[test]
    fn holdings_totals_are_sum_of_balances() {
        let assets = vec![
            Asset {
                denom: "uatom".into(),
                amount: dec!(5),
                usd_value: dec!(50),
                display_name: Some("ATOM".into()),
            },
            Asset {
                denom: "uosmo".into(),
                amount: dec!(100),
                usd_value: dec!(25),
                display_name: Some("OSMO".into()),
            },
        ];

        let holdings = Holdings::from_assets(assets, dec!(10)).unwrap();
        assert_eq!(holdings.total_usd, dec!(75));
        assert_eq!(holdings.total_atom, dec!(7.5));
    }

    #[test]
    fn holdings_rejects_zero_reference_price() {
        let err = Holdings::from_assets(vec![], Decimal::ZERO).unwrap_err();
        assert!(matches!(err, ValuationError::ReferencePriceUnavailable));
    }

    #[test]
    fn empty_holdings_is_a_valid_value() {
        let holdings = Holdings::empty();
        assert!(holdings.is_empty());
        assert_eq!(holdings.total_usd, Decimal::ZERO);
        assert_eq!(holdings.total_atom, Decimal::ZERO);
    }

    #[test]
    fn protocol_round_trips_through_strings() {
        for p in [
            Protocol::Osmosis,
            Protocol::Astroport,
            Protocol::Duality,
            Protocol::Mars,
            Protocol::Nolus,
            Protocol::Neptune,
        ] {
            assert_eq!(Protocol::from_str(&p.to_string()), Some(p));
        }
        assert_eq!(Protocol::from_str("uniswap"), None);
    }
}
