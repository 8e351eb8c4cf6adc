//! Neptune lending markets
//!
//! One market-maker contract lists every market as an [asset, data]
//! pair. TVL is the configured denom's `lending_principal`. Principal
//! converts the bid's recorded receipt shares through the redemption
//! rate, which is derived from pool-wide totals (lending principal over
//! the receipt token's total supply) because it drifts as the pool earns
//! or loses. Rewards are folded into the receipt value, so the rewards
//! holdings are explicitly empty.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use vantage_core::{adjust_decimal_amount, adjust_raw_amount, Asset, Holdings, ValuationError, ValuationResult};

use super::{parse_decimal, ValuationContext};
use crate::prices::holdings_from_assets;

const MARKET_MAKER_ADDRESS: &str = "inj1nc7gjkf2mhp34a6gquhurg8qahnw5kxs5u3s4u";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum MarketAsset {
    NativeToken { denom: String },
    Token { contract_addr: String },
}

impl MarketAsset {
    fn denom(&self) -> &str {
        match self {
            MarketAsset::NativeToken { denom } => denom,
            MarketAsset::Token { contract_addr } => contract_addr,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MarketData {
    lending_principal: String,
    #[serde(default)]
    market_asset_details: Option<MarketAssetDetails>,
}

#[derive(Debug, Deserialize)]
struct MarketAssetDetails {
    receipt_addr: String,
}

#[derive(Debug, Deserialize)]
struct TokenInfoResponse {
    total_supply: String,
}

pub struct NeptunePosition {
    denom: String,
    active_shares: i128,
}

impl NeptunePosition {
    pub fn new(denom: String, active_shares: i128) -> Self {
        Self {
            denom,
            active_shares,
        }
    }

    pub async fn venue_tvl(&self, ctx: &ValuationContext<'_>) -> ValuationResult<Holdings> {
        let (lending_principal, _) = self.find_market(ctx).await?;
        let principal = parse_decimal(&lending_principal, "lending_principal")?;

        let info = ctx.catalog.lookup(&self.denom)?;
        let adjusted = adjust_decimal_amount(principal, info.decimals)?;

        self.single_asset_holdings(ctx, adjusted).await
    }

    pub async fn address_principal(&self, ctx: &ValuationContext<'_>) -> ValuationResult<Holdings> {
        if self.active_shares == 0 {
            return Ok(Holdings::empty());
        }

        let (lending_principal, receipt_addr) = self.find_market(ctx).await?;
        let receipt_addr = receipt_addr.ok_or_else(|| {
            ValuationError::malformed("market_asset_details.receipt_addr")
        })?;

        let rate = self
            .redemption_rate(ctx, &lending_principal, &receipt_addr)
            .await?;

        let info = ctx.catalog.lookup(&self.denom)?;
        let adjusted_shares = adjust_raw_amount(self.active_shares, info.decimals)?;

        self.single_asset_holdings(ctx, adjusted_shares * rate).await
    }

    pub async fn address_rewards(&self, _ctx: &ValuationContext<'_>) -> ValuationResult<Holdings> {
        // yield accrues into the receipt token's redemption rate
        Ok(Holdings::empty())
    }

    /// Looks the configured denom up in the market list; returns its
    /// lending principal and receipt token address.
    async fn find_market(
        &self,
        ctx: &ValuationContext<'_>,
    ) -> ValuationResult<(String, Option<String>)> {
        let markets: Vec<(MarketAsset, MarketData)> = ctx
            .chain
            .smart_query(ctx.lcd, MARKET_MAKER_ADDRESS, &json!({"get_all_markets": {}}))
            .await?;

        find_market_entry(&markets, &self.denom)
            .map(|data| {
                (
                    data.lending_principal.clone(),
                    data.market_asset_details
                        .as_ref()
                        .map(|d| d.receipt_addr.clone()),
                )
            })
            .ok_or_else(|| {
                ValuationError::PositionNotFound(format!(
                    "no matching market for denom {}",
                    self.denom
                ))
            })
    }

    /// lending principal / receipt total supply, from pool-wide totals.
    async fn redemption_rate(
        &self,
        ctx: &ValuationContext<'_>,
        lending_principal: &str,
        receipt_addr: &str,
    ) -> ValuationResult<Decimal> {
        let token_info: TokenInfoResponse = ctx
            .chain
            .smart_query(ctx.lcd, receipt_addr, &json!({"token_info": {}}))
            .await?;

        let total_supply = parse_decimal(&token_info.total_supply, "receipt total_supply")?;
        if total_supply <= Decimal::ZERO {
            return Err(ValuationError::malformed("receipt total_supply: zero"));
        }

        let principal = parse_decimal(lending_principal, "lending_principal")?;
        Ok(principal / total_supply)
    }

    async fn single_asset_holdings(
        &self,
        ctx: &ValuationContext<'_>,
        adjusted_amount: Decimal,
    ) -> ValuationResult<Holdings> {
        let info = ctx.catalog.lookup(&self.denom)?;
        let price = ctx.prices.price_for(info, ctx.catalog).await?;

        let asset = Asset {
            denom: self.denom.clone(),
            amount: adjusted_amount,
            usd_value: adjusted_amount * price,
            display_name: info.display_name.clone(),
        };

        holdings_from_assets(ctx.prices, vec![asset]).await
    }
}

fn find_market_entry<'a>(
    markets: &'a [(MarketAsset, MarketData)],
    denom: &str,
) -> Option<&'a MarketData> {
    markets
        .iter()
        .find(|(asset, _)| asset.denom() == denom)
        .map(|(_, data)| data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market(denom: &str, principal: &str, receipt: Option<&str>) -> (MarketAsset, MarketData) {
        (
            MarketAsset::NativeToken {
                denom: denom.to_string(),
            },
            MarketData {
                lending_principal: principal.to_string(),
                market_asset_details: receipt.map(|addr| MarketAssetDetails {
                    receipt_addr: addr.to_string(),
                }),
            },
        )
    }

    #[test]
    fn market_lookup_matches_denom() {
        let markets = vec![
            market("inj", "100", None),
            market("ibc/atom", "5000", Some("inj1receipt")),
        ];

        let found = find_market_entry(&markets, "ibc/atom").unwrap();
        assert_eq!(found.lending_principal, "5000");
        assert!(find_market_entry(&markets, "ibc/other").is_none());
    }

    #[test]
    fn market_list_shape_decodes() {
        let raw = r#"[
            [
                {"native_token": {"denom": "ibc/atom"}},
                {
                    "lending_principal": "123456",
                    "market_asset_details": {"receipt_addr": "inj1receipt"}
                }
            ]
        ]"#;
        let markets: Vec<(MarketAsset, MarketData)> = serde_json::from_str(raw).unwrap();
        assert_eq!(markets.len(), 1);
        assert_eq!(markets[0].0.denom(), "ibc/atom");
        assert_eq!(
            markets[0].1.market_asset_details.as_ref().unwrap().receipt_addr,
            "inj1receipt"
        );
    }
}
