//! Nolus lease pools
//!
//! Every quantity here is a share count converted through the pool's
//! share-to-token ratio (`price` query: amount_quote / amount). The
//! ratio drifts with pool P&L, so it is recomputed from pool-wide totals
//! on every call, never assumed constant. Rewards are tracked as their
//! own share balance and valued through the same ratio.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use vantage_core::{adjust_decimal_amount, adjust_raw_amount, Asset, Holdings, ValuationError, ValuationResult};

use super::{parse_decimal, parse_raw, ValuationContext};
use crate::prices::holdings_from_assets;

#[derive(Debug, Deserialize)]
struct PriceResponse {
    amount: CoinAmount,
    amount_quote: CoinAmount,
}

#[derive(Debug, Deserialize)]
struct CoinAmount {
    amount: String,
}

#[derive(Debug, Deserialize)]
struct LppBalanceResponse {
    balance_nlpn: CoinAmount,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    balance: String,
}

#[derive(Debug, Deserialize)]
struct RewardsResponse {
    rewards: CoinAmount,
}

pub struct NolusPosition {
    pool_contract: String,
    pool_token: String,
    address: String,
}

impl NolusPosition {
    pub fn new(pool_contract: String, pool_token: String, address: String) -> Self {
        Self {
            pool_contract,
            pool_token,
            address,
        }
    }

    pub async fn venue_tvl(&self, ctx: &ValuationContext<'_>) -> ValuationResult<Holdings> {
        let shares = self.total_pool_shares(ctx).await?;
        self.holdings_for_shares(ctx, shares).await
    }

    pub async fn address_principal(&self, ctx: &ValuationContext<'_>) -> ValuationResult<Holdings> {
        let shares = self.address_balance_shares(ctx).await?;
        self.holdings_for_shares(ctx, shares).await
    }

    pub async fn address_rewards(&self, ctx: &ValuationContext<'_>) -> ValuationResult<Holdings> {
        let shares = self.address_reward_shares(ctx).await?;
        self.holdings_for_shares(ctx, shares).await
    }

    /// shares x ratio -> raw token amount -> valued holdings
    async fn holdings_for_shares(
        &self,
        ctx: &ValuationContext<'_>,
        shares: i128,
    ) -> ValuationResult<Holdings> {
        let info = ctx.catalog.lookup(&self.pool_token)?;

        let ratio = self.share_to_token_ratio(ctx).await?;
        let raw_amount = adjust_raw_amount(shares, 0)? * ratio;
        let adjusted = adjust_decimal_amount(raw_amount, info.decimals)?;

        let price = ctx.prices.price_for(info, ctx.catalog).await?;
        let asset = Asset {
            denom: self.pool_token.clone(),
            amount: adjusted,
            usd_value: adjusted * price,
            display_name: info.display_name.clone(),
        };

        holdings_from_assets(ctx.prices, vec![asset]).await
    }

    async fn share_to_token_ratio(&self, ctx: &ValuationContext<'_>) -> ValuationResult<Decimal> {
        let response: PriceResponse = ctx
            .chain
            .smart_query(ctx.lcd, &self.pool_contract, &json!({"price": []}))
            .await?;

        let amount = parse_decimal(&response.amount.amount, "pool price amount")?;
        let quote = parse_decimal(&response.amount_quote.amount, "pool price amount_quote")?;

        if amount <= Decimal::ZERO {
            return Err(ValuationError::malformed("pool price amount: zero"));
        }

        Ok(quote / amount)
    }

    async fn total_pool_shares(&self, ctx: &ValuationContext<'_>) -> ValuationResult<i128> {
        let response: LppBalanceResponse = ctx
            .chain
            .smart_query(ctx.lcd, &self.pool_contract, &json!({"lpp_balance": []}))
            .await?;

        parse_raw(&response.balance_nlpn.amount, "balance_nlpn")
    }

    async fn address_balance_shares(&self, ctx: &ValuationContext<'_>) -> ValuationResult<i128> {
        let response: BalanceResponse = ctx
            .chain
            .smart_query(
                ctx.lcd,
                &self.pool_contract,
                &json!({"balance": {"address": self.address}}),
            )
            .await?;

        parse_raw(&response.balance, "balance")
    }

    async fn address_reward_shares(&self, ctx: &ValuationContext<'_>) -> ValuationResult<i128> {
        let response: RewardsResponse = ctx
            .chain
            .smart_query(
                ctx.lcd,
                &self.pool_contract,
                &json!({"rewards": {"address": self.address}}),
            )
            .await?;

        parse_raw(&response.rewards.amount, "rewards amount")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_response_shape_decodes() {
        let raw = r#"{
            "amount": {"amount": "1000", "ticker": "NLPN"},
            "amount_quote": {"amount": "1100", "ticker": "USDC"}
        }"#;
        let response: PriceResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.amount.amount, "1000");
        assert_eq!(response.amount_quote.amount, "1100");
    }

    #[test]
    fn lpp_balance_shape_decodes() {
        let raw = r#"{
            "balance": {"amount": "5", "ticker": "USDC"},
            "balance_nlpn": {"amount": "31415", "ticker": "NLPN"}
        }"#;
        let response: LppBalanceResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.balance_nlpn.amount, "31415");
    }
}
