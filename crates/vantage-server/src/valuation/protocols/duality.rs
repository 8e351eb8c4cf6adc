//! Duality vault pools
//!
//! TVL is the pool's `get_balance` token list. Principal simulates a
//! withdrawal of the bid's recorded share amount; the reply is two bare
//! amounts whose order matches the pool's own `get_config` token
//! ordering, so the denoms are fetched separately and matched by
//! position. The protocol folds yield into the pool balance, so rewards
//! are an explicit empty holdings.

use serde::Deserialize;
use serde_json::json;

use vantage_core::{Holdings, ValuationError, ValuationResult};

use super::{parse_raw, value_coins, MissingAssetPolicy, ValuationContext};
use crate::query::Coin;

#[derive(Debug, Deserialize)]
struct ConfigResponse {
    pair_data: PairData,
}

#[derive(Debug, Deserialize)]
struct PairData {
    token_0: PairToken,
    token_1: PairToken,
}

#[derive(Debug, Deserialize)]
struct PairToken {
    denom: String,
}

pub struct DualityPosition {
    pool_address: String,
    active_shares: i128,
}

impl DualityPosition {
    pub fn new(pool_address: String, active_shares: i128) -> Self {
        Self {
            pool_address,
            active_shares,
        }
    }

    pub async fn venue_tvl(&self, ctx: &ValuationContext<'_>) -> ValuationResult<Holdings> {
        let balances: Vec<Coin> = ctx
            .chain
            .smart_query(ctx.lcd, &self.pool_address, &json!({"get_balance": {}}))
            .await?;

        let mut coins = Vec::with_capacity(balances.len());
        for coin in &balances {
            coins.push((coin.denom.clone(), parse_raw(&coin.amount, "pool balance amount")?));
        }

        // a pool entry the catalog cannot resolve is dropped, not fatal
        value_coins(ctx.prices, ctx.catalog, &coins, MissingAssetPolicy::Skip).await
    }

    pub async fn address_principal(&self, ctx: &ValuationContext<'_>) -> ValuationResult<Holdings> {
        // no shares recorded for this bid: nothing to simulate, nothing
        // to query
        if self.active_shares == 0 {
            return Ok(Holdings::empty());
        }

        let amounts: Vec<String> = ctx
            .chain
            .smart_query(
                ctx.lcd,
                &self.pool_address,
                &json!({
                    "simulate_withdraw_liquidity": {
                        "amount": self.active_shares.to_string(),
                    }
                }),
            )
            .await?;

        let config: ConfigResponse = ctx
            .chain
            .smart_query(ctx.lcd, &self.pool_address, &json!({"get_config": {}}))
            .await?;

        let coins = match_withdraw_amounts(
            &amounts,
            [config.pair_data.token_0.denom, config.pair_data.token_1.denom],
        )?;

        value_coins(ctx.prices, ctx.catalog, &coins, MissingAssetPolicy::Skip).await
    }

    pub async fn address_rewards(&self, _ctx: &ValuationContext<'_>) -> ValuationResult<Holdings> {
        // yield accrues into the pool balance itself
        Ok(Holdings::empty())
    }
}

/// Pairs the two simulated withdrawal amounts with the pool's published
/// token ordering. The order dependency is the contract's, not ours:
/// amount[0] belongs to token_0, amount[1] to token_1.
fn match_withdraw_amounts(
    amounts: &[String],
    denoms: [String; 2],
) -> ValuationResult<Vec<(String, i128)>> {
    if amounts.len() != 2 {
        return Err(ValuationError::malformed(format!(
            "simulated withdrawal: expected 2 token amounts, got {}",
            amounts.len()
        )));
    }

    denoms
        .into_iter()
        .zip(amounts.iter())
        .map(|(denom, amount)| Ok((denom, parse_raw(amount, "withdrawal amount")?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::time::Duration;
    use vantage_core::TokenInfo;

    use crate::prices::PriceResolver;
    use crate::query::ChainClient;
    use crate::registry::TokenCatalog;

    #[test]
    fn withdraw_amounts_match_pool_token_order() {
        let amounts = vec!["100".to_string(), "200".to_string()];
        let coins = match_withdraw_amounts(
            &amounts,
            ["untrn".to_string(), "uatom".to_string()],
        )
        .unwrap();

        assert_eq!(
            coins,
            vec![("untrn".to_string(), 100), ("uatom".to_string(), 200)]
        );
    }

    #[test]
    fn withdraw_amounts_require_exactly_two_entries() {
        let err = match_withdraw_amounts(
            &["100".to_string()],
            ["untrn".to_string(), "uatom".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, ValuationError::Malformed(_)));
    }

    #[test]
    fn zero_shares_short_circuits_without_network() {
        let position = DualityPosition::new("neutron1pool".to_string(), 0);

        // all endpoints unroutable: reaching the network would error
        let resolver = PriceResolver::seeded(vec![("cosmos", dec!(10))]);
        let chain = ChainClient::new(Duration::from_millis(250));
        let catalog = TokenCatalog::from_parts("neutron-1", HashMap::<String, TokenInfo>::new(), HashMap::new());
        let ctx = ValuationContext {
            chain: &chain,
            prices: &resolver,
            catalog: &catalog,
            lcd: "http://127.0.0.1:1",
        };

        let holdings = tokio_test::block_on(position.address_principal(&ctx)).unwrap();
        assert!(holdings.is_empty());
        assert_eq!(holdings.total_usd, dec!(0));
        assert_eq!(holdings.total_atom, dec!(0));
    }
}
