//! Osmosis concentrated-liquidity pools
//!
//! TVL comes from the SQS pools endpoint; a holder's principal and
//! rewards come from the LCD concentrated-liquidity positions endpoint,
//! filtered to the configured pool. Rewards (spread + incentives) are
//! tracked separately from principal by the chain itself, so nothing is
//! double counted here.

use serde::Deserialize;
use std::collections::BTreeMap;

use vantage_core::{Holdings, ValuationError, ValuationResult};

use super::{parse_raw, value_coins, MissingAssetPolicy, ValuationContext};
use crate::query::Coin;

const OSMOSIS_SQS_URL: &str = "https://sqs.osmosis.zone";

#[derive(Debug, Deserialize)]
struct SqsPool {
    #[serde(default)]
    balances: Vec<Coin>,
}

#[derive(Debug, Deserialize)]
struct PositionsResponse {
    #[serde(default)]
    positions: Vec<PositionEntry>,
}

#[derive(Debug, Deserialize)]
struct PositionEntry {
    position: PositionInfo,
    asset0: Coin,
    asset1: Coin,
    #[serde(default)]
    claimable_spread_rewards: Vec<Coin>,
    #[serde(default)]
    claimable_incentives: Vec<Coin>,
}

#[derive(Debug, Deserialize)]
struct PositionInfo {
    pool_id: String,
}

pub struct OsmosisPosition {
    pool_id: String,
    address: String,
}

impl OsmosisPosition {
    pub fn new(pool_id: String, address: String) -> Self {
        Self { pool_id, address }
    }

    pub async fn venue_tvl(&self, ctx: &ValuationContext<'_>) -> ValuationResult<Holdings> {
        let url = format!("{OSMOSIS_SQS_URL}/pools?IDs={}", self.pool_id);
        let pools: Vec<SqsPool> = ctx.chain.get_json(&url).await?;

        let pool = pools
            .into_iter()
            .next()
            .ok_or_else(|| ValuationError::malformed("no pool data returned"))?;

        let coins = collect_coins(&pool.balances)?;
        value_coins(ctx.prices, ctx.catalog, &coins, MissingAssetPolicy::Fail).await
    }

    pub async fn address_principal(&self, ctx: &ValuationContext<'_>) -> ValuationResult<Holdings> {
        let positions = self.fetch_positions(ctx).await?;
        let balances = sum_position_balances(&positions.positions, &self.pool_id)?;
        value_coins(ctx.prices, ctx.catalog, &balances, MissingAssetPolicy::Fail).await
    }

    pub async fn address_rewards(&self, ctx: &ValuationContext<'_>) -> ValuationResult<Holdings> {
        let positions = self.fetch_positions(ctx).await?;
        let rewards = sum_position_rewards(&positions.positions, &self.pool_id)?;
        value_coins(ctx.prices, ctx.catalog, &rewards, MissingAssetPolicy::Fail).await
    }

    async fn fetch_positions(&self, ctx: &ValuationContext<'_>) -> ValuationResult<PositionsResponse> {
        let url = format!(
            "{}/osmosis/concentratedliquidity/v1beta1/positions/{}",
            ctx.lcd, self.address
        );
        ctx.chain.get_json(&url).await
    }
}

fn collect_coins(balances: &[Coin]) -> ValuationResult<Vec<(String, i128)>> {
    balances
        .iter()
        .map(|coin| Ok((coin.denom.clone(), parse_raw(&coin.amount, "pool balance amount")?)))
        .collect()
}

/// Sums asset0/asset1 across the address's positions in one pool.
fn sum_position_balances(
    positions: &[PositionEntry],
    pool_id: &str,
) -> ValuationResult<Vec<(String, i128)>> {
    let mut balances: BTreeMap<String, i128> = BTreeMap::new();

    for entry in positions {
        if entry.position.pool_id != pool_id {
            continue;
        }
        for coin in [&entry.asset0, &entry.asset1] {
            let amount = parse_raw(&coin.amount, "position asset amount")?;
            *balances.entry(coin.denom.clone()).or_default() += amount;
        }
    }

    Ok(balances.into_iter().collect())
}

/// Sums claimable spread rewards and incentives across the address's
/// positions in one pool.
fn sum_position_rewards(
    positions: &[PositionEntry],
    pool_id: &str,
) -> ValuationResult<Vec<(String, i128)>> {
    let mut rewards: BTreeMap<String, i128> = BTreeMap::new();

    for entry in positions {
        if entry.position.pool_id != pool_id {
            continue;
        }
        for coin in entry
            .claimable_spread_rewards
            .iter()
            .chain(entry.claimable_incentives.iter())
        {
            let amount = parse_raw(&coin.amount, "claimable reward amount")?;
            *rewards.entry(coin.denom.clone()).or_default() += amount;
        }
    }

    Ok(rewards.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(denom: &str, amount: &str) -> Coin {
        Coin {
            denom: denom.to_string(),
            amount: amount.to_string(),
        }
    }

    fn entry(pool_id: &str, asset0: Coin, asset1: Coin, spread: Vec<Coin>, incentives: Vec<Coin>) -> PositionEntry {
        PositionEntry {
            position: PositionInfo {
                pool_id: pool_id.to_string(),
            },
            asset0,
            asset1,
            claimable_spread_rewards: spread,
            claimable_incentives: incentives,
        }
    }

    #[test]
    fn balances_sum_across_positions_of_the_pool() {
        let positions = vec![
            entry("1400", coin("uosmo", "100"), coin("uatom", "50"), vec![], vec![]),
            entry("1400", coin("uosmo", "25"), coin("uatom", "10"), vec![], vec![]),
            // different pool, must be ignored
            entry("7", coin("uosmo", "999"), coin("uatom", "999"), vec![], vec![]),
        ];

        let balances = sum_position_balances(&positions, "1400").unwrap();
        assert_eq!(
            balances,
            vec![("uatom".to_string(), 60), ("uosmo".to_string(), 125)]
        );
    }

    #[test]
    fn rewards_combine_spread_and_incentives() {
        let positions = vec![entry(
            "1400",
            coin("uosmo", "1"),
            coin("uatom", "1"),
            vec![coin("uosmo", "10")],
            vec![coin("uosmo", "5"), coin("uatom", "3")],
        )];

        let rewards = sum_position_rewards(&positions, "1400").unwrap();
        assert_eq!(
            rewards,
            vec![("uatom".to_string(), 3), ("uosmo".to_string(), 15)]
        );
    }

    #[test]
    fn malformed_amount_is_an_error() {
        let positions = vec![entry(
            "1400",
            coin("uosmo", "not-a-number"),
            coin("uatom", "1"),
            vec![],
            vec![],
        )];
        assert!(sum_position_balances(&positions, "1400").is_err());
    }
}
