//! Astroport pair pools
//!
//! TVL is the pair contract's own `pool` reserves. Principal takes the
//! two-step LP route: wallet LP balance (bank) plus staked LP
//! (incentives `deposit`), then a `simulate_withdraw` on the pair
//! converts the combined share amount into underlying assets at the
//! pool's current ratio. Rewards come from the incentives contract; an
//! error reply saying the user has no rewards is a normal empty result.

use serde::Deserialize;
use serde_json::json;

use vantage_core::{Holdings, ValuationError, ValuationResult};

use super::{parse_raw, value_coins, MissingAssetPolicy, ValuationContext};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum AssetInfo {
    NativeToken { denom: String },
    Token { contract_addr: String },
}

impl AssetInfo {
    fn denom(&self) -> &str {
        match self {
            AssetInfo::NativeToken { denom } => denom,
            AssetInfo::Token { contract_addr } => contract_addr,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PairAsset {
    info: AssetInfo,
    amount: String,
}

#[derive(Debug, Deserialize)]
struct PoolResponse {
    assets: Vec<PairAsset>,
}

#[derive(Debug, Deserialize)]
struct PairResponse {
    liquidity_token: String,
}

#[derive(Debug, Deserialize)]
struct RewardsResponse {
    rewards: Vec<PairAsset>,
}

pub struct AstroportPosition {
    pool_address: String,
    incentive_address: String,
    address: String,
}

impl AstroportPosition {
    pub fn new(pool_address: String, incentive_address: String, address: String) -> Self {
        Self {
            pool_address,
            incentive_address,
            address,
        }
    }

    pub async fn venue_tvl(&self, ctx: &ValuationContext<'_>) -> ValuationResult<Holdings> {
        let pool: PoolResponse = ctx
            .chain
            .smart_query(ctx.lcd, &self.pool_address, &json!({"pool": {}}))
            .await?;

        let coins = collect_pair_assets(&pool.assets)?;
        value_coins(ctx.prices, ctx.catalog, &coins, MissingAssetPolicy::Fail).await
    }

    pub async fn address_principal(&self, ctx: &ValuationContext<'_>) -> ValuationResult<Holdings> {
        // 1. pair info names the LP token denom
        let pair: PairResponse = ctx
            .chain
            .smart_query(ctx.lcd, &self.pool_address, &json!({"pair": {}}))
            .await?;

        // 2. unstaked LP sits in the wallet
        let balances = ctx.chain.bank_balances(ctx.lcd, &self.address).await?;
        let wallet_lp = balances
            .iter()
            .find(|coin| coin.denom == pair.liquidity_token)
            .map(|coin| parse_raw(&coin.amount, "LP bank balance"))
            .transpose()?
            .unwrap_or(0);

        // 3. staked LP sits in the incentives contract
        let staked: String = ctx
            .chain
            .smart_query(
                ctx.lcd,
                &self.incentive_address,
                &json!({
                    "deposit": {
                        "lp_token": pair.liquidity_token,
                        "user": self.address,
                    }
                }),
            )
            .await?;
        let staked_lp = parse_raw(&staked, "staked LP deposit")?;

        // 4. the pool converts combined shares into underlying amounts
        let withdrawn: Vec<PairAsset> = ctx
            .chain
            .smart_query(
                ctx.lcd,
                &self.pool_address,
                &json!({
                    "simulate_withdraw": {
                        "lp_amount": (wallet_lp + staked_lp).to_string(),
                    }
                }),
            )
            .await?;

        let coins = collect_pair_assets(&withdrawn)?;
        value_coins(ctx.prices, ctx.catalog, &coins, MissingAssetPolicy::Fail).await
    }

    pub async fn address_rewards(&self, ctx: &ValuationContext<'_>) -> ValuationResult<Holdings> {
        let response: Result<RewardsResponse, _> = ctx
            .chain
            .smart_query(
                ctx.lcd,
                &self.incentive_address,
                &json!({"rewards": {"address": self.address}}),
            )
            .await;

        let rewards = match response {
            Ok(r) => r.rewards,
            // the incentives contract answers with an error when the
            // address has nothing accrued; that is an empty result, not
            // a failure
            Err(ValuationError::Upstream(msg)) if is_no_rewards_error(&msg) => {
                return Ok(Holdings::empty());
            }
            Err(e) => return Err(e),
        };

        let coins = collect_pair_assets(&rewards)?;
        value_coins(ctx.prices, ctx.catalog, &coins, MissingAssetPolicy::Fail).await
    }
}

fn collect_pair_assets(assets: &[PairAsset]) -> ValuationResult<Vec<(String, i128)>> {
    assets
        .iter()
        .map(|asset| {
            Ok((
                asset.info.denom().to_string(),
                parse_raw(&asset.amount, "pair asset amount")?,
            ))
        })
        .collect()
}

fn is_no_rewards_error(message: &str) -> bool {
    message.to_lowercase().contains("no rewards")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn native(denom: &str, amount: &str) -> PairAsset {
        PairAsset {
            info: AssetInfo::NativeToken {
                denom: denom.to_string(),
            },
            amount: amount.to_string(),
        }
    }

    #[test]
    fn pair_assets_collect_native_and_cw20() {
        let assets = vec![
            native("untrn", "1000"),
            PairAsset {
                info: AssetInfo::Token {
                    contract_addr: "neutron1cw20".to_string(),
                },
                amount: "500".to_string(),
            },
        ];

        let coins = collect_pair_assets(&assets).unwrap();
        assert_eq!(
            coins,
            vec![
                ("untrn".to_string(), 1000),
                ("neutron1cw20".to_string(), 500)
            ]
        );
    }

    #[test]
    fn no_rewards_error_is_recognized() {
        assert!(is_no_rewards_error(
            "wasm query failed: Generic error: No rewards to claim"
        ));
        assert!(!is_no_rewards_error("wasm query failed: contract paused"));
    }

    #[test]
    fn asset_info_decodes_both_variants() {
        let native: PairAsset =
            serde_json::from_str(r#"{"info":{"native_token":{"denom":"untrn"}},"amount":"1"}"#)
                .unwrap();
        assert_eq!(native.info.denom(), "untrn");

        let cw20: PairAsset =
            serde_json::from_str(r#"{"info":{"token":{"contract_addr":"neutron1abc"}},"amount":"2"}"#)
                .unwrap();
        assert_eq!(cw20.info.denom(), "neutron1abc");
    }
}
