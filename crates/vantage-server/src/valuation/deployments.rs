//! Standalone vault deployments
//!
//! Deployments are single-address vault positions tracked outside the
//! bid tables. Current holdings come from the vault's share accounting
//! (holder shares over total supply, applied to the vault balances);
//! initial holdings are the recorded opening balances revalued at the
//! deployment's start timestamp through the time-series price path.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;

use vantage_core::{adjust_decimal_amount, Asset, Holdings, ValuationError, ValuationResult};

use crate::prices::{holdings_from_assets, PriceResolver};
use crate::query::ChainClient;
use crate::registry::TokenCatalog;

use super::protocols::parse_decimal;

/// ATOM's denom on Osmosis; the reference price for revaluing initial
/// balances comes from its chart series.
const OSMOSIS_ATOM_DENOM: &str =
    "ibc/27394FB092D2ECCD56123C74F36E4C1F926001CEADA9CA97EA622B25F41E5EB2";

#[derive(Debug, Clone)]
pub struct DeploymentConfig {
    pub deployment_id: u32,
    pub name: &'static str,
    pub description: &'static str,
    pub start_timestamp: i64,
    pub end_timestamp: Option<i64>,
    pub chain: &'static str,
    pub lcd: &'static str,
    pub vault: VaultConfig,
    /// Opening balances in human units, revalued at start_timestamp
    pub initial_balances: Vec<(String, Decimal)>,
}

#[derive(Debug, Clone)]
pub struct VaultConfig {
    pub holder_address: String,
    pub vault_address: String,
    pub token0_denom: String,
    pub token1_denom: String,
}

#[derive(Debug, Serialize)]
pub struct DeploymentResponse {
    pub deployment_id: u32,
    pub name: String,
    pub description: String,
    pub start_timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_timestamp: Option<i64>,
    pub initial_holdings: Option<Holdings>,
    pub current_holdings: Option<Holdings>,
}

#[derive(Debug, Deserialize)]
struct ShareBalanceResponse {
    balance: String,
}

#[derive(Debug, Deserialize)]
struct TokenInfoResponse {
    total_supply: String,
}

#[derive(Debug, Deserialize)]
struct VaultBalancesResponse {
    bal0: String,
    bal1: String,
}

/// The holder's share of the vault, valued at current prices.
pub async fn current_vault_holdings(
    chain: &ChainClient,
    prices: &PriceResolver,
    catalog: &TokenCatalog,
    config: &DeploymentConfig,
) -> ValuationResult<Holdings> {
    let vault = &config.vault;

    let share_balance: ShareBalanceResponse = chain
        .smart_query(
            config.lcd,
            &vault.vault_address,
            &json!({"balance": {"address": vault.holder_address}}),
        )
        .await?;

    let token_info: TokenInfoResponse = chain
        .smart_query(config.lcd, &vault.vault_address, &json!({"token_info": {}}))
        .await?;

    let balances: VaultBalancesResponse = chain
        .smart_query(config.lcd, &vault.vault_address, &json!({"vault_balances": {}}))
        .await?;

    let holder_shares = parse_decimal(&share_balance.balance, "vault share balance")?;
    let total_supply = parse_decimal(&token_info.total_supply, "vault total_supply")?;
    if total_supply <= Decimal::ZERO {
        return Err(ValuationError::malformed("vault total_supply: zero"));
    }
    let share_ratio = holder_shares / total_supply;

    let bal0 = parse_decimal(&balances.bal0, "vault bal0")?;
    let bal1 = parse_decimal(&balances.bal1, "vault bal1")?;

    let mut assets = Vec::with_capacity(2);
    for (denom, vault_balance) in [(&vault.token0_denom, bal0), (&vault.token1_denom, bal1)] {
        let info = catalog.lookup(denom)?;
        let adjusted = adjust_decimal_amount(vault_balance * share_ratio, info.decimals)?;
        let price = prices.price_for(info, catalog).await?;

        assets.push(Asset {
            denom: denom.clone(),
            amount: adjusted,
            usd_value: adjusted * price,
            display_name: info.display_name.clone(),
        });
    }

    holdings_from_assets(prices, assets).await
}

/// The recorded opening balances revalued at the deployment's start
/// timestamp. The reference price failing is fatal; a single asset's
/// missing series drops that asset.
pub async fn initial_holdings_at(
    prices: &PriceResolver,
    catalog: &TokenCatalog,
    config: &DeploymentConfig,
) -> ValuationResult<Holdings> {
    let timestamp = config.start_timestamp;

    let atom_price = prices
        .nearest_chart_price(OSMOSIS_ATOM_DENOM, timestamp)
        .await?;
    if atom_price <= Decimal::ZERO {
        return Err(ValuationError::ReferencePriceUnavailable);
    }

    let mut assets = Vec::with_capacity(config.initial_balances.len());
    for (denom, amount) in &config.initial_balances {
        let Ok(info) = catalog.lookup(denom) else {
            tracing::warn!(denom = %denom, "Initial balance denom absent from catalog, skipping");
            continue;
        };

        match prices.nearest_chart_price(denom, timestamp).await {
            Ok(price) => assets.push(Asset {
                denom: denom.clone(),
                amount: *amount,
                usd_value: *amount * price,
                display_name: info.display_name.clone(),
            }),
            Err(e) => {
                tracing::warn!(denom = %denom, error = %e, "No historical price, skipping asset");
                continue;
            }
        }
    }

    Holdings::from_assets(assets, atom_price)
}
