//! Token metadata resolution
//!
//! Each chain's catalog is merged from two sources: the chain's own
//! asset registry (primary, always wins) and a cross-chain fallback
//! registry shared by every chain and refreshed under its own TTL
//! (secondary, fills gaps). Denoms absent from both fail lookup
//! explicitly - there is no silent zero-decimals default.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use vantage_core::{TokenInfo, ValuationError, ValuationResult};

use crate::config::RegistryConfig;
use crate::query::ChainClient;

const FALLBACK_REGISTRY_TTL: Duration = Duration::from_secs(30 * 60);

// ============================================================================
// Upstream response shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct PrimaryRegistryResponse {
    chain: PrimaryChain,
}

#[derive(Debug, Deserialize)]
struct PrimaryChain {
    chain_id: String,
    #[serde(default)]
    assets: Vec<PrimaryAsset>,
    #[serde(default)]
    prices: Option<PrimaryPrices>,
}

#[derive(Debug, Deserialize)]
struct PrimaryAsset {
    denom: String,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    decimals: Option<u32>,
    #[serde(default)]
    coingecko_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PrimaryPrices {
    #[serde(default)]
    coingecko: HashMap<String, PriceEntry>,
}

#[derive(Debug, Deserialize)]
struct PriceEntry {
    usd: Decimal,
}

#[derive(Debug, Deserialize)]
struct FallbackRegistryResponse {
    chain_to_assets_map: HashMap<String, FallbackChainAssets>,
}

#[derive(Debug, Deserialize)]
struct FallbackChainAssets {
    assets: Vec<FallbackAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FallbackAsset {
    pub denom: String,
    #[serde(default)]
    pub decimals: Option<u32>,
    #[serde(default)]
    pub coingecko_id: Option<String>,
    #[serde(default)]
    pub recommended_symbol: Option<String>,
}

// ============================================================================
// Catalog
// ============================================================================

/// Per-chain denom -> TokenInfo table, immutable once built.
#[derive(Debug, Clone)]
pub struct TokenCatalog {
    chain_id: String,
    tokens: HashMap<String, TokenInfo>,
    /// Spot prices the primary registry embeds, keyed by lowercased
    /// symbol; second strategy in the price fallback chain
    registry_prices: HashMap<String, Decimal>,
}

impl TokenCatalog {
    pub fn from_parts(
        chain_id: impl Into<String>,
        tokens: HashMap<String, TokenInfo>,
        registry_prices: HashMap<String, Decimal>,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            tokens,
            registry_prices,
        }
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn lookup(&self, denom: &str) -> ValuationResult<&TokenInfo> {
        self.tokens
            .get(denom)
            .ok_or_else(|| ValuationError::TokenNotFound(denom.to_string()))
    }

    pub fn registry_price(&self, symbol: &str) -> Option<Decimal> {
        self.registry_prices.get(&symbol.to_lowercase()).copied()
    }
}

/// Merges primary-registry tokens with fallback-registry entries;
/// primary entries always win, fallback only fills absent denoms.
fn merge_tokens(
    mut primary: HashMap<String, TokenInfo>,
    fallback: &HashMap<String, FallbackAsset>,
) -> HashMap<String, TokenInfo> {
    for (denom, asset) in fallback {
        if primary.contains_key(denom) {
            continue;
        }
        primary.insert(
            denom.clone(),
            TokenInfo {
                denom: denom.clone(),
                display_name: asset.recommended_symbol.clone(),
                decimals: asset.decimals.unwrap_or(0),
                price_source_id: non_empty(asset.coingecko_id.clone()),
            },
        );
    }
    primary
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.is_empty())
}

// ============================================================================
// Registry client
// ============================================================================

struct FallbackSnapshot {
    /// chain_id -> denom -> asset
    assets: HashMap<String, HashMap<String, FallbackAsset>>,
    fetched_at: Instant,
}

/// Fetches and caches asset registries; builds per-chain catalogs.
pub struct AssetRegistry {
    chain: ChainClient,
    chain_url: String,
    fallback_url: String,
    fallback: RwLock<Option<FallbackSnapshot>>,
}

impl AssetRegistry {
    pub fn new(config: &RegistryConfig, chain: ChainClient) -> Self {
        Self {
            chain,
            chain_url: config.chain_url.clone(),
            fallback_url: config.fallback_url.clone(),
            fallback: RwLock::new(None),
        }
    }

    /// Resolves the full token catalog for one chain. The primary
    /// registry is fatal on failure; the fallback registry is not.
    pub async fn catalog(&self, chain: &str) -> ValuationResult<TokenCatalog> {
        let url = self.chain_url.replace("{chain}", chain);
        let primary: PrimaryRegistryResponse = self.chain.get_json(&url).await?;

        let chain_id = primary.chain.chain_id;
        let mut tokens = HashMap::new();
        for asset in primary.chain.assets {
            tokens.insert(
                asset.denom.clone(),
                TokenInfo {
                    denom: asset.denom,
                    display_name: asset.symbol,
                    decimals: asset.decimals.unwrap_or(0),
                    price_source_id: non_empty(asset.coingecko_id),
                },
            );
        }

        let registry_prices = primary
            .chain
            .prices
            .map(|p| {
                p.coingecko
                    .into_iter()
                    .map(|(symbol, entry)| (symbol.to_lowercase(), entry.usd))
                    .collect()
            })
            .unwrap_or_default();

        // supplement with the fallback registry; a failure here leaves
        // the catalog usable with primary data only
        if let Err(e) = self.refresh_fallback_if_stale().await {
            tracing::warn!(error = %e, chain = %chain_id, "Fallback registry unavailable");
        }

        let guard = self.fallback.read().await;
        if let Some(snapshot) = guard.as_ref() {
            if let Some(chain_assets) = snapshot.assets.get(&chain_id) {
                tokens = merge_tokens(tokens, chain_assets);
            }
        }

        tracing::debug!(
            chain = %chain_id,
            token_count = tokens.len(),
            "Token catalog resolved"
        );

        Ok(TokenCatalog {
            chain_id,
            tokens,
            registry_prices,
        })
    }

    /// Refreshes the shared fallback snapshot when it is older than its
    /// TTL. Concurrent callers may refresh redundantly; the refresh is
    /// idempotent and the later write wins.
    pub async fn refresh_fallback_if_stale(&self) -> ValuationResult<()> {
        {
            let guard = self.fallback.read().await;
            if let Some(snapshot) = guard.as_ref() {
                if snapshot.fetched_at.elapsed() < FALLBACK_REGISTRY_TTL {
                    return Ok(());
                }
            }
        }

        let response: FallbackRegistryResponse = self.chain.get_json(&self.fallback_url).await?;

        let mut assets: HashMap<String, HashMap<String, FallbackAsset>> = HashMap::new();
        for (chain_id, chain_assets) in response.chain_to_assets_map {
            let entry = assets.entry(chain_id).or_default();
            for asset in chain_assets.assets {
                entry.insert(asset.denom.clone(), asset);
            }
        }

        tracing::debug!(chain_count = assets.len(), "Fallback registry refreshed");

        *self.fallback.write().await = Some(FallbackSnapshot {
            assets,
            fetched_at: Instant::now(),
        });

        Ok(())
    }

    /// The distinct price-source ids across every chain of the fallback
    /// snapshot; the id set for one bulk price refresh.
    pub async fn known_price_ids(&self) -> Vec<String> {
        let guard = self.fallback.read().await;
        let Some(snapshot) = guard.as_ref() else {
            return Vec::new();
        };

        let mut ids: Vec<String> = snapshot
            .assets
            .values()
            .flat_map(|chain| chain.values())
            .filter_map(|asset| non_empty(asset.coingecko_id.clone()))
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primary_token(denom: &str, decimals: u32) -> TokenInfo {
        TokenInfo {
            denom: denom.to_string(),
            display_name: Some("PRIMARY".to_string()),
            decimals,
            price_source_id: Some("primary-id".to_string()),
        }
    }

    fn fallback_asset(denom: &str, decimals: u32) -> FallbackAsset {
        FallbackAsset {
            denom: denom.to_string(),
            decimals: Some(decimals),
            coingecko_id: Some("fallback-id".to_string()),
            recommended_symbol: Some("FALLBACK".to_string()),
        }
    }

    #[test]
    fn merge_prefers_primary_on_conflict() {
        let mut primary = HashMap::new();
        primary.insert("uatom".to_string(), primary_token("uatom", 6));

        let mut fallback = HashMap::new();
        // conflicting decimals on purpose
        fallback.insert("uatom".to_string(), fallback_asset("uatom", 18));

        let merged = merge_tokens(primary, &fallback);
        let info = merged.get("uatom").unwrap();
        assert_eq!(info.decimals, 6);
        assert_eq!(info.display_name.as_deref(), Some("PRIMARY"));
    }

    #[test]
    fn merge_fills_gaps_from_fallback() {
        let mut primary = HashMap::new();
        primary.insert("uatom".to_string(), primary_token("uatom", 6));

        let mut fallback = HashMap::new();
        fallback.insert("uosmo".to_string(), fallback_asset("uosmo", 6));

        let merged = merge_tokens(primary, &fallback);
        assert_eq!(merged.len(), 2);
        let filled = merged.get("uosmo").unwrap();
        assert_eq!(filled.display_name.as_deref(), Some("FALLBACK"));
        assert_eq!(filled.price_source_id.as_deref(), Some("fallback-id"));
    }

    #[test]
    fn lookup_fails_for_unknown_denom() {
        let catalog = TokenCatalog::from_parts("test-1", HashMap::new(), HashMap::new());
        let err = catalog.lookup("unknown").unwrap_err();
        assert!(matches!(err, ValuationError::TokenNotFound(_)));
    }

    #[test]
    fn registry_price_is_case_insensitive() {
        let mut prices = HashMap::new();
        prices.insert("atom".to_string(), Decimal::from(10));
        let catalog = TokenCatalog::from_parts("test-1", HashMap::new(), prices);
        assert_eq!(catalog.registry_price("ATOM"), Some(Decimal::from(10)));
        assert_eq!(catalog.registry_price("osmo"), None);
    }

    #[test]
    fn empty_coingecko_ids_are_dropped() {
        let asset = FallbackAsset {
            denom: "untrn".to_string(),
            decimals: Some(6),
            coingecko_id: Some(String::new()),
            recommended_symbol: None,
        };
        let mut fallback = HashMap::new();
        fallback.insert("untrn".to_string(), asset);

        let merged = merge_tokens(HashMap::new(), &fallback);
        assert_eq!(merged.get("untrn").unwrap().price_source_id, None);
    }
}
