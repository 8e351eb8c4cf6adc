//! Price resolution
//!
//! Spot prices come from one TTL-cached snapshot populated by a single
//! batched upstream call over every price-source id the fallback
//! registry knows. Historical prices come from two paths: a day-granular
//! endpoint backed by an append-only cache (a past day's price never
//! changes), and a time-series chart endpoint where the nearest point to
//! the requested timestamp wins.

use chrono::DateTime;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use vantage_core::{Asset, Holdings, TokenInfo, ValuationError, ValuationResult};

use crate::config::PricesConfig;
use crate::registry::{AssetRegistry, TokenCatalog};

/// Price-source id of the reference asset (ATOM)
pub const REFERENCE_PRICE_ID: &str = "cosmos";

const PRICE_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

// ============================================================================
// Upstream response shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    market_data: Option<MarketData>,
}

#[derive(Debug, Deserialize)]
struct MarketData {
    current_price: HashMap<String, Decimal>,
}

/// One OHLCV point of the chart feed
#[derive(Debug, Clone, Deserialize)]
pub struct ChartPoint {
    pub time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

// ============================================================================
// Caches
// ============================================================================

struct PriceSnapshot {
    prices: HashMap<String, Decimal>,
    fetched_at: Instant,
}

impl PriceSnapshot {
    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < PRICE_CACHE_TTL
    }
}

/// Append-only (id, calendar date) -> USD price map. Entries never
/// expire: a historical day's price is immutable once fetched.
#[derive(Default)]
struct HistoricalPriceCache {
    prices: HashMap<(String, String), Decimal>,
}

impl HistoricalPriceCache {
    fn get(&self, id: &str, date: &str) -> Option<Decimal> {
        self.prices.get(&(id.to_string(), date.to_string())).copied()
    }

    fn insert(&mut self, id: String, date: String, price: Decimal) {
        self.prices.insert((id, date), price);
    }
}

// ============================================================================
// Resolution strategies
// ============================================================================

/// Outcome of one resolution strategy: found a price, knows nothing
/// about the asset, or failed trying.
enum Resolution {
    Found(Decimal),
    NotFound,
    Failed(ValuationError),
}

/// Ordered strategy list for spot prices. The batched feed is the
/// primary source; the primary registry's embedded prices fill gaps.
const PRICE_STRATEGIES: [PriceStrategy; 2] = [PriceStrategy::Feed, PriceStrategy::Registry];

#[derive(Debug, Clone, Copy)]
enum PriceStrategy {
    Feed,
    Registry,
}

// ============================================================================
// Resolver
// ============================================================================

pub struct PriceResolver {
    client: Client,
    feed_url: String,
    chart_url: String,
    chart_api_token: String,
    registry: Arc<AssetRegistry>,
    snapshot: RwLock<Option<PriceSnapshot>>,
    historical: RwLock<HistoricalPriceCache>,
}

impl PriceResolver {
    pub fn new(config: &PricesConfig, timeout: Duration, registry: Arc<AssetRegistry>) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            feed_url: config.feed_url.clone(),
            chart_url: config.chart_url.clone(),
            chart_api_token: config.chart_api_token.clone(),
            registry,
            snapshot: RwLock::new(None),
            historical: RwLock::new(HistoricalPriceCache::default()),
        }
    }

    /// Current USD price for one price-source id.
    ///
    /// A fresh snapshot answers directly - including a miss, which is
    /// `PriceNotFound` without a refresh. A stale or absent snapshot
    /// triggers exactly one bulk refresh before the lookup.
    pub async fn current_price(&self, id: &str) -> ValuationResult<Decimal> {
        {
            let guard = self.snapshot.read().await;
            if let Some(snapshot) = guard.as_ref() {
                if snapshot.is_fresh() {
                    return snapshot
                        .prices
                        .get(id)
                        .copied()
                        .ok_or_else(|| ValuationError::PriceNotFound(id.to_string()));
                }
            }
        }

        self.refresh_all().await?;

        let guard = self.snapshot.read().await;
        guard
            .as_ref()
            .and_then(|snapshot| snapshot.prices.get(id).copied())
            .ok_or_else(|| ValuationError::PriceNotFound(id.to_string()))
    }

    /// Current USD price of the reference asset (ATOM).
    pub async fn reference_price(&self) -> ValuationResult<Decimal> {
        self.current_price(REFERENCE_PRICE_ID).await
    }

    /// One batched round trip for every known price-source id, replacing
    /// the snapshot atomically. Concurrent refreshes may duplicate the
    /// call; the later write wins.
    async fn refresh_all(&self) -> ValuationResult<()> {
        if let Err(e) = self.registry.refresh_fallback_if_stale().await {
            tracing::warn!(error = %e, "Fallback registry refresh failed before price refresh");
        }

        let ids = self.registry.known_price_ids().await;
        if ids.is_empty() {
            return Err(ValuationError::upstream(
                "no price-source ids known; fallback registry never resolved",
            ));
        }

        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd",
            self.feed_url,
            ids.join(",")
        );

        tracing::debug!(coin_count = ids.len(), "Refreshing price cache");

        let response: HashMap<String, HashMap<String, Decimal>> = self.get_json(&url).await?;

        let prices: HashMap<String, Decimal> = response
            .into_iter()
            .filter_map(|(id, quote)| quote.get("usd").copied().map(|usd| (id, usd)))
            .collect();

        tracing::debug!(prices_cached = prices.len(), "Price cache refreshed");

        *self.snapshot.write().await = Some(PriceSnapshot {
            prices,
            fetched_at: Instant::now(),
        });

        Ok(())
    }

    /// Resolves a token's spot price through the ordered strategy list:
    /// first `Found` wins, `NotFound` falls through, a failure aborts.
    pub async fn price_for(
        &self,
        info: &TokenInfo,
        catalog: &TokenCatalog,
    ) -> ValuationResult<Decimal> {
        for strategy in PRICE_STRATEGIES {
            match self.resolve_with(strategy, info, catalog).await {
                Resolution::Found(price) => return Ok(price),
                Resolution::NotFound => continue,
                Resolution::Failed(e) => return Err(e),
            }
        }

        Err(ValuationError::PriceNotFound(info.denom.clone()))
    }

    async fn resolve_with(
        &self,
        strategy: PriceStrategy,
        info: &TokenInfo,
        catalog: &TokenCatalog,
    ) -> Resolution {
        match strategy {
            PriceStrategy::Feed => {
                let Some(id) = info.price_source_id.as_deref() else {
                    return Resolution::NotFound;
                };
                match self.current_price(id).await {
                    Ok(price) => Resolution::Found(price),
                    Err(ValuationError::PriceNotFound(_)) => Resolution::NotFound,
                    Err(e) => Resolution::Failed(e),
                }
            }
            PriceStrategy::Registry => {
                let Some(symbol) = info.display_name.as_deref() else {
                    return Resolution::NotFound;
                };
                match catalog.registry_price(symbol) {
                    Some(price) => Resolution::Found(price),
                    None => Resolution::NotFound,
                }
            }
        }
    }

    /// USD and reference-asset values of a decimal-adjusted token
    /// amount. Fails rather than dividing by a zero or unresolved
    /// reference price.
    pub async fn token_values(
        &self,
        adjusted_amount: Decimal,
        info: &TokenInfo,
        catalog: &TokenCatalog,
    ) -> ValuationResult<(Decimal, Decimal)> {
        let price = self.price_for(info, catalog).await?;
        let usd_value = adjusted_amount * price;

        let reference = self.reference_price().await?;
        if reference <= Decimal::ZERO {
            return Err(ValuationError::ReferencePriceUnavailable);
        }

        Ok((usd_value, usd_value / reference))
    }

    /// Historical USD price by calendar date (the feed is day-granular).
    /// Results are cached permanently.
    pub async fn historical_price(&self, id: &str, timestamp: i64) -> ValuationResult<Decimal> {
        let date = date_key(timestamp)?;

        {
            let guard = self.historical.read().await;
            if let Some(price) = guard.get(id, &date) {
                return Ok(price);
            }
        }

        let url = format!("{}/coins/{}/history?date={}", self.feed_url, id, date);
        let response: HistoryResponse = self.get_json(&url).await?;

        let price = response
            .market_data
            .and_then(|m| m.current_price.get("usd").copied())
            .ok_or_else(|| ValuationError::PriceNotFound(format!("{id} on {date}")))?;

        self.historical
            .write()
            .await
            .insert(id.to_string(), date, price);

        Ok(price)
    }

    /// Historical USD price from the time-series chart feed: the point
    /// with the smallest absolute distance to the target timestamp wins,
    /// first-seen on ties. Keyed by denom, not price-source id, and not
    /// day-cached.
    pub async fn nearest_chart_price(&self, denom: &str, timestamp: i64) -> ValuationResult<Decimal> {
        // IBC denoms carry a slash that must not split the path
        let encoded = denom.replacen("ibc/", "ibc%2F", 1);
        let url = format!("{}/historical/{}/chart", self.chart_url, encoded);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.chart_api_token)
            .send()
            .await
            .map_err(|e| ValuationError::upstream(format!("fetching chart for {denom}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ValuationError::upstream(format!(
                "chart feed returned status {} for {denom}",
                status.as_u16()
            )));
        }

        let points: Vec<ChartPoint> = response
            .json()
            .await
            .map_err(|e| ValuationError::malformed(format!("chart response: {e}")))?;

        closest_point(&points, timestamp)
            .map(|point| point.close)
            .ok_or_else(|| {
                ValuationError::PriceNotFound(format!(
                    "no historical price data for {denom} at {timestamp}"
                ))
            })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> ValuationResult<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ValuationError::upstream(format!("fetching {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ValuationError::upstream(format!(
                "{url} returned status {}",
                status.as_u16()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ValuationError::malformed(format!("response body: {e}")))
    }

    #[cfg(test)]
    pub(crate) fn seeded(prices: Vec<(&str, Decimal)>) -> Self {
        use crate::config::RegistryConfig;
        use crate::query::ChainClient;

        // Unroutable endpoints: any attempted network call fails fast,
        // which is exactly what cache-hit tests rely on.
        let registry = Arc::new(AssetRegistry::new(
            &RegistryConfig {
                chain_url: "http://127.0.0.1:1/{chain}".to_string(),
                fallback_url: "http://127.0.0.1:1/assets".to_string(),
            },
            ChainClient::new(Duration::from_millis(250)),
        ));

        let resolver = Self::new(
            &PricesConfig {
                feed_url: "http://127.0.0.1:1".to_string(),
                chart_url: "http://127.0.0.1:1".to_string(),
                chart_api_token: String::new(),
            },
            Duration::from_millis(250),
            registry,
        );

        let snapshot = PriceSnapshot {
            prices: prices
                .into_iter()
                .map(|(id, price)| (id.to_string(), price))
                .collect(),
            fetched_at: Instant::now(),
        };
        *resolver.snapshot.try_write().expect("fresh lock") = Some(snapshot);

        resolver
    }
}

/// Values one decimal-adjusted amount of one token into an [`Asset`].
pub async fn value_asset(
    prices: &PriceResolver,
    catalog: &TokenCatalog,
    info: &TokenInfo,
    adjusted_amount: Decimal,
) -> ValuationResult<Asset> {
    let price = prices.price_for(info, catalog).await?;

    Ok(Asset {
        denom: info.denom.clone(),
        amount: adjusted_amount,
        usd_value: adjusted_amount * price,
        display_name: info.display_name.clone(),
    })
}

/// Builds holdings from valued assets using the current reference price.
pub async fn holdings_from_assets(
    prices: &PriceResolver,
    assets: Vec<Asset>,
) -> ValuationResult<Holdings> {
    let reference = prices.reference_price().await?;
    Holdings::from_assets(assets, reference)
}

fn date_key(timestamp: i64) -> ValuationResult<String> {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%d-%m-%Y").to_string())
        .ok_or_else(|| ValuationError::malformed(format!("timestamp out of range: {timestamp}")))
}

fn closest_point(points: &[ChartPoint], target: i64) -> Option<&ChartPoint> {
    let mut best: Option<(&ChartPoint, i64)> = None;

    for point in points {
        let diff = (point.time - target).abs();
        match best {
            // strict comparison keeps the first-seen point on ties
            Some((_, best_diff)) if diff >= best_diff => {}
            _ => best = Some((point, diff)),
        }
    }

    best.map(|(point, _)| point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn point(time: i64, close: Decimal) -> ChartPoint {
        ChartPoint {
            time,
            open: close,
            high: close,
            low: close,
            close,
            volume: Decimal::ZERO,
        }
    }

    #[test]
    fn closest_point_picks_smallest_distance() {
        let points = vec![point(100, dec!(1)), point(200, dec!(2)), point(400, dec!(4))];
        let chosen = closest_point(&points, 250).unwrap();
        assert_eq!(chosen.time, 200);
    }

    #[test]
    fn closest_point_keeps_first_seen_on_tie() {
        let points = vec![point(100, dec!(1)), point(300, dec!(3))];
        // 200 is equidistant from both; the first-seen point wins
        let chosen = closest_point(&points, 200).unwrap();
        assert_eq!(chosen.time, 100);
    }

    #[test]
    fn closest_point_empty_is_none() {
        assert!(closest_point(&[], 42).is_none());
    }

    #[test]
    fn date_key_is_day_granular() {
        // 2021-06-01T13:45:00Z
        assert_eq!(date_key(1622555100).unwrap(), "01-06-2021");
    }

    #[test]
    fn fresh_snapshot_serves_without_upstream_call() {
        let resolver = PriceResolver::seeded(vec![("cosmos", dec!(10))]);
        // every configured endpoint is unroutable: an Ok here proves the
        // snapshot answered without a second upstream call
        let price = tokio_test::block_on(resolver.current_price("cosmos")).unwrap();
        assert_eq!(price, dec!(10));
    }

    #[test]
    fn fresh_snapshot_miss_is_not_found_without_refresh() {
        let resolver = PriceResolver::seeded(vec![("cosmos", dec!(10))]);
        // a refresh attempt would surface Upstream (unroutable feed);
        // PriceNotFound proves the fresh snapshot answered the miss
        let err = tokio_test::block_on(resolver.current_price("osmosis")).unwrap_err();
        assert!(matches!(err, ValuationError::PriceNotFound(_)));
    }

    #[test]
    fn historical_cache_is_append_only() {
        let mut cache = HistoricalPriceCache::default();
        cache.insert("cosmos".to_string(), "01-06-2021".to_string(), dec!(10));

        assert_eq!(cache.get("cosmos", "01-06-2021"), Some(dec!(10)));
        assert_eq!(cache.get("cosmos", "02-06-2021"), None);
        assert_eq!(cache.get("osmosis", "01-06-2021"), None);
    }

    #[test]
    fn cached_historical_price_skips_the_network() {
        let resolver = PriceResolver::seeded(vec![]);
        tokio_test::block_on(async {
            resolver.historical.write().await.insert(
                "cosmos".to_string(),
                "01-06-2021".to_string(),
                dec!(10),
            );
            // feed is unroutable; a hit must come from the cache
            let price = resolver.historical_price("cosmos", 1622555100).await.unwrap();
            assert_eq!(price, dec!(10));
        });
    }

    #[test]
    fn token_values_divides_by_reference_price() {
        let resolver = PriceResolver::seeded(vec![("cosmos", dec!(10)), ("osmosis", dec!(2))]);
        let catalog = TokenCatalog::from_parts(
            "osmosis-1",
            std::collections::HashMap::new(),
            std::collections::HashMap::new(),
        );
        let info = TokenInfo {
            denom: "uosmo".to_string(),
            display_name: Some("OSMO".to_string()),
            decimals: 6,
            price_source_id: Some("osmosis".to_string()),
        };

        let (usd, atom) =
            tokio_test::block_on(resolver.token_values(dec!(100), &info, &catalog)).unwrap();
        assert_eq!(usd, dec!(200));
        assert_eq!(atom, dec!(20));
    }

    #[test]
    fn price_falls_back_to_registry_embedded_quote() {
        let resolver = PriceResolver::seeded(vec![("cosmos", dec!(10))]);
        let mut registry_prices = std::collections::HashMap::new();
        registry_prices.insert("ntrn".to_string(), dec!(0.5));
        let catalog = TokenCatalog::from_parts(
            "neutron-1",
            std::collections::HashMap::new(),
            registry_prices,
        );
        // no price-source id and no feed entry: only the registry quote
        // can answer
        let info = TokenInfo {
            denom: "untrn".to_string(),
            display_name: Some("NTRN".to_string()),
            decimals: 6,
            price_source_id: None,
        };

        let price = tokio_test::block_on(resolver.price_for(&info, &catalog)).unwrap();
        assert_eq!(price, dec!(0.5));
    }

    #[test]
    fn unknown_token_price_is_not_found() {
        let resolver = PriceResolver::seeded(vec![("cosmos", dec!(10))]);
        let catalog = TokenCatalog::from_parts(
            "osmosis-1",
            std::collections::HashMap::new(),
            std::collections::HashMap::new(),
        );
        let info = TokenInfo {
            denom: "factory/obscure".to_string(),
            display_name: None,
            decimals: 6,
            price_source_id: None,
        };

        let err = tokio_test::block_on(resolver.price_for(&info, &catalog)).unwrap_err();
        assert!(matches!(err, ValuationError::PriceNotFound(_)));
    }
}
