use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub registry: RegistryConfig,
    pub prices: PricesConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistryConfig {
    /// Primary per-chain asset registry; `{chain}` is substituted
    pub chain_url: String,
    /// Cross-chain fallback registry (one payload covers all chains)
    pub fallback_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PricesConfig {
    /// Batched spot price feed base URL
    pub feed_url: String,
    /// Time-series chart feed base URL (nearest-match historical path)
    pub chart_url: String,
    /// Bearer token for the chart feed
    #[serde(default)]
    pub chart_api_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("registry.chain_url", "https://chains.cosmos.directory/{chain}")?
            .set_default("registry.fallback_url", "https://api.skip.build/v2/fungible/assets")?
            .set_default("prices.feed_url", "https://api.coingecko.com/api/v3")?
            .set_default("prices.chart_url", "https://osmosis.numia.xyz/tokens/v2")?
            .set_default("prices.chart_api_token", "")?
            .set_default("http.timeout_seconds", 30)?
            // Load from config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (VANTAGE__SERVER__HOST, etc.)
            // Using double underscore as separator to handle nested keys with underscores
            .add_source(
                Environment::with_prefix("VANTAGE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
