//! Read-only chain access
//!
//! Two kinds of upstream speak JSON at us: CosmWasm smart queries, where
//! the query message travels base64-encoded inside the LCD path and the
//! answer arrives wrapped in `{"data": ...}`, and plain REST/LCD
//! endpoints. Both decode straight into the caller's typed struct; shape
//! mismatches surface as malformed-response errors instead of panics.

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use vantage_core::{ValuationError, ValuationResult};

/// Error body LCD gateways return on failed wasm queries
#[derive(Debug, Deserialize)]
struct WasmError {
    #[allow(dead_code)]
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct SmartQueryResponse<T> {
    data: T,
}

/// One raw bank balance as the LCD reports it
#[derive(Debug, Clone, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
struct BankBalancesResponse {
    balances: Vec<Coin>,
}

/// HTTP client for on-chain reads (smart queries, LCD REST)
#[derive(Clone)]
pub struct ChainClient {
    client: Client,
}

impl ChainClient {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Executes a read-only smart-contract query and decodes the `data`
    /// payload into `T`.
    pub async fn smart_query<T: DeserializeOwned>(
        &self,
        lcd: &str,
        contract: &str,
        query: &Value,
    ) -> ValuationResult<T> {
        let encoded = STANDARD.encode(query.to_string());
        let url = format!("{lcd}/cosmwasm/wasm/v1/contract/{contract}/smart/{encoded}");

        tracing::debug!(contract = %contract, query = %query, "Querying smart contract");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ValuationError::upstream(format!("querying {contract}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(
                contract = %contract,
                status = %status.as_u16(),
                body = %body,
                "Smart query failed"
            );

            // Try to surface the gateway's own message
            if let Ok(wasm_err) = serde_json::from_str::<WasmError>(&body) {
                return Err(ValuationError::upstream(format!(
                    "wasm query failed: {}",
                    wasm_err.message
                )));
            }
            return Err(ValuationError::upstream(format!(
                "smart query returned status {}",
                status.as_u16()
            )));
        }

        let decoded: SmartQueryResponse<T> = response
            .json()
            .await
            .map_err(|e| ValuationError::malformed(format!("smart query data: {e}")))?;

        Ok(decoded.data)
    }

    /// All spendable bank balances of an address.
    pub async fn bank_balances(&self, lcd: &str, address: &str) -> ValuationResult<Vec<Coin>> {
        let url = format!("{lcd}/cosmos/bank/v1beta1/balances/{address}");
        let response: BankBalancesResponse = self.get_json(&url).await?;
        Ok(response.balances)
    }

    /// Plain REST/LCD GET decoded into `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> ValuationResult<T> {
        tracing::debug!(url = %url, "Fetching JSON");

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
}
