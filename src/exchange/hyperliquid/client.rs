//! Hyperliquid REST API client.
//!
//! Read-only access to the perpetuals universe and its hourly funding rates.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::types::*;
use crate::config::VenueConfig;
use crate::exchange::traits::{FundingDataProvider, RawQuote, Venue, DEFAULT_FETCH_TIMEOUT};
use crate::exchange::types::http_client;
use crate::utils::decimal::to_percent;

/// Base URL for Hyperliquid mainnet API.
const MAINNET_API_URL: &str = "https://api.hyperliquid.xyz";

/// Hyperliquid API client for fetching market data.
#[derive(Debug, Clone)]
pub struct HyperliquidClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

/// One perpetual with its hourly funding rate (decimal fraction).
#[derive(Debug, Clone, PartialEq)]
pub struct HyperliquidFunding {
    pub name: String,
    pub funding_rate: Decimal,
}

impl HyperliquidClient {
    /// Create a new Hyperliquid client from configuration.
    pub fn new(config: &VenueConfig) -> Result<Self> {
        let timeout = config.timeout_or(DEFAULT_FETCH_TIMEOUT);
        Ok(Self {
            client: http_client(timeout)?,
            base_url: config.base_url_or(MAINNET_API_URL),
            timeout,
        })
    }

    /// Create a new Hyperliquid client with a custom base URL.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Self::new(&VenueConfig {
            base_url: Some(base_url.to_string()),
            ..Default::default()
        })
    }

    /// Get metadata and asset contexts for all perpetuals.
    #[instrument(skip(self), name = "hl_meta_and_asset_ctxs")]
    pub async fn get_meta_and_asset_ctxs(&self) -> Result<MetaAndAssetCtxsResponse> {
        let url = format!("{}/info", self.base_url);
        let request = InfoRequest::MetaAndAssetCtxs;

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send metaAndAssetCtxs request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Hyperliquid API error {}: {}", status, body);
        }

        let data: MetaAndAssetCtxsResponse = response
            .json()
            .await
            .context("Failed to parse metaAndAssetCtxs response")?;

        debug!(
            "Fetched {} assets from Hyperliquid",
            data.0.universe.len()
        );

        Ok(data)
    }

    /// Get funding rates for all assets, pairing universe entries with
    /// contexts by index. Assets without a context or funding value are skipped.
    #[instrument(skip(self), name = "hl_get_funding_rates")]
    pub async fn get_funding_rates(&self) -> Result<Vec<HyperliquidFunding>> {
        let (meta, ctxs) = self.get_meta_and_asset_ctxs().await?;

        if meta.universe.len() != ctxs.len() {
            debug!(
                "Universe ({}) and contexts ({}) differ in length",
                meta.universe.len(),
                ctxs.len()
            );
        }

        let rates: Vec<HyperliquidFunding> = meta
            .universe
            .into_iter()
            .zip(ctxs)
            .filter_map(|(m, c)| {
                c.funding.map(|funding_rate| HyperliquidFunding {
                    name: m.name,
                    funding_rate,
                })
            })
            .collect();

        info!("Fetched {} Hyperliquid funding rates", rates.len());
        Ok(rates)
    }
}

#[async_trait]
impl FundingDataProvider for HyperliquidClient {
    fn venue(&self) -> Venue {
        Venue::Hyperliquid
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch_raw_quotes(&self) -> Result<HashMap<String, RawQuote>> {
        let interval = Venue::Hyperliquid.default_interval_hours();
        Ok(self
            .get_funding_rates()
            .await?
            .into_iter()
            .map(|f| {
                let quote = RawQuote::new(f.name.clone(), to_percent(f.funding_rate))
                    .with_interval(interval);
                (f.name, quote)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_pairs_universe_with_contexts_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/info"))
            .and(body_json(serde_json::json!({"type": "metaAndAssetCtxs"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"universe": [
                    {"name": "BTC", "szDecimals": 5, "maxLeverage": 40},
                    {"name": "ETH", "szDecimals": 4, "maxLeverage": 25},
                    {"name": "PURR", "szDecimals": 0, "maxLeverage": 3}
                ]},
                [
                    {"funding": "0.0000125", "markPx": "60000.0"},
                    {"funding": null, "markPx": "3000.0"}
                ]
            ])))
            .mount(&server)
            .await;

        let client = HyperliquidClient::with_base_url(&server.uri()).unwrap();
        let quotes = client.fetch_raw_quotes().await.unwrap();

        assert_eq!(quotes.len(), 1);
        let btc = &quotes["BTC"];
        assert_eq!(btc.rate, Some(dec!(0.00125)));
        assert_eq!(btc.interval_hours, Some(dec!(1)));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "bad request"
            })))
            .mount(&server)
            .await;

        let client = HyperliquidClient::with_base_url(&server.uri()).unwrap();
        assert!(client.fetch_raw_quotes().await.is_err());
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_live_fetch() {
        let client = HyperliquidClient::new(&VenueConfig::default()).unwrap();
        let rates = client.get_funding_rates().await.unwrap();
        assert!(rates.iter().any(|r| r.name == "BTC"));
    }
}
