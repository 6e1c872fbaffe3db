//! Extended (Starknet) markets client.

use crate::config::VenueConfig;
use crate::exchange::traits::{FundingDataProvider, RawQuote, Venue, DEFAULT_FETCH_TIMEOUT};
use crate::exchange::types::{http_client, strip_quote_suffix};
use crate::utils::decimal::{deserialize_flexible_decimal, to_percent};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

const BASE_URL: &str = "https://api.starknet.extended.exchange";

/// The markets endpoint rejects requests without a user agent.
const USER_AGENT: &str = concat!("funding-rate-arb/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Deserialize)]
pub struct MarketsResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data: Vec<Market>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    /// Market name such as "BTC-USD"
    pub name: String,
    #[serde(default)]
    pub market_stats: Option<MarketStats>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketStats {
    /// Decimal fraction per hour
    #[serde(default, deserialize_with = "deserialize_flexible_decimal")]
    pub funding_rate: Option<Decimal>,
}

/// Extended public markets client.
pub struct ExtendedClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl ExtendedClient {
    pub fn new(config: &VenueConfig) -> Result<Self> {
        let timeout = config.timeout_or(DEFAULT_FETCH_TIMEOUT);
        Ok(Self {
            http: http_client(timeout)?,
            base_url: config.base_url_or(BASE_URL),
            timeout,
        })
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Self::new(&VenueConfig {
            base_url: Some(base_url.to_string()),
            ..Default::default()
        })
    }

    /// Get every market with its current stats.
    #[instrument(skip(self), name = "extended_markets")]
    pub async fn get_markets(&self) -> Result<Vec<Market>> {
        let url = format!("{}/api/v1/info/markets", self.base_url);
        let response = self
            .http
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .context("Failed to fetch Extended markets")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Extended API error {}: {}", status, body);
        }

        let data: MarketsResponse = response
            .json()
            .await
            .context("Failed to parse Extended markets response")?;

        if let Some(s) = data.status.as_deref() {
            if !s.eq_ignore_ascii_case("ok") {
                anyhow::bail!("Extended API status {}", s);
            }
        }

        Ok(data.data)
    }
}

#[async_trait]
impl FundingDataProvider for ExtendedClient {
    fn venue(&self) -> Venue {
        Venue::Extended
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch_raw_quotes(&self) -> Result<HashMap<String, RawQuote>> {
        let interval = Venue::Extended.default_interval_hours();
        let quotes: HashMap<String, RawQuote> = self
            .get_markets()
            .await?
            .into_iter()
            .filter_map(|market| {
                let ticker = strip_quote_suffix(&market.name, "-USD")?.to_string();
                let rate = market
                    .market_stats
                    .and_then(|s| s.funding_rate)
                    .and_then(to_percent);
                let quote = RawQuote::new(ticker.clone(), rate)
                    .with_interval(interval)
                    .with_display_name(market.name.clone());
                Some((ticker, quote))
            })
            .collect();

        debug!("Parsed {} Extended markets", quotes.len());
        Ok(quotes)
    }
}
