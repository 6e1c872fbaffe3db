//! Binance USDⓈ-M futures funding client.

use crate::config::VenueConfig;
use crate::exchange::traits::{FundingDataProvider, RawQuote, Venue, DEFAULT_FETCH_TIMEOUT};
use crate::exchange::types::{http_client, strip_quote_suffix, IntervalHints};
use crate::utils::decimal::{deserialize_flexible_decimal, to_percent};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

const FUTURES_BASE_URL: &str = "https://fapi.binance.com";

/// Entry of `/fapi/v1/premiumIndex`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumIndex {
    pub symbol: String,
    /// Decimal fraction per interval (e.g. "0.00010000")
    #[serde(default, deserialize_with = "deserialize_flexible_decimal")]
    pub last_funding_rate: Option<Decimal>,
    #[serde(flatten)]
    pub interval: IntervalHints,
}

/// Binance public futures client.
pub struct BinanceClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl BinanceClient {
    /// Create a new Binance client from configuration.
    pub fn new(config: &VenueConfig) -> Result<Self> {
        let timeout = config.timeout_or(DEFAULT_FETCH_TIMEOUT);
        Ok(Self {
            http: http_client(timeout)?,
            base_url: config.base_url_or(FUTURES_BASE_URL),
            timeout,
        })
    }

    /// Create a client against a custom base URL.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Self::new(&VenueConfig {
            base_url: Some(base_url.to_string()),
            ..Default::default()
        })
    }

    /// Get funding rates for all perpetual contracts.
    #[instrument(skip(self), name = "binance_premium_index")]
    pub async fn get_funding_rates(&self) -> Result<Vec<PremiumIndex>> {
        let url = format!("{}/fapi/v1/premiumIndex", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to fetch funding rates")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Binance API error {}: {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse funding rates response")
    }
}

/// Convert premium index entries to quotes keyed by base asset.
///
/// Only USDT-margined symbols are kept; rates become percent.
pub fn quotes_from_premium_index(entries: Vec<PremiumIndex>) -> HashMap<String, RawQuote> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let ticker = strip_quote_suffix(&entry.symbol, "USDT")?.to_string();
            let mut quote = RawQuote::new(ticker.clone(), entry.last_funding_rate.and_then(to_percent));
            quote.interval_hours = entry.interval.resolve();
            Some((ticker, quote))
        })
        .collect()
}

#[async_trait]
impl FundingDataProvider for BinanceClient {
    fn venue(&self) -> Venue {
        Venue::Binance
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch_raw_quotes(&self) -> Result<HashMap<String, RawQuote>> {
        let entries = self.get_funding_rates().await?;
        let quotes = quotes_from_premium_index(entries);
        debug!("Parsed {} USDT perpetuals from Binance", quotes.len());
        Ok(quotes)
    }
}
