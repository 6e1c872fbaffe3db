//! Variational listings client.
//!
//! Variational publishes an **annualized** funding rate per listing, as a
//! decimal fraction. Quotes carry it as annual percent; the normalizer
//! back-derives the per-interval rate.

use crate::config::VenueConfig;
use crate::exchange::traits::{FundingDataProvider, RawQuote, Venue, DEFAULT_FETCH_TIMEOUT};
use crate::exchange::types::http_client;
use crate::utils::decimal::{deserialize_flexible_decimal, safe_div, to_percent};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

const BASE_URL: &str = "https://omni-client-api.prod.ap-northeast-1.variational.io";

/// Funding interval assumed when a listing omits `funding_interval_s`.
const DEFAULT_INTERVAL_SECS: Decimal = dec!(28800);

#[derive(Debug, Clone, Deserialize)]
pub struct StatsResponse {
    #[serde(default)]
    pub listings: Vec<Listing>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Listing {
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Annual rate as a decimal fraction (0.10 = 10% APR)
    #[serde(default, deserialize_with = "deserialize_flexible_decimal")]
    pub funding_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_flexible_decimal")]
    pub funding_interval_s: Option<Decimal>,
}

impl Listing {
    fn interval_hours(&self) -> Decimal {
        let secs = self
            .funding_interval_s
            .filter(|s| *s > Decimal::ZERO)
            .unwrap_or(DEFAULT_INTERVAL_SECS);
        safe_div(secs, dec!(3600))
    }
}

/// Variational metadata client.
pub struct VariationalClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl VariationalClient {
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

    /// Get every listing with its annualized funding rate.
    #[instrument(skip(self), name = "variational_stats")]
    pub async fn get_listings(&self) -> Result<Vec<Listing>> {
        let url = format!("{}/metadata/stats", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to fetch Variational stats")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Variational API error {}: {}", status, body);
        }

        let data: StatsResponse = response
            .json()
            .await
            .context("Failed to parse Variational stats response")?;

        Ok(data.listings)
    }
}

#[async_trait]
impl FundingDataProvider for VariationalClient {
    fn venue(&self) -> Venue {
        Venue::Variational
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch_raw_quotes(&self) -> Result<HashMap<String, RawQuote>> {
        let listings = self.get_listings().await?;

        let quotes: HashMap<String, RawQuote> = listings
            .into_iter()
            .filter_map(|listing| {
                let ticker = listing.ticker.clone().filter(|t| !t.is_empty())?;
                let quote = RawQuote::new(ticker.clone(), listing.funding_rate.and_then(to_percent))
                    .with_interval(listing.interval_hours())
                    .with_display_name(listing.name.clone().unwrap_or_else(|| ticker.clone()));
                Some((ticker, quote))
            })
            .collect();

        debug!("Parsed {} Variational listings", quotes.len());
        Ok(quotes)
    }
}
