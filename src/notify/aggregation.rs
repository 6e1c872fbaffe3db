//! Client for a remote `/arbitrage` aggregation endpoint.

use crate::api::{ArbitrageEntry, ArbitrageResponse};
use crate::exchange::http_client;
use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

const AGGREGATION_TIMEOUT: Duration = Duration::from_secs(30);

pub struct AggregationClient {
    http: Client,
    url: String,
}

impl AggregationClient {
    /// `url` is the full endpoint, e.g. `https://host/arbitrage`.
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            http: http_client(AGGREGATION_TIMEOUT)?,
            url: url.to_string(),
        })
    }

    #[instrument(skip(self), name = "aggregation_fetch")]
    pub async fn fetch_top(&self, top: usize) -> Result<Vec<ArbitrageEntry>> {
        let response = self
            .http
            .get(&self.url)
            .query(&[("top", top)])
            .send()
            .await
            .context("Failed to reach aggregation endpoint")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Aggregation API error {}: {}", status, body);
        }

        let data: ArbitrageResponse = response
            .json()
            .await
            .context("Failed to parse aggregation response")?;

        if !data.success {
            anyhow::bail!("Aggregation endpoint reported failure");
        }

        debug!(total = data.total, returned = data.top.len(), "Fetched aggregated opportunities");
        Ok(data.top)
    }
}
