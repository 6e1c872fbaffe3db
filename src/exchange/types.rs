//! Payload helpers shared by the venue adapters.

use crate::utils::decimal::{deserialize_flexible_decimal, safe_div};
use anyhow::{Context, Result};
use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::time::Duration;

/// Funding interval fields that venues may attach to a market payload.
///
/// Flatten into a venue's market struct; `resolve` probes the fields in a
/// fixed order and returns the first positive value in hours.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalHints {
    #[serde(default, deserialize_with = "deserialize_flexible_decimal")]
    pub funding_interval: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_flexible_decimal")]
    pub interval: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_flexible_decimal")]
    pub funding_interval_hours: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_flexible_decimal")]
    pub interval_hours: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_flexible_decimal")]
    pub funding_interval_seconds: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_flexible_decimal")]
    pub interval_seconds: Option<Decimal>,
}

impl IntervalHints {
    /// First positive interval in hours, or `None` to use the venue default.
    pub fn resolve(&self) -> Option<Decimal> {
        let seconds = |s: Option<Decimal>| s.map(|v| safe_div(v, dec!(3600)));

        [
            self.funding_interval,
            self.interval,
            self.funding_interval_hours,
            self.interval_hours,
            seconds(self.funding_interval_seconds),
            seconds(self.interval_seconds),
        ]
        .into_iter()
        .flatten()
        .find(|h| *h > Decimal::ZERO)
    }
}

/// Strip a quote-currency suffix, returning `None` when it is absent.
///
/// `strip_quote_suffix("BTCUSDT", "USDT") == Some("BTC")`; a bare suffix
/// (`"USDT"`) has no base asset and is rejected.
pub fn strip_quote_suffix<'a>(symbol: &'a str, suffix: &str) -> Option<&'a str> {
    symbol
        .strip_suffix(suffix)
        .filter(|base| !base.is_empty())
}

/// Build the shared HTTP client for one adapter.
pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")
}
