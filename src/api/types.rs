//! Wire types of the aggregation endpoint.
//!
//! `spread` and `variational.rate` are decimal fractions; every other rate
//! field is percent. Decimals are written as JSON numbers.

use crate::exchange::Venue;
use crate::strategy::{Confidence, Opportunity};
use crate::utils::decimal::from_percent;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Quote currency reported for every instrument.
pub const QUOTE_ASSET: &str = "USD";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitrageEntry {
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    /// Decimal fraction per interval (percent / 100)
    #[serde(default, with = "rust_decimal::serde::float")]
    pub spread: Decimal,
    /// Percent
    #[serde(default, with = "rust_decimal::serde::float")]
    pub estimated_apr: Decimal,
    pub long_exchange: String,
    pub short_exchange: String,
    pub confidence: Confidence,
    #[serde(default)]
    pub variational: Option<VariationalSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariationalSummary {
    /// Decimal fraction per interval
    #[serde(with = "rust_decimal::serde::float")]
    pub rate: Decimal,
    /// Annual percent, as reported
    #[serde(with = "rust_decimal::serde::float")]
    pub apr: Decimal,
    /// Hours
    #[serde(with = "rust_decimal::serde::float")]
    pub interval: Decimal,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrageResponse {
    pub success: bool,
    /// Opportunities with positive estimated APR
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub top: Vec<ArbitrageEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ArbitrageEntry {
    pub fn from_opportunity(opportunity: &Opportunity) -> Self {
        let base_asset = opportunity
            .ticker
            .strip_suffix("-PERP")
            .unwrap_or(&opportunity.ticker)
            .to_string();

        let variational = opportunity.quote(Venue::Variational).map(|q| VariationalSummary {
            rate: from_percent(q.rate_percent),
            apr: q.apr_percent,
            interval: q.interval_hours,
            name: q
                .display_name
                .clone()
                .unwrap_or_else(|| opportunity.ticker.clone()),
        });

        Self {
            symbol: opportunity.ticker.clone(),
            base_asset,
            quote_asset: QUOTE_ASSET.to_string(),
            spread: from_percent(opportunity.spread_percent),
            estimated_apr: opportunity.estimated_apr_percent,
            long_exchange: opportunity.long.venue.slug().to_string(),
            short_exchange: opportunity.short.venue.slug().to_string(),
            confidence: opportunity.confidence,
            variational,
        }
    }
}

impl ArbitrageResponse {
    /// Build the response from APR-ranked opportunities.
    pub fn from_ranked(opportunities: &[Opportunity], top: usize) -> Self {
        let valid: Vec<&Opportunity> = opportunities
            .iter()
            .filter(|o| o.estimated_apr_percent > Decimal::ZERO)
            .collect();

        Self {
            success: true,
            total: valid.len(),
            top: valid
                .iter()
                .take(top)
                .map(|o| ArbitrageEntry::from_opportunity(o))
                .collect(),
        }
    }
}

impl ErrorResponse {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            error: "Internal server error".to_string(),
            message: Some(message.into()),
        }
    }

    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: None,
        }
    }
}
