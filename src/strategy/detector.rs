//! Cross-venue opportunity detection.
//!
//! For each instrument quoted on two or more venues, go long where funding is
//! lowest and short where it is highest. The spread is annualized with the
//! fastest funding cadence among the contributing venues.

use crate::exchange::{Venue, VenueQuotes};
use crate::strategy::normalizer::{group_instruments, NormalizedQuote};
use crate::utils::decimal::periods_per_year;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

/// Interval assumed when no contributing quote carries a positive one.
const FALLBACK_INTERVAL_HOURS: Decimal = dec!(8);
/// Spread thresholds, in percent per interval.
const HIGH_SPREAD: Decimal = dec!(0.1);
const MEDIUM_SPREAD: Decimal = dec!(0.05);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

/// Coarse tier of the raw per-interval spread (not of the APR).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn from_spread(spread_percent: Decimal) -> Self {
        if spread_percent > HIGH_SPREAD {
            Confidence::High
        } else if spread_percent > MEDIUM_SPREAD {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side of the hedge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leg {
    pub venue: Venue,
    pub side: PositionSide,
    pub rate_percent: Decimal,
    pub interval_hours: Decimal,
}

/// Best long/short pair for one instrument in one refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Opportunity {
    pub ticker: String,
    pub long: Leg,
    pub short: Leg,
    /// max(rate) - min(rate), percent per interval, always > 0
    pub spread_percent: Decimal,
    pub estimated_apr_percent: Decimal,
    pub min_interval_hours: Decimal,
    pub confidence: Confidence,
    /// Every contributing quote, in venue order
    pub quotes: Vec<NormalizedQuote>,
}

impl Opportunity {
    /// The quote this instrument received from `venue`, if any.
    pub fn quote(&self, venue: Venue) -> Option<&NormalizedQuote> {
        self.quotes.iter().find(|q| q.venue == venue)
    }
}

/// Detect the opportunity for one instrument.
///
/// Ties at the extremes go to the first venue in input order. A zero spread
/// is no opportunity.
pub fn detect(ticker: &str, quotes: &[NormalizedQuote]) -> Option<Opportunity> {
    if quotes.len() < 2 {
        return None;
    }

    let mut low = &quotes[0];
    let mut high = &quotes[0];
    for quote in &quotes[1..] {
        if quote.rate_percent < low.rate_percent {
            low = quote;
        }
        if quote.rate_percent > high.rate_percent {
            high = quote;
        }
    }

    let Some(spread_percent) = high.rate_percent.checked_sub(low.rate_percent) else {
        trace!(ticker = %ticker, "Spread out of range, skipping");
        return None;
    };
    if spread_percent <= Decimal::ZERO {
        return None;
    }

    let min_interval_hours = quotes
        .iter()
        .map(|q| q.interval_hours)
        .filter(|h| *h > Decimal::ZERO)
        .min()
        .unwrap_or(FALLBACK_INTERVAL_HOURS);
    let Some(estimated_apr_percent) = periods_per_year(min_interval_hours)
        .and_then(|periods| spread_percent.checked_mul(periods))
    else {
        trace!(ticker = %ticker, spread = %spread_percent, "APR out of range, skipping");
        return None;
    };

    Some(Opportunity {
        ticker: ticker.to_string(),
        long: Leg {
            venue: low.venue,
            side: PositionSide::Long,
            rate_percent: low.rate_percent,
            interval_hours: low.interval_hours,
        },
        short: Leg {
            venue: high.venue,
            side: PositionSide::Short,
            rate_percent: high.rate_percent,
            interval_hours: high.interval_hours,
        },
        spread_percent,
        estimated_apr_percent,
        min_interval_hours,
        confidence: Confidence::from_spread(spread_percent),
        quotes: quotes.to_vec(),
    })
}

/// Normalize, group and detect across every venue's quotes.
///
/// Output is in ticker order; rank it with [`super::ranking`].
pub fn compute_opportunities(by_venue: &[VenueQuotes]) -> Vec<Opportunity> {
    group_instruments(by_venue)
        .into_iter()
        .filter_map(|(ticker, quotes)| detect(&ticker, &quotes))
        .collect()
}
