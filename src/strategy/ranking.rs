//! Ranking and presentation sorting.
//!
//! Two ranking modes exist side by side: by estimated APR (aggregation
//! endpoint, dashboard) and by raw spread (bot fallback path). All sorts are
//! stable and return new vectors.

use crate::exchange::Venue;
use crate::strategy::detector::Opportunity;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankMode {
    #[default]
    Apr,
    Spread,
}

impl RankMode {
    pub fn rank(self, opportunities: Vec<Opportunity>) -> Vec<Opportunity> {
        match self {
            RankMode::Apr => rank_by_apr(opportunities),
            RankMode::Spread => rank_by_spread(opportunities),
        }
    }
}

impl FromStr for RankMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "apr" => Ok(RankMode::Apr),
            "spread" => Ok(RankMode::Spread),
            other => Err(format!("unknown rank mode `{}` (expected apr or spread)", other)),
        }
    }
}

/// Highest estimated APR first; equal APRs keep input order.
pub fn rank_by_apr(mut opportunities: Vec<Opportunity>) -> Vec<Opportunity> {
    opportunities.sort_by(|a, b| b.estimated_apr_percent.cmp(&a.estimated_apr_percent));
    opportunities
}

/// Widest per-interval spread first; equal spreads keep input order.
pub fn rank_by_spread(mut opportunities: Vec<Opportunity>) -> Vec<Opportunity> {
    opportunities.sort_by(|a, b| b.spread_percent.cmp(&a.spread_percent));
    opportunities
}

pub fn top_n(opportunities: &[Opportunity], n: usize) -> Vec<Opportunity> {
    opportunities.iter().take(n).cloned().collect()
}

/// Case-insensitive substring match on the ticker. An empty term keeps all.
pub fn filter_by_ticker(opportunities: &[Opportunity], term: &str) -> Vec<Opportunity> {
    let needle = term.trim().to_uppercase();
    opportunities
        .iter()
        .filter(|o| needle.is_empty() || o.ticker.to_uppercase().contains(&needle))
        .cloned()
        .collect()
}

/// Column to sort a table of opportunities by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Ticker,
    /// Absolute rate on that venue; missing counts as zero.
    Venue(Venue),
    /// Estimated APR of the long/short pair.
    Strategy,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ticker" => Ok(SortKey::Ticker),
            "strategy" | "apr" => Ok(SortKey::Strategy),
            other => Venue::from_slug(other)
                .map(SortKey::Venue)
                .ok_or_else(|| format!("unknown sort key `{}`", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

fn venue_rate(opportunity: &Opportunity, venue: Venue) -> Decimal {
    opportunity
        .quote(venue)
        .map(|q| q.rate_percent.abs())
        .unwrap_or(Decimal::ZERO)
}

/// Sort for display. Returns a new vector; the input is untouched.
pub fn sort_opportunities(
    opportunities: &[Opportunity],
    key: SortKey,
    direction: SortDirection,
) -> Vec<Opportunity> {
    let mut sorted = opportunities.to_vec();
    sorted.sort_by(|a, b| {
        let ord: Ordering = match key {
            SortKey::Ticker => a.ticker.cmp(&b.ticker),
            SortKey::Venue(v) => venue_rate(a, v).cmp(&venue_rate(b, v)),
            SortKey::Strategy => a.estimated_apr_percent.cmp(&b.estimated_apr_percent),
        };
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
    sorted
}
