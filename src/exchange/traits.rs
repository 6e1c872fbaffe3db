//! Venue-agnostic traits for funding data providers.
//!
//! Every perpetuals venue is reduced to the same output: a map from ticker to
//! a raw funding quote in the venue's native rate basis. Conversion to a
//! common per-interval percent happens once, in the normalizer.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Venue identifier for multi-venue operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Variational,
    Binance,
    Bybit,
    Hyperliquid,
    Lighter,
    Extended,
}

/// How a venue expresses its funding rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateBasis {
    /// Percent paid per funding interval.
    PerInterval,
    /// Annualized percent; the interval rate must be back-derived.
    Annual,
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Venue::Variational => write!(f, "Variational"),
            Venue::Binance => write!(f, "Binance"),
            Venue::Bybit => write!(f, "Bybit"),
            Venue::Hyperliquid => write!(f, "Hyperliquid"),
            Venue::Lighter => write!(f, "Lighter"),
            Venue::Extended => write!(f, "Extended"),
        }
    }
}

impl Venue {
    /// All venues in canonical iteration order.
    pub const ALL: [Venue; 6] = [
        Venue::Variational,
        Venue::Binance,
        Venue::Bybit,
        Venue::Hyperliquid,
        Venue::Lighter,
        Venue::Extended,
    ];

    /// Lowercase identifier used in JSON output and CLI arguments.
    pub fn slug(&self) -> &'static str {
        match self {
            Venue::Variational => "variational",
            Venue::Binance => "binance",
            Venue::Bybit => "bybit",
            Venue::Hyperliquid => "hyperliquid",
            Venue::Lighter => "lighter",
            Venue::Extended => "extended",
        }
    }

    /// Short code for display (2-3 chars).
    pub fn short_code(&self) -> &'static str {
        match self {
            Venue::Variational => "VAR",
            Venue::Binance => "BN",
            Venue::Bybit => "BY",
            Venue::Hyperliquid => "HL",
            Venue::Lighter => "LT",
            Venue::Extended => "EXT",
        }
    }

    /// Funding cadence assumed when a payload carries no interval.
    pub fn default_interval_hours(&self) -> Decimal {
        match self {
            Venue::Variational | Venue::Binance | Venue::Bybit => dec!(8),
            Venue::Hyperliquid | Venue::Lighter | Venue::Extended => dec!(1),
        }
    }

    pub fn rate_basis(&self) -> RateBasis {
        match self {
            Venue::Variational => RateBasis::Annual,
            _ => RateBasis::PerInterval,
        }
    }

    /// Bybit reports stale or missing funding as an exact zero.
    pub fn drops_zero_rates(&self) -> bool {
        matches!(self, Venue::Bybit)
    }

    /// Parse a venue from its slug or display name (case-insensitive).
    pub fn from_slug(s: &str) -> Option<Venue> {
        let needle = s.trim().to_ascii_lowercase();
        Venue::ALL.into_iter().find(|v| v.slug() == needle)
    }
}

/// One venue's funding quote for one ticker, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawQuote {
    /// Ticker with the venue's quote suffix already stripped (e.g. "BTC").
    pub ticker: String,
    /// Percent in the venue's native basis. `None` means no data.
    pub rate: Option<Decimal>,
    /// Funding interval; `None` means use the venue default.
    pub interval_hours: Option<Decimal>,
    /// Human-readable market name when the venue provides one.
    pub display_name: Option<String>,
}

impl RawQuote {
    pub fn new(ticker: impl Into<String>, rate: Option<Decimal>) -> Self {
        Self {
            ticker: ticker.into(),
            rate,
            interval_hours: None,
            display_name: None,
        }
    }

    pub fn with_interval(mut self, hours: Decimal) -> Self {
        self.interval_hours = Some(hours);
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// The full output of one provider for one refresh cycle.
#[derive(Debug, Clone)]
pub struct VenueQuotes {
    pub venue: Venue,
    pub quotes: HashMap<String, RawQuote>,
}

impl VenueQuotes {
    pub fn new(venue: Venue, quotes: HashMap<String, RawQuote>) -> Self {
        Self { venue, quotes }
    }

    /// An absent venue: every fetch failure degrades to this.
    pub fn empty(venue: Venue) -> Self {
        Self::new(venue, HashMap::new())
    }

    /// Build from a list of quotes keyed by their ticker.
    pub fn from_quotes(venue: Venue, quotes: impl IntoIterator<Item = RawQuote>) -> Self {
        let quotes = quotes
            .into_iter()
            .map(|q| (q.ticker.clone(), q))
            .collect();
        Self::new(venue, quotes)
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

/// Default per-cycle timeout for request/response venues.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(8);

/// Trait for venues that provide funding rate data.
///
/// Implement `fetch_raw_quotes` for a new exchange; callers use the provided
/// `fetch_quotes`, which never fails.
#[async_trait]
pub trait FundingDataProvider: Send + Sync {
    /// Returns the venue identifier.
    fn venue(&self) -> Venue;

    /// Upper bound for one fetch before the venue is treated as absent.
    fn timeout(&self) -> Duration {
        DEFAULT_FETCH_TIMEOUT
    }

    /// Fetch every ticker's current funding quote.
    async fn fetch_raw_quotes(&self) -> anyhow::Result<HashMap<String, RawQuote>>;

    /// Fetch quotes, degrading any failure to an empty set.
    async fn fetch_quotes(&self) -> VenueQuotes {
        let venue = self.venue();
        let started = Instant::now();
        match self.fetch_raw_quotes().await {
            Ok(quotes) => {
                debug!(
                    venue = %venue,
                    quotes = quotes.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Fetched funding quotes"
                );
                VenueQuotes::new(venue, quotes)
            }
            Err(e) => {
                warn!(venue = %venue, error = %format!("{:#}", e), "Funding fetch failed");
                VenueQuotes::empty(venue)
            }
        }
    }
}
