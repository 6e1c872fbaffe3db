//! Rate normalization.
//!
//! Converts each venue's raw quote to percent per funding interval plus its
//! APR, deriving the pair exactly once. Downstream code never re-derives
//! either value.

use crate::exchange::{RateBasis, RawQuote, Venue, VenueQuotes};
use crate::utils::decimal::periods_per_year;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::trace;

/// A quote in canonical units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedQuote {
    pub venue: Venue,
    pub ticker: String,
    /// Percent per funding interval
    pub rate_percent: Decimal,
    pub interval_hours: Decimal,
    /// Annualized percent
    pub apr_percent: Decimal,
    pub display_name: Option<String>,
}

/// Instrument key: trimmed, uppercase symbol.
pub fn canonical_ticker(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

/// Normalize one raw quote.
///
/// `None` when the venue has no rate for it, or when the rate cannot be
/// converted without leaving `Decimal` range.
pub fn normalize_quote(venue: Venue, raw: &RawQuote) -> Option<NormalizedQuote> {
    let rate = raw.rate?;

    let interval_hours = raw
        .interval_hours
        .filter(|h| *h > Decimal::ZERO)
        .unwrap_or_else(|| venue.default_interval_hours());

    let converted = periods_per_year(interval_hours).and_then(|periods| match venue.rate_basis() {
        // APR is the reported value as-is; only the interval rate is derived.
        RateBasis::Annual => rate.checked_div(periods).map(|r| (r, rate)),
        RateBasis::PerInterval => rate.checked_mul(periods).map(|apr| (rate, apr)),
    });
    let Some((rate_percent, apr_percent)) = converted else {
        trace!(venue = %venue, ticker = %raw.ticker, rate = %rate, "Dropping out-of-range rate");
        return None;
    };

    Some(NormalizedQuote {
        venue,
        ticker: canonical_ticker(&raw.ticker),
        rate_percent,
        interval_hours,
        apr_percent,
        display_name: raw.display_name.clone(),
    })
}

/// Normalize every quote of one venue, applying its zero-rate policy.
pub fn normalize_venue(quotes: &VenueQuotes) -> Vec<NormalizedQuote> {
    let venue = quotes.venue;
    quotes
        .quotes
        .values()
        .filter(|raw| {
            let stale_zero = venue.drops_zero_rates() && raw.rate == Some(Decimal::ZERO);
            if stale_zero {
                trace!(venue = %venue, ticker = %raw.ticker, "Dropping zero rate");
            }
            !stale_zero
        })
        .filter_map(|raw| normalize_quote(venue, raw))
        .collect()
}

/// Group quotes by instrument.
///
/// Within an instrument, quotes keep the order of `by_venue`; a venue that
/// lists the same canonical ticker twice contributes its first entry only.
pub fn group_instruments(by_venue: &[VenueQuotes]) -> BTreeMap<String, Vec<NormalizedQuote>> {
    let mut instruments: BTreeMap<String, Vec<NormalizedQuote>> = BTreeMap::new();

    for venue_quotes in by_venue {
        let mut normalized = normalize_venue(venue_quotes);
        // HashMap iteration order is arbitrary; fix it before de-duplicating.
        normalized.sort_by(|a, b| a.ticker.cmp(&b.ticker));

        for quote in normalized {
            let entry = instruments.entry(quote.ticker.clone()).or_default();
            if entry.iter().all(|q| q.venue != quote.venue) {
                entry.push(quote);
            }
        }
    }

    instruments
}
