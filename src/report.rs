//! Terminal output for the `scan` and `calc` commands.

use crate::exchange::Venue;
use crate::strategy::{Opportunity, ProfitEstimate, Snapshot};
use crate::utils::decimal::round_display;
use std::fmt::Write;
use std::str::FromStr;

/// How per-venue rates are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Percent per funding interval
    #[default]
    Interval,
    /// Annualized percent
    Annual,
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "interval" => Ok(DisplayMode::Interval),
            "annual" | "apr" => Ok(DisplayMode::Annual),
            other => Err(format!("unknown display mode `{}` (expected interval or annual)", other)),
        }
    }
}

fn rate_cell(opportunity: &Opportunity, venue: Venue, mode: DisplayMode) -> String {
    match (opportunity.quote(venue), mode) {
        (None, _) => "-".to_string(),
        (Some(q), DisplayMode::Interval) => format!("{:+.4}%", round_display(q.rate_percent, 4)),
        (Some(q), DisplayMode::Annual) => format!("{:+.2}%", round_display(q.apr_percent, 2)),
    }
}

fn strategy_cell(opportunity: &Opportunity) -> String {
    format!(
        "L {} / S {}",
        opportunity.long.venue.short_code(),
        opportunity.short.venue.short_code()
    )
}

/// One row per opportunity with a rate column for each of `venues`.
pub fn render_opportunities(opportunities: &[Opportunity], venues: &[Venue], mode: DisplayMode) -> String {
    let mut out = String::new();

    let _ = write!(out, "{:<12}", "TICKER");
    for venue in venues {
        let _ = write!(out, "{:>12}", venue.short_code());
    }
    let _ = writeln!(out, "{:>14}{:>12}{:>12}{:>6}", "STRATEGY", "SPREAD", "APR", "CONF");

    for opp in opportunities {
        let _ = write!(out, "{:<12}", opp.ticker);
        for venue in venues {
            let _ = write!(out, "{:>12}", rate_cell(opp, *venue, mode));
        }
        let _ = writeln!(
            out,
            "{:>14}{:>12}{:>12}{:>6}",
            strategy_cell(opp),
            format!("{:.4}%", round_display(opp.spread_percent, 4)),
            format!("{:+.2}%", round_display(opp.estimated_apr_percent, 2)),
            opp.confidence.as_str().to_uppercase().chars().next().unwrap_or('-'),
        );
    }

    out
}

/// Quote counts per venue plus the refresh timestamp.
pub fn render_summary(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "📡 Refreshed {} | {} opportunities",
        snapshot.refreshed_at.format("%Y-%m-%d %H:%M:%S UTC"),
        snapshot.opportunities.len()
    );
    let count = snapshot.venue_counts.len();
    for (i, (venue, quotes)) in snapshot.venue_counts.iter().enumerate() {
        let branch = if i + 1 == count { "└─" } else { "├─" };
        let status = if *quotes == 0 { " (no data)" } else { "" };
        let _ = writeln!(out, "   {} {:<12} {:>5} quotes{}", branch, venue.to_string(), quotes, status);
    }
    out
}

pub fn render_profit(opportunity: &Opportunity, estimate: &ProfitEstimate) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "💰 {} | Long {} / Short {}",
        opportunity.ticker, opportunity.long.venue, opportunity.short.venue
    );
    let _ = writeln!(out, "   ├─ Position Size:     ${:.2}", round_display(estimate.position_size_usd, 2));
    let _ = writeln!(
        out,
        "   ├─ Hold:              {}h ({} fundings @ {}h)",
        estimate.hold_hours, estimate.funding_count, estimate.interval_hours
    );
    let _ = writeln!(out, "   ├─ Spread:            {:.4}%", round_display(opportunity.spread_percent, 4));
    let _ = writeln!(out, "   ├─ Per Funding:       ${:.4}", round_display(estimate.profit_per_funding_usd, 4));
    let _ = writeln!(
        out,
        "   ├─ Total Profit:      ${:.4} ({:.4}%)",
        round_display(estimate.total_profit_usd, 4),
        round_display(estimate.profit_rate_percent, 4)
    );
    let _ = writeln!(out, "   └─ APR:               {:.2}%", round_display(estimate.apr_percent, 2));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{RawQuote, VenueQuotes};
    use crate::strategy::compute_opportunities;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn opportunities() -> Vec<Opportunity> {
        compute_opportunities(&[
            VenueQuotes::from_quotes(Venue::Binance, vec![RawQuote::new("BTC", Some(dec!(0.0100)))]),
            VenueQuotes::from_quotes(Venue::Hyperliquid, vec![RawQuote::new("BTC", Some(dec!(0.0002)))]),
        ])
    }

    #[test]
    fn test_display_mode_parse() {
        assert_eq!("annual".parse::<DisplayMode>(), Ok(DisplayMode::Annual));
        assert!("weekly".parse::<DisplayMode>().is_err());
    }

    #[test]
    fn test_table_modes() {
        let opps = opportunities();
        let venues = [Venue::Binance, Venue::Bybit, Venue::Hyperliquid];

        let interval = render_opportunities(&opps, &venues, DisplayMode::Interval);
        assert!(interval.contains("+0.0100%"));
        assert!(interval.contains("L HL / S BN"));
        assert!(interval.lines().nth(1).unwrap().contains(" - "));

        let annual = render_opportunities(&opps, &venues, DisplayMode::Annual);
        // 0.01% per 8h
        assert!(annual.contains("+10.95%"));
        assert!(annual.contains("+85.85%"));
    }

    #[test]
    fn test_profit_block() {
        let opps = opportunities();
        let estimate = ProfitEstimate::compute(&opps[0], dec!(10000), dec!(24)).unwrap();
        let text = render_profit(&opps[0], &estimate);

        assert!(text.contains("Long Hyperliquid / Short Binance"));
        assert!(text.contains("24 fundings @ 1h"));
        assert!(text.contains("$23.5200"));
    }

    #[test]
    fn test_summary_flags_empty_venues() {
        let mut venue_counts = BTreeMap::new();
        venue_counts.insert(Venue::Binance, 12);
        venue_counts.insert(Venue::Lighter, 0);
        let snapshot = Snapshot {
            opportunities: opportunities(),
            venue_counts,
            refreshed_at: Utc::now(),
        };

        let text = render_summary(&snapshot);
        assert!(text.contains("1 opportunities"));
        assert!(text.contains("(no data)"));
    }
}
