//! Chat message text.

use crate::api::ArbitrageEntry;
use crate::strategy::Confidence;
use crate::utils::decimal::round_display;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt::Write;

pub const LOADING_TEXT: &str = "Loading data...";

pub const HELP_TEXT: &str = "=== Funding Rate Arbitrage Bot ===\n\n\
Commands:\n\
/funding - View top 3 arbitrage opportunities\n\
/help - Show help\n\n\
Automatic notifications are sent hourly.";

pub const EMPTY_TEXT: &str = "=== No Arbitrage Opportunities Found ===";

fn confidence_tag(confidence: Confidence) -> &'static str {
    match confidence {
        Confidence::High => "[HIGH]",
        Confidence::Medium => "[MED]",
        Confidence::Low => "[LOW]",
    }
}

fn fixed(value: Decimal, dp: u32) -> String {
    format!("{:.*}", dp as usize, round_display(value, dp))
}

/// Render the ranked list; `now` is printed in UTC.
pub fn format_top_message(entries: &[ArbitrageEntry], now: DateTime<Utc>) -> String {
    if entries.is_empty() {
        return EMPTY_TEXT.to_string();
    }

    let mut message = format!("=== Top {} Arbitrage Opportunities ===\n\n", entries.len());

    for (i, entry) in entries.iter().enumerate() {
        let sign = if entry.estimated_apr >= Decimal::ZERO { "+" } else { "" };
        let _ = writeln!(
            message,
            "#{} {} {}",
            i + 1,
            entry.symbol,
            confidence_tag(entry.confidence)
        );
        let _ = writeln!(
            message,
            "APR: {}{}% | Spread: {}%",
            sign,
            fixed(entry.estimated_apr, 2),
            fixed(entry.spread * dec!(100), 4)
        );
        let _ = writeln!(
            message,
            "Long: {} | Short: {}\n",
            entry.long_exchange.to_uppercase(),
            entry.short_exchange.to_uppercase()
        );
    }

    let _ = write!(message, "---\nUpdated: {}", now.format("%Y-%m-%d %H:%M:%S"));
    message
}
