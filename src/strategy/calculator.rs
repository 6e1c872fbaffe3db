//! Profit estimate for holding one hedged pair.

use crate::strategy::detector::Opportunity;
use crate::utils::decimal::periods_per_year;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfitEstimate {
    pub position_size_usd: Decimal,
    pub hold_hours: Decimal,
    /// Faster of the two legs' intervals
    pub interval_hours: Decimal,
    pub funding_count: Decimal,
    pub profit_per_funding_usd: Decimal,
    pub total_profit_usd: Decimal,
    /// Total profit as percent of position size
    pub profit_rate_percent: Decimal,
    pub apr_percent: Decimal,
}

impl ProfitEstimate {
    /// Estimate funding collected over `hold_hours`, counting only whole
    /// intervals. `None` for non-positive size or duration, or when a figure
    /// leaves `Decimal` range.
    pub fn compute(
        opportunity: &Opportunity,
        position_size_usd: Decimal,
        hold_hours: Decimal,
    ) -> Option<Self> {
        if position_size_usd <= Decimal::ZERO || hold_hours <= Decimal::ZERO {
            return None;
        }

        let interval_hours = opportunity
            .long
            .interval_hours
            .min(opportunity.short.interval_hours);
        if interval_hours <= Decimal::ZERO {
            return None;
        }

        let spread = opportunity.spread_percent;
        let funding_count = hold_hours.checked_div(interval_hours)?.floor();
        let profit_per_funding_usd = position_size_usd.checked_mul(spread)? / dec!(100);
        let total_profit_usd = profit_per_funding_usd.checked_mul(funding_count)?;
        let profit_rate_percent = total_profit_usd
            .checked_div(position_size_usd)?
            .checked_mul(dec!(100))?;
        let apr_percent = spread.checked_mul(periods_per_year(interval_hours)?)?;

        Some(Self {
            position_size_usd,
            hold_hours,
            interval_hours,
            funding_count,
            profit_per_funding_usd,
            total_profit_usd,
            profit_rate_percent,
            apr_percent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::Venue;
    use crate::strategy::detector::{Confidence, Leg, PositionSide};

    fn opportunity(long_hours: Decimal, short_hours: Decimal, spread: Decimal) -> Opportunity {
        Opportunity {
            ticker: "BTC".to_string(),
            long: Leg {
                venue: Venue::Hyperliquid,
                side: PositionSide::Long,
                rate_percent: Decimal::ZERO,
                interval_hours: long_hours,
            },
            short: Leg {
                venue: Venue::Binance,
                side: PositionSide::Short,
                rate_percent: spread,
                interval_hours: short_hours,
            },
            spread_percent: spread,
            estimated_apr_percent: Decimal::ZERO,
            min_interval_hours: long_hours.min(short_hours),
            confidence: Confidence::Low,
            quotes: Vec::new(),
        }
    }

    #[test]
    fn test_whole_intervals_only() {
        let opp = opportunity(dec!(8), dec!(8), dec!(0.05));
        let est = ProfitEstimate::compute(&opp, dec!(10000), dec!(20)).unwrap();

        assert_eq!(est.funding_count, dec!(2));
        assert_eq!(est.profit_per_funding_usd, dec!(5));
        assert_eq!(est.total_profit_usd, dec!(10));
        assert_eq!(est.profit_rate_percent, dec!(0.1));
        assert_eq!(est.apr_percent, dec!(54.75));
    }

    #[test]
    fn test_uses_faster_leg() {
        let opp = opportunity(dec!(1), dec!(8), dec!(0.01));
        let est = ProfitEstimate::compute(&opp, dec!(1000), dec!(24)).unwrap();
        assert_eq!(est.interval_hours, dec!(1));
        assert_eq!(est.funding_count, dec!(24));
        assert_eq!(est.total_profit_usd, dec!(2.4));
    }

    #[test]
    fn test_rejects_non_positive_inputs() {
        let opp = opportunity(dec!(8), dec!(8), dec!(0.05));
        assert!(ProfitEstimate::compute(&opp, Decimal::ZERO, dec!(24)).is_none());
        assert!(ProfitEstimate::compute(&opp, dec!(100), dec!(-1)).is_none());
    }

    #[test]
    fn test_out_of_range_size_is_rejected() {
        let opp = opportunity(dec!(1), dec!(1), dec!(50));
        assert!(ProfitEstimate::compute(&opp, Decimal::MAX, dec!(24)).is_none());
    }
}
