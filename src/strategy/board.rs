//! Published opportunity snapshot.
//!
//! One writer (the refresh loop) replaces the whole snapshot; readers clone
//! the `Arc` and never observe a mix of two cycles.

use crate::exchange::Venue;
use crate::strategy::detector::Opportunity;
use crate::strategy::FundingScanner;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Result of one refresh cycle, APR-ranked.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub opportunities: Vec<Opportunity>,
    /// Quotes received per venue this cycle (0 = absent)
    pub venue_counts: BTreeMap<Venue, usize>,
    pub refreshed_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct OpportunityBoard {
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl OpportunityBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current snapshot wholesale.
    pub async fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        debug!(
            opportunities = snapshot.opportunities.len(),
            "Publishing snapshot"
        );
        *self.current.write().await = Some(Arc::clone(&snapshot));
        snapshot
    }

    pub async fn latest(&self) -> Option<Arc<Snapshot>> {
        self.current.read().await.clone()
    }

    /// Latest snapshot, or run one cycle inline and publish it when the
    /// refresh loop has not produced one yet.
    pub async fn latest_or_refresh(&self, scanner: &FundingScanner) -> Result<Arc<Snapshot>> {
        if let Some(snapshot) = self.latest().await {
            return Ok(snapshot);
        }
        let snapshot = scanner.refresh().await?;
        Ok(self.publish(snapshot).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(tickers: &[&str]) -> Snapshot {
        use crate::strategy::detector::{Confidence, Leg, PositionSide};
        use rust_decimal::Decimal;

        let leg = |venue, side| Leg {
            venue,
            side,
            rate_percent: Decimal::ZERO,
            interval_hours: Decimal::ONE,
        };
        Snapshot {
            opportunities: tickers
                .iter()
                .map(|t| Opportunity {
                    ticker: t.to_string(),
                    long: leg(Venue::Binance, PositionSide::Long),
                    short: leg(Venue::Bybit, PositionSide::Short),
                    spread_percent: Decimal::ONE,
                    estimated_apr_percent: Decimal::ONE,
                    min_interval_hours: Decimal::ONE,
                    confidence: Confidence::High,
                    quotes: Vec::new(),
                })
                .collect(),
            venue_counts: BTreeMap::new(),
            refreshed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publish_replaces_wholesale() {
        let board = OpportunityBoard::new();
        assert!(board.latest().await.is_none());

        board.publish(snapshot(&["BTC", "ETH"])).await;
        let first = board.latest().await.unwrap();

        board.publish(snapshot(&["SOL"])).await;
        let second = board.latest().await.unwrap();

        // A reader holding the old snapshot still sees it intact.
        assert_eq!(first.opportunities.len(), 2);
        assert_eq!(second.opportunities.len(), 1);
        assert_eq!(second.opportunities[0].ticker, "SOL");
    }

    #[tokio::test]
    async fn test_latest_or_refresh_runs_once() {
        use crate::exchange::{FundingDataProvider, MockProvider};
        use rust_decimal_macros::dec;

        let binance = Arc::new(MockProvider::new(Venue::Binance).with_rate("ETH", dec!(0.02)));
        let providers: Vec<Arc<dyn FundingDataProvider>> = vec![
            binance.clone(),
            Arc::new(MockProvider::new(Venue::Bybit).with_rate("ETH", dec!(0.01))),
        ];
        let scanner = FundingScanner::new(providers);
        let board = OpportunityBoard::new();

        let first = board.latest_or_refresh(&scanner).await.unwrap();
        assert_eq!(first.opportunities[0].ticker, "ETH");
        board.latest_or_refresh(&scanner).await.unwrap();

        assert_eq!(binance.fetch_count(), 1);
    }
}
