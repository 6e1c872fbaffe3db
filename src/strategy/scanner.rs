//! Refresh cycle: fetch every venue concurrently, then detect and rank.

use crate::exchange::{FundingDataProvider, Venue, VenueQuotes};
use crate::strategy::board::Snapshot;
use crate::strategy::detector::compute_opportunities;
use crate::strategy::ranking::RankMode;
use anyhow::{Context, Result};
use chrono::Utc;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Scans the configured venues for cross-venue funding opportunities.
pub struct FundingScanner {
    providers: Vec<Arc<dyn FundingDataProvider>>,
    rank_mode: RankMode,
}

impl FundingScanner {
    /// Create a scanner ranking by estimated APR.
    pub fn new(providers: Vec<Arc<dyn FundingDataProvider>>) -> Self {
        Self {
            providers,
            rank_mode: RankMode::Apr,
        }
    }

    pub fn with_rank_mode(mut self, mode: RankMode) -> Self {
        self.rank_mode = mode;
        self
    }

    pub fn venues(&self) -> Vec<Venue> {
        self.providers.iter().map(|p| p.venue()).collect()
    }

    /// Fetch every provider concurrently, in provider order.
    ///
    /// A provider that errors or exceeds its timeout contributes an empty
    /// quote set. A provider task that panics fails the whole cycle.
    #[instrument(skip(self), name = "collect_quotes")]
    pub async fn collect(&self) -> Result<Vec<VenueQuotes>> {
        let handles: Vec<_> = self
            .providers
            .iter()
            .map(|provider| {
                let provider = Arc::clone(provider);
                tokio::spawn(async move {
                    let venue = provider.venue();
                    let limit = provider.timeout();
                    match tokio::time::timeout(limit, provider.fetch_quotes()).await {
                        Ok(quotes) => quotes,
                        Err(_) => {
                            warn!(venue = %venue, timeout_ms = limit.as_millis() as u64, "Funding fetch timed out");
                            VenueQuotes::empty(venue)
                        }
                    }
                })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.context("Provider task failed"))
            .collect()
    }

    /// Run one full refresh cycle.
    #[instrument(skip(self), name = "refresh_cycle")]
    pub async fn refresh(&self) -> Result<Snapshot> {
        let started = Instant::now();
        let by_venue = self.collect().await?;

        let venue_counts = by_venue.iter().map(|q| (q.venue, q.len())).collect();
        let opportunities = self.rank_mode.rank(compute_opportunities(&by_venue));

        info!(
            opportunities = opportunities.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Refresh cycle complete"
        );

        Ok(Snapshot {
            opportunities,
            venue_counts,
            refreshed_at: Utc::now(),
        })
    }
}
