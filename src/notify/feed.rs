//! Where the bot gets its opportunity list.
//!
//! The primary source is the shared aggregation view (remote endpoint or the
//! in-process board). If it fails, an independent REST-only scan runs and is
//! ranked by raw spread instead of APR.

use crate::api::{ArbitrageEntry, ArbitrageResponse};
use crate::exchange::{FundingDataProvider, Venue};
use crate::notify::aggregation::AggregationClient;
use crate::strategy::{top_n, FundingScanner, Opportunity, OpportunityBoard, RankMode};
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

pub enum PrimarySource {
    /// `GET {url}?top=N` on a running aggregation endpoint.
    Remote(AggregationClient),
    /// The board published by this process's refresh loop.
    Local {
        board: Arc<OpportunityBoard>,
        scanner: Arc<FundingScanner>,
    },
}

pub struct OpportunityFeed {
    primary: PrimarySource,
    fallback: FundingScanner,
}

impl OpportunityFeed {
    /// `fallback_providers` should be the request/response venues only.
    pub fn new(primary: PrimarySource, fallback_providers: Vec<Arc<dyn FundingDataProvider>>) -> Self {
        Self {
            primary,
            fallback: FundingScanner::new(fallback_providers).with_rank_mode(RankMode::Spread),
        }
    }

    /// Top `n` entries, highest estimated APR first. Falls back to the
    /// spread-ranked scan when the primary source errors.
    pub async fn top(&self, n: usize) -> Result<Vec<ArbitrageEntry>> {
        match self.primary_top(n).await {
            Ok(mut entries) => {
                entries.sort_by(|a, b| b.estimated_apr.cmp(&a.estimated_apr));
                Ok(entries)
            }
            Err(e) => {
                warn!(error = %e, "Primary opportunity source failed, using fallback scan");
                self.fallback_top(n).await
            }
        }
    }

    async fn primary_top(&self, n: usize) -> Result<Vec<ArbitrageEntry>> {
        match &self.primary {
            PrimarySource::Remote(client) => client.fetch_top(n).await,
            PrimarySource::Local { board, scanner } => {
                let snapshot = board.latest_or_refresh(scanner).await?;
                Ok(ArbitrageResponse::from_ranked(&snapshot.opportunities, n).top)
            }
        }
    }

    /// Spread-ranked, limited to instruments listed on Variational.
    pub async fn fallback_top(&self, n: usize) -> Result<Vec<ArbitrageEntry>> {
        let snapshot = self.fallback.refresh().await?;
        let listed: Vec<Opportunity> = snapshot
            .opportunities
            .into_iter()
            .filter(|o| o.quote(Venue::Variational).is_some())
            .collect();

        info!(candidates = listed.len(), "Fallback scan complete");
        Ok(top_n(&listed, n)
            .iter()
            .map(ArbitrageEntry::from_opportunity)
            .collect())
    }
}
