//! Mock funding provider for tests and offline demos.

use super::traits::{FundingDataProvider, RawQuote, Venue};
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Provider that serves a fixed, replaceable set of quotes.
pub struct MockProvider {
    venue: Venue,
    quotes: Arc<RwLock<HashMap<String, RawQuote>>>,
    delay: Option<Duration>,
    fail: bool,
    timeout: Duration,
    fetch_count: AtomicU64,
}

impl MockProvider {
    pub fn new(venue: Venue) -> Self {
        Self {
            venue,
            quotes: Arc::new(RwLock::new(HashMap::new())),
            delay: None,
            fail: false,
            timeout: super::traits::DEFAULT_FETCH_TIMEOUT,
            fetch_count: AtomicU64::new(0),
        }
    }

    /// Add a quote at the venue's default interval.
    pub fn with_rate(self, ticker: &str, rate: Decimal) -> Self {
        let interval = self.venue.default_interval_hours();
        self.with_quote(RawQuote::new(ticker, Some(rate)).with_interval(interval))
    }

    pub fn with_quote(self, quote: RawQuote) -> Self {
        if let Ok(mut quotes) = self.quotes.try_write() {
            quotes.insert(quote.ticker.clone(), quote);
        }
        self
    }

    /// Sleep before answering, to exercise timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fail every fetch.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Replace the served quotes.
    pub async fn set_quotes(&self, quotes: impl IntoIterator<Item = RawQuote>) {
        *self.quotes.write().await = quotes
            .into_iter()
            .map(|q| (q.ticker.clone(), q))
            .collect();
    }

    pub fn fetch_count(&self) -> u64 {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FundingDataProvider for MockProvider {
    fn venue(&self) -> Venue {
        self.venue
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch_raw_quotes(&self) -> Result<HashMap<String, RawQuote>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            anyhow::bail!("{} mock failure", self.venue);
        }
        let quotes = self.quotes.read().await.clone();
        debug!(venue = %self.venue, quotes = quotes.len(), "Serving mock quotes");
        Ok(quotes)
    }
}

/// A small, fixed market across every venue for `scan --demo`.
pub fn demo_providers() -> Vec<Arc<dyn FundingDataProvider>> {
    vec![
        Arc::new(
            MockProvider::new(Venue::Variational)
                .with_quote(
                    RawQuote::new("BTC", Some(dec!(10)))
                        .with_interval(dec!(8))
                        .with_display_name("Bitcoin"),
                )
                .with_quote(
                    RawQuote::new("ETH", Some(dec!(-4.5)))
                        .with_interval(dec!(8))
                        .with_display_name("Ethereum"),
                ),
        ),
        Arc::new(
            MockProvider::new(Venue::Binance)
                .with_rate("BTC", dec!(0.0100))
                .with_rate("ETH", dec!(0.0080))
                .with_rate("SOL", dec!(-0.0150)),
        ),
        Arc::new(
            MockProvider::new(Venue::Bybit)
                .with_rate("BTC", dec!(0.0050))
                .with_rate("ETH", Decimal::ZERO)
                .with_rate("SOL", dec!(0.0100)),
        ),
        Arc::new(
            MockProvider::new(Venue::Hyperliquid)
                .with_rate("BTC", dec!(0.0002))
                .with_rate("SOL", dec!(0.0031)),
        ),
        Arc::new(MockProvider::new(Venue::Lighter).with_rate("ETH", dec!(0.0081))),
        Arc::new(MockProvider::new(Venue::Extended).with_rate("DOGE", dec!(0.0013))),
    ]
}
