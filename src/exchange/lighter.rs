//! Lighter funding feed.
//!
//! Funding is only published on the `market_stats/all` WebSocket channel.
//! The adapter resolves market ids to symbols over REST, subscribes, and
//! collects frames until a full snapshot arrives, the stream ends, or the
//! collection window elapses. On deadline the partial map is returned.

use crate::config::LighterConfig;
use crate::exchange::traits::{FundingDataProvider, RawQuote, Venue};
use crate::exchange::types::http_client;
use crate::utils::decimal::deserialize_flexible_decimal;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::{sleep_until, timeout, timeout_at, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, instrument, trace, warn};

const BASE_URL: &str = "https://mainnet.zklighter.elliot.ai";
const WS_URL: &str = "wss://mainnet.zklighter.elliot.ai/stream";
const SUBSCRIBE_CHANNEL: &str = "market_stats/all";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
/// Headroom left between the collection deadline and the provider timeout.
const TIMEOUT_HEADROOM: Duration = Duration::from_millis(500);

/// Rates above this magnitude (percent per hour) are logged as suspicious.
const SUSPICIOUS_RATE: Decimal = dec!(10);

#[derive(Debug, Clone, Deserialize)]
pub struct OrderBooksResponse {
    #[serde(default)]
    pub order_books: Vec<OrderBookEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderBookEntry {
    pub market_id: u64,
    pub symbol: String,
}

/// One `market_stats` entry. Rates are already in percent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketStats {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub market_id: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_flexible_decimal")]
    pub current_funding_rate: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_flexible_decimal")]
    pub funding_rate: Option<Decimal>,
}

impl MarketStats {
    fn rate(&self) -> Option<Decimal> {
        self.current_funding_rate.or(self.funding_rate)
    }
}

/// What a frame contributed to the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Not a funding frame (connection notices, acks, other channels).
    Ignored,
    /// Incremental update; keep collecting.
    Partial,
    /// Snapshot of every market; collection can stop.
    Complete,
}

/// Lighter market stats collector.
pub struct LighterClient {
    http: Client,
    base_url: String,
    ws_url: String,
    auth_token: Option<String>,
    collect_window: Duration,
    timeout: Duration,
}

impl LighterClient {
    /// Create a new Lighter client from configuration.
    pub fn new(config: &LighterConfig) -> Result<Self> {
        let timeout = config
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        Ok(Self {
            http: http_client(timeout)?,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| BASE_URL.to_string()),
            ws_url: config.ws_url.clone().unwrap_or_else(|| WS_URL.to_string()),
            auth_token: config.auth_token.clone().filter(|t| !t.is_empty()),
            collect_window: Duration::from_secs(config.collect_window_secs),
            timeout,
        })
    }

    /// Override the collection window (used by tests).
    pub fn with_collect_window(mut self, window: Duration) -> Self {
        self.collect_window = window;
        self
    }

    /// Map of market id to symbol from the order book listing.
    #[instrument(skip(self), name = "lighter_order_books")]
    pub async fn get_market_symbols(&self) -> Result<HashMap<u64, String>> {
        let url = format!("{}/api/v1/orderBooks", self.base_url);
        let mut request = self.http.get(&url);
        if let Some(token) = &self.auth_token {
            request = request.header("Authorization", token.as_str());
        }

        let response = request
            .send()
            .await
            .context("Failed to fetch Lighter order books")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Lighter API error {}: {}", status, body);
        }

        let data: OrderBooksResponse = response
            .json()
            .await
            .context("Failed to parse Lighter order books response")?;

        Ok(data
            .order_books
            .into_iter()
            .map(|b| (b.market_id, b.symbol))
            .collect())
    }

    /// Time one fetch may spend before returning what it has. Always ends
    /// inside the provider timeout so a partial map is never discarded.
    fn collection_budget(&self) -> Duration {
        self.collect_window
            .min(self.timeout.saturating_sub(TIMEOUT_HEADROOM))
    }

    /// Subscribe to market stats and collect funding rates until `deadline`.
    #[instrument(skip(self, symbols), name = "lighter_market_stats")]
    pub async fn collect_market_stats(
        &self,
        symbols: &HashMap<u64, String>,
        deadline: Instant,
    ) -> Result<HashMap<String, RawQuote>> {
        info!("Connecting to WebSocket: {}", self.ws_url);

        let (ws_stream, _) = timeout_at(deadline, connect_async(self.ws_url.as_str()))
            .await
            .map_err(|_| anyhow::anyhow!("Timed out connecting to WebSocket"))?
            .context("Failed to connect to WebSocket")?;

        let (mut write, mut read) = ws_stream.split();

        let subscribe = serde_json::json!({
            "type": "subscribe",
            "channel": SUBSCRIBE_CHANNEL,
        });
        write
            .send(Message::Text(subscribe.to_string().into()))
            .await
            .context("Failed to send market_stats subscription")?;

        let mut quotes = HashMap::new();
        let deadline = sleep_until(deadline);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    debug!("Collection window elapsed with {} markets", quotes.len());
                    break;
                }
                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<Value>(text.as_str()) {
                            Ok(frame) => {
                                if apply_frame(&frame, symbols, &mut quotes) == FrameOutcome::Complete {
                                    debug!("Received all market data ({} markets)", quotes.len());
                                    break;
                                }
                            }
                            Err(e) => trace!("Unparseable Lighter frame: {}", e),
                        }
                    }
                    Some(Ok(Message::Ping(_))) => {
                        // Pong is handled automatically by tungstenite
                        debug!("Received ping");
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket closed by server");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }

        let _ = write.close().await;
        Ok(quotes)
    }
}

/// Fold one decoded frame into `quotes`.
///
/// Accepts `update/market_stats` (one market), `market_stats/all` (object of
/// markets keyed by index) and untyped frames carrying `market_stats`.
pub fn apply_frame(
    frame: &Value,
    symbols: &HashMap<u64, String>,
    quotes: &mut HashMap<String, RawQuote>,
) -> FrameOutcome {
    let Some(stats) = frame.get("market_stats") else {
        trace!(frame_type = ?frame.get("type"), "Ignoring Lighter frame");
        return FrameOutcome::Ignored;
    };

    let typed = match frame.get("type").and_then(Value::as_str) {
        Some("update/market_stats") | Some("market_stats/all") => true,
        None => false,
        Some(other) => {
            trace!("Ignoring Lighter frame type {}", other);
            return FrameOutcome::Ignored;
        }
    };

    if stats.get("market_id").is_some() {
        if let Ok(entry) = serde_json::from_value::<MarketStats>(stats.clone()) {
            insert_stats(&entry, None, symbols, quotes);
        }
        return FrameOutcome::Partial;
    }

    let Some(markets) = stats.as_object() else {
        return FrameOutcome::Ignored;
    };

    for (index, raw) in markets {
        if let Ok(entry) = serde_json::from_value::<MarketStats>(raw.clone()) {
            insert_stats(&entry, Some(index.as_str()), symbols, quotes);
        }
    }

    if typed || !quotes.is_empty() {
        FrameOutcome::Complete
    } else {
        FrameOutcome::Partial
    }
}

fn insert_stats(
    stats: &MarketStats,
    index: Option<&str>,
    symbols: &HashMap<u64, String>,
    quotes: &mut HashMap<String, RawQuote>,
) {
    let Some(rate) = stats.rate() else {
        return;
    };

    let index_id = index.and_then(|i| i.parse::<u64>().ok());
    let ticker = stats
        .symbol
        .clone()
        .filter(|s| !s.is_empty())
        .or_else(|| stats.market_id.and_then(|id| symbols.get(&id).cloned()))
        .or_else(|| index_id.and_then(|id| symbols.get(&id).cloned()))
        .unwrap_or_else(|| match (stats.market_id, index) {
            (Some(id), _) => format!("MARKET_{}", id),
            (None, Some(i)) => format!("MARKET_{}", i),
            (None, None) => "MARKET_UNKNOWN".to_string(),
        });

    if rate.abs() > SUSPICIOUS_RATE {
        warn!(ticker = %ticker, rate = %rate, "Unusually large Lighter funding rate");
    }

    let quote = RawQuote::new(ticker.clone(), Some(rate))
        .with_interval(Venue::Lighter.default_interval_hours());
    quotes.insert(ticker, quote);
}

#[async_trait]
impl FundingDataProvider for LighterClient {
    fn venue(&self) -> Venue {
        Venue::Lighter
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch_raw_quotes(&self) -> Result<HashMap<String, RawQuote>> {
        let budget = self.collection_budget();
        let deadline = Instant::now() + budget;

        // The symbol lookup may use at most half the budget; the stream gets the rest.
        let symbols = match timeout(budget / 2, self.get_market_symbols()).await {
            Ok(Ok(symbols)) => symbols,
            Ok(Err(e)) => {
                warn!("Lighter symbol map unavailable: {:#}", e);
                HashMap::new()
            }
            Err(_) => {
                warn!("Lighter symbol map timed out after {:?}", budget / 2);
                HashMap::new()
            }
        };
        self.collect_market_stats(&symbols, deadline).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::FundingScanner;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::net::TcpListener;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn symbols() -> HashMap<u64, String> {
        HashMap::from([(0, "ETH".to_string()), (1, "BTC".to_string())])
    }

    /// Serve one WebSocket client: read the subscription, push frames, then
    /// keep the socket open for `hold`.
    async fn spawn_ws_server(frames: Vec<Value>, hold: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let subscribe = ws.next().await.unwrap().unwrap();
            let subscribe: Value = serde_json::from_str(subscribe.to_text().unwrap()).unwrap();
            assert_eq!(subscribe["channel"], "market_stats/all");
            for frame in frames {
                ws.send(Message::Text(frame.to_string().into())).await.unwrap();
            }
            tokio::time::sleep(hold).await;
        });
        format!("ws://{}", addr)
    }

    fn client(base_url: &str, ws_url: &str, window: Duration) -> LighterClient {
        LighterClient::new(&LighterConfig {
            base_url: Some(base_url.to_string()),
            ws_url: Some(ws_url.to_string()),
            auth_token: Some("ro:test".to_string()),
            ..Default::default()
        })
        .unwrap()
        .with_collect_window(window)
    }

    #[test]
    fn test_single_update_uses_symbol_map() {
        let mut quotes = HashMap::new();
        let frame = json!({
            "type": "update/market_stats",
            "channel": "market_stats:1",
            "market_stats": {"market_id": 1, "current_funding_rate": "0.0078"}
        });

        assert_eq!(apply_frame(&frame, &symbols(), &mut quotes), FrameOutcome::Partial);
        let btc = &quotes["BTC"];
        assert_eq!(btc.rate, Some(dec!(0.0078)));
        assert_eq!(btc.interval_hours, Some(dec!(1)));
    }

    #[test]
    fn test_all_markets_frame_is_complete() {
        let mut quotes = HashMap::new();
        let frame = json!({
            "type": "market_stats/all",
            "market_stats": {
                "0": {"market_id": 0, "symbol": "ETH", "funding_rate": "-0.0012"},
                "7": {"current_funding_rate": 0.002},
                "9": {"market_id": 9}
            }
        });

        assert_eq!(apply_frame(&frame, &symbols(), &mut quotes), FrameOutcome::Complete);
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes["ETH"].rate, Some(dec!(-0.0012)));
        assert_eq!(quotes["MARKET_7"].rate, Some(dec!(0.002)));
    }

    #[test]
    fn test_untyped_frame_and_unknown_types() {
        let mut quotes = HashMap::new();
        let untyped = json!({"market_stats": {"1": {"funding_rate": "0.001"}}});
        assert_eq!(apply_frame(&untyped, &symbols(), &mut quotes), FrameOutcome::Complete);
        assert_eq!(quotes["BTC"].rate, Some(dec!(0.001)));

        let connected = json!({"type": "connected", "session_id": "abc"});
        assert_eq!(apply_frame(&connected, &symbols(), &mut quotes), FrameOutcome::Ignored);

        let other = json!({"type": "update/trade", "market_stats": {"market_id": 0}});
        assert_eq!(apply_frame(&other, &symbols(), &mut quotes), FrameOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_collects_until_full_snapshot() {
        let rest = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/orderBooks"))
            .and(header("Authorization", "ro:test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "order_books": [
                    {"symbol": "ETH", "market_id": 0, "status": "active"},
                    {"symbol": "BTC", "market_id": 1, "status": "active"}
                ]
            })))
            .mount(&rest)
            .await;

        let ws_url = spawn_ws_server(
            vec![
                json!({"type": "connected"}),
                json!({"type": "market_stats/all", "market_stats": {
                    "0": {"market_id": 0, "current_funding_rate": "0.0081"},
                    "1": {"market_id": 1, "current_funding_rate": "0.0012"}
                }}),
            ],
            Duration::from_secs(5),
        )
        .await;

        let lighter = client(&rest.uri(), &ws_url, Duration::from_secs(5));
        let started = std::time::Instant::now();
        let quotes = lighter.fetch_raw_quotes().await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes["ETH"].rate, Some(dec!(0.0081)));
    }

    #[tokio::test]
    async fn test_deadline_returns_partial_map() {
        let rest = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/orderBooks"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&rest)
            .await;

        let ws_url = spawn_ws_server(
            vec![json!({
                "type": "update/market_stats",
                "market_stats": {"market_id": 3, "symbol": "SOL", "current_funding_rate": "0.004"}
            })],
            Duration::from_secs(5),
        )
        .await;

        let lighter = client(&rest.uri(), &ws_url, Duration::from_millis(300));
        let quotes = lighter.fetch_raw_quotes().await.unwrap();

        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes["SOL"].rate, Some(dec!(0.004)));
    }

    #[tokio::test]
    async fn test_slow_symbol_lookup_keeps_partial_map_within_timeout() {
        let rest = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/orderBooks"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"order_books": []}))
                    .set_delay(Duration::from_secs(1)),
            )
            .mount(&rest)
            .await;

        let ws_url = spawn_ws_server(
            vec![json!({
                "type": "update/market_stats",
                "market_stats": {"market_id": 3, "symbol": "SOL", "current_funding_rate": "0.004"}
            })],
            Duration::from_secs(5),
        )
        .await;

        let lighter = LighterClient::new(&LighterConfig {
            base_url: Some(rest.uri()),
            ws_url: Some(ws_url),
            timeout_secs: Some(2),
            ..Default::default()
        })
        .unwrap()
        .with_collect_window(Duration::from_millis(1500));

        let scanner = FundingScanner::new(vec![Arc::new(lighter)]);
        let started = std::time::Instant::now();
        let collected = scanner.collect().await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(collected[0].venue, Venue::Lighter);
        assert_eq!(collected[0].len(), 1);
        assert_eq!(collected[0].quotes["SOL"].rate, Some(dec!(0.004)));
    }

    #[test]
    fn test_collection_budget_fits_inside_timeout() {
        let lighter = LighterClient::new(&LighterConfig {
            timeout_secs: Some(2),
            collect_window_secs: 15,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(lighter.collection_budget(), Duration::from_millis(1500));

        let short = lighter.with_collect_window(Duration::from_millis(300));
        assert_eq!(short.collection_budget(), Duration::from_millis(300));
    }
}
