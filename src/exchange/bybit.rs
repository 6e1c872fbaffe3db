//! Bybit v5 linear tickers client with HMAC request signing.

use crate::config::BybitConfig;
use crate::exchange::traits::{FundingDataProvider, RawQuote, Venue, DEFAULT_FETCH_TIMEOUT};
use crate::exchange::types::{http_client, strip_quote_suffix, IntervalHints};
use crate::utils::decimal::{deserialize_flexible_decimal, to_percent};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, instrument};

const BASE_URL: &str = "https://api.bybit.com";

/// Envelope of every v5 response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickersResponse {
    #[serde(default)]
    pub ret_code: i64,
    #[serde(default)]
    pub ret_msg: String,
    #[serde(default)]
    pub result: Option<TickersResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TickersResult {
    #[serde(default)]
    pub list: Vec<LinearTicker>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearTicker {
    pub symbol: String,
    /// Decimal fraction per interval
    #[serde(default, deserialize_with = "deserialize_flexible_decimal")]
    pub funding_rate: Option<Decimal>,
    #[serde(flatten)]
    pub interval: IntervalHints,
}

/// Bybit client for linear perpetual funding rates.
pub struct BybitClient {
    http: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    recv_window_ms: u64,
    timeout: Duration,
}

impl BybitClient {
    /// Create a new Bybit client from configuration.
    pub fn new(config: &BybitConfig) -> Result<Self> {
        let timeout = config
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_FETCH_TIMEOUT);

        Ok(Self {
            http: http_client(timeout)?,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| BASE_URL.to_string()),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            recv_window_ms: config.recv_window_ms,
            timeout,
        })
    }

    /// Get tickers for every linear contract.
    #[instrument(skip(self), name = "bybit_linear_tickers")]
    pub async fn get_tickers(&self) -> Result<Vec<LinearTicker>> {
        let mut params = BTreeMap::new();
        params.insert("category", "linear");
        let query = sorted_query(&params);

        let timestamp = chrono::Utc::now().timestamp_millis().to_string();
        let signature = sign_request(&self.api_secret, &timestamp, &self.api_key, &query)?;

        let url = format!("{}/v5/market/tickers?{}", self.base_url, query);
        let response = self
            .http
            .get(&url)
            .header("X-BAPI-API-KEY", &self.api_key)
            .header("X-BAPI-TIMESTAMP", &timestamp)
            .header("X-BAPI-SIGN", signature)
            .header("X-BAPI-RECV-WINDOW", self.recv_window_ms.to_string())
            .send()
            .await
            .context("Failed to fetch Bybit tickers")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Bybit API error {}: {}", status, body);
        }

        let data: TickersResponse = response
            .json()
            .await
            .context("Failed to parse Bybit tickers response")?;

        if data.ret_code != 0 {
            anyhow::bail!("Bybit retCode {}: {}", data.ret_code, data.ret_msg);
        }

        Ok(data.result.map(|r| r.list).unwrap_or_default())
    }
}

/// Query string with keys in ascending order, as signed.
fn sorted_query(params: &BTreeMap<&str, &str>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// `hex(HMAC_SHA256(secret, timestamp + api_key + query))`
pub fn sign_request(secret: &str, timestamp: &str, api_key: &str, query: &str) -> Result<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow!("Invalid HMAC key: {}", e))?;
    mac.update(timestamp.as_bytes());
    mac.update(api_key.as_bytes());
    mac.update(query.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[async_trait]
impl FundingDataProvider for BybitClient {
    fn venue(&self) -> Venue {
        Venue::Bybit
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch_raw_quotes(&self) -> Result<HashMap<String, RawQuote>> {
        let tickers = self.get_tickers().await?;

        let quotes: HashMap<String, RawQuote> = tickers
            .into_iter()
            .filter_map(|t| {
                let ticker = strip_quote_suffix(&t.symbol, "USDT")?.to_string();
                let mut quote = RawQuote::new(ticker.clone(), t.funding_rate.and_then(to_percent));
                quote.interval_hours = t.interval.resolve();
                Some((ticker, quote))
            })
            .collect();

        debug!("Parsed {} USDT perpetuals from Bybit", quotes.len());
        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> BybitConfig {
        BybitConfig {
            base_url: Some(base_url.to_string()),
            api_key: "test-key".to_string(),
            api_secret: "test-secret".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_sign_request_matches_reference_vector() {
        let sig = sign_request("test-secret", "1700000000000", "test-key", "category=linear").unwrap();
        assert_eq!(
            sig,
            "8a7f0c2413805d2693f227012d1f8f390572ce5cc2dcb3efc0d3d73c4ae5adc4"
        );
    }

    #[test]
    fn test_sorted_query() {
        let mut params = BTreeMap::new();
        params.insert("symbol", "BTCUSDT");
        params.insert("category", "linear");
        assert_eq!(sorted_query(&params), "category=linear&symbol=BTCUSDT");
    }

    #[tokio::test]
    async fn test_signed_request_and_parsing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v5/market/tickers"))
            .and(query_param("category", "linear"))
            .and(header("X-BAPI-API-KEY", "test-key"))
            .and(header("X-BAPI-RECV-WINDOW", "5000"))
            .and(header_exists("X-BAPI-SIGN"))
            .and(header_exists("X-BAPI-TIMESTAMP"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "retCode": 0,
                "retMsg": "OK",
                "result": {
                    "category": "linear",
                    "list": [
                        {"symbol": "BTCUSDT", "fundingRate": "0.00005"},
                        {"symbol": "ETHUSDT", "fundingRate": "0"},
                        {"symbol": "BTCPERP", "fundingRate": "0.0001"}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let client = BybitClient::new(&config(&server.uri())).unwrap();
        let quotes = client.fetch_raw_quotes().await.unwrap();

        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes["BTC"].rate, Some(dec!(0.005)));
        // Zero is kept here; the normalizer owns the zero-drop policy.
        assert_eq!(quotes["ETH"].rate, Some(Decimal::ZERO));
    }

    #[tokio::test]
    async fn test_nonzero_ret_code_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v5/market/tickers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "retCode": 10003,
                "retMsg": "API key is invalid."
            })))
            .mount(&server)
            .await;

        let client = BybitClient::new(&config(&server.uri())).unwrap();
        let err = client.fetch_raw_quotes().await.unwrap_err();
        assert!(err.to_string().contains("10003"));
        assert!(client.fetch_quotes().await.is_empty());
    }
}
