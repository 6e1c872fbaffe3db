//! HTTP API route definitions.

use super::handlers::{arbitrage, health, notify, telegram_webhook, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/arbitrage", get(arbitrage))
        // Telegram
        .route("/telegram/webhook", get(telegram_webhook).post(telegram_webhook))
        .route("/notify", post(notify))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{FundingDataProvider, MockProvider, RawQuote, Venue};
    use crate::notify::telegram::MockMessageSender;
    use crate::notify::{OpportunityFeed, PrimarySource, TelegramBot};
    use crate::strategy::{FundingScanner, OpportunityBoard};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use rust_decimal_macros::dec;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn providers() -> Vec<Arc<dyn FundingDataProvider>> {
        vec![
            Arc::new(
                MockProvider::new(Venue::Variational)
                    .with_quote(RawQuote::new("BTC", Some(dec!(10.95))).with_interval(dec!(8))),
            ),
            Arc::new(
                MockProvider::new(Venue::Binance)
                    .with_rate("BTC", dec!(0.0100))
                    .with_rate("ETH", dec!(0.0300)),
            ),
            Arc::new(
                MockProvider::new(Venue::Hyperliquid)
                    .with_rate("BTC", dec!(0.0002))
                    .with_rate("ETH", dec!(-0.0100)),
            ),
        ]
    }

    fn state(providers: Vec<Arc<dyn FundingDataProvider>>) -> AppState {
        AppState::new(
            Arc::new(OpportunityBoard::new()),
            Arc::new(FundingScanner::new(providers)),
            3,
        )
    }

    fn state_with_bot(sender: MockMessageSender) -> AppState {
        let state = state(providers());
        let feed = Arc::new(OpportunityFeed::new(
            PrimarySource::Local {
                board: Arc::clone(&state.board),
                scanner: Arc::clone(&state.scanner),
            },
            Vec::new(),
        ));
        let bot = TelegramBot::new(Arc::new(sender), feed, "1", 3);
        state.with_bot(Some(Arc::new(bot)))
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_request(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = create_router(state(Vec::new()));
        let response = app.oneshot(get_request("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn arbitrage_returns_apr_ranked_top() {
        let app = create_router(state(providers()));
        let response = app.oneshot(get_request("/arbitrage?top=1")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["total"], 2);

        let top = json["top"].as_array().unwrap();
        assert_eq!(top.len(), 1);
        // ETH: 0.04% per 1h beats BTC's 0.0098%
        assert_eq!(top[0]["symbol"], "ETH");
        assert_eq!(top[0]["longExchange"], "hyperliquid");
        assert_eq!(top[0]["shortExchange"], "binance");
        assert!(top[0]["variational"].is_null());
    }

    #[tokio::test]
    async fn arbitrage_defaults_top_and_reuses_snapshot() {
        let state = state(providers());
        let board = Arc::clone(&state.board);
        let app = create_router(state);

        let response = app
            .clone()
            .oneshot(get_request("/arbitrage?top=abc"))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["top"].as_array().unwrap().len(), 2);
        let first = board.latest().await.unwrap();

        app.oneshot(get_request("/arbitrage")).await.unwrap();
        let second = board.latest().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    struct Panicking;

    #[async_trait]
    impl FundingDataProvider for Panicking {
        fn venue(&self) -> Venue {
            Venue::Binance
        }

        async fn fetch_raw_quotes(&self) -> anyhow::Result<HashMap<String, RawQuote>> {
            panic!("adapter bug")
        }
    }

    #[tokio::test]
    async fn arbitrage_failure_is_500_with_message() {
        let app = create_router(state(vec![Arc::new(Panicking)]));
        let response = app.oneshot(get_request("/arbitrage")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(response).await;
        assert_eq!(json["error"], "Internal server error");
        assert!(json["message"].is_string());
    }

    #[tokio::test]
    async fn telegram_routes_without_credentials_are_400() {
        let app = create_router(state(providers()));

        let response = app
            .clone()
            .oneshot(post_request("/telegram/webhook", "{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Missing Telegram credentials");

        let response = app.oneshot(post_request("/notify", "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn webhook_get_is_liveness_probe() {
        let app = create_router(state_with_bot(MockMessageSender::new()));
        let response = app.oneshot(get_request("/telegram/webhook")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["message"], "Webhook endpoint is active");
    }

    #[tokio::test]
    async fn webhook_invalid_post_body_is_500() {
        let app = create_router(state_with_bot(MockMessageSender::new()));
        let response = app
            .oneshot(post_request("/telegram/webhook", "not json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["message"], "Invalid request body");
    }

    #[tokio::test]
    async fn webhook_funding_command_acknowledges() {
        let mut sender = MockMessageSender::new();
        sender
            .expect_send_message()
            .times(2)
            .returning(|_, _| Ok(()));

        let app = create_router(state_with_bot(sender));
        let response = app
            .oneshot(post_request(
                "/telegram/webhook",
                r#"{"message": {"chat": {"id": 5}, "text": "/funding"}}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["ok"], true);
        assert_eq!(json["message"], "Notification sent");
    }

    #[tokio::test]
    async fn notify_sends_top_list() {
        let mut sender = MockMessageSender::new();
        sender
            .expect_send_message()
            .withf(|chat, text| chat == "1" && text.contains("#1 ETH"))
            .times(1)
            .returning(|_, _| Ok(()));

        let app = create_router(state_with_bot(sender));
        let response = app.oneshot(post_request("/notify", "")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["top"].as_array().unwrap().len(), 2);
    }
}
