//! HTTP API handlers.

use crate::api::types::{ArbitrageEntry, ArbitrageResponse, ErrorResponse};
use crate::error::{ApiError, NotifyError};
use crate::notify::{BotCommand, NotifyOutcome, TelegramBot, Update};
use crate::strategy::{FundingScanner, OpportunityBoard};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Snapshot published by the refresh loop.
    pub board: Arc<OpportunityBoard>,
    /// Used inline when no snapshot exists yet.
    pub scanner: Arc<FundingScanner>,
    pub default_top: usize,
    /// `None` when Telegram credentials are not configured.
    pub bot: Option<Arc<TelegramBot>>,
}

impl AppState {
    pub fn new(board: Arc<OpportunityBoard>, scanner: Arc<FundingScanner>, default_top: usize) -> Self {
        Self {
            board,
            scanner,
            default_top,
            bot: None,
        }
    }

    pub fn with_bot(mut self, bot: Option<Arc<TelegramBot>>) -> Self {
        self.bot = bot;
        self
    }

    fn bot(&self) -> Result<&Arc<TelegramBot>, ApiError> {
        self.bot
            .as_ref()
            .ok_or(ApiError::Notify(NotifyError::MissingCredentials))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Notify(NotifyError::MissingCredentials) => {
                (StatusCode::BAD_REQUEST, ErrorResponse::new(self.to_string()))
            }
            _ => {
                error!(error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::internal(self.to_string()),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct ArbitrageQuery {
    /// Unparseable values fall back to the configured default.
    pub top: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    pub message: &'static str,
    pub top: Vec<ArbitrageEntry>,
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// `GET /arbitrage?top=N`
pub async fn arbitrage(
    State(state): State<AppState>,
    Query(query): Query<ArbitrageQuery>,
) -> Result<Json<ArbitrageResponse>, ApiError> {
    let top = query
        .top
        .as_deref()
        .and_then(|t| t.trim().parse::<usize>().ok())
        .unwrap_or(state.default_top);

    let snapshot = state
        .board
        .latest_or_refresh(&state.scanner)
        .await
        .map_err(ApiError::Refresh)?;

    debug!(top, opportunities = snapshot.opportunities.len(), "Serving arbitrage");
    Ok(Json(ArbitrageResponse::from_ranked(&snapshot.opportunities, top)))
}

/// Telegram webhook. A GET without an update body is a liveness probe.
pub async fn telegram_webhook(
    State(state): State<AppState>,
    method: Method,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let bot = state.bot()?;

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(_) if method == Method::GET => {
            return Ok(Json(WebhookResponse {
                ok: None,
                message: Some("Webhook endpoint is active"),
            }))
        }
        Err(_) => return Err(ApiError::InvalidBody),
    };

    let message = match bot.handle_update(&update).await? {
        BotCommand::Top => Some("Notification sent"),
        BotCommand::Help | BotCommand::Other => None,
    };
    Ok(Json(WebhookResponse {
        ok: Some(true),
        message,
    }))
}

/// `POST /notify`: push the current top list to the configured chat.
pub async fn notify(State(state): State<AppState>) -> Result<Json<NotifyResponse>, ApiError> {
    let response = match state.bot()?.notify().await? {
        NotifyOutcome::NoOpportunities => NotifyResponse {
            success: None,
            message: "No arbitrage opportunities found",
            top: Vec::new(),
        },
        NotifyOutcome::Sent(top) => NotifyResponse {
            success: Some(true),
            message: "Telegram notification sent successfully",
            top,
        },
    };
    Ok(Json(response))
}
