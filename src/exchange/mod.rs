//! Exchange integrations for funding rate aggregation.
//!
//! Every adapter implements [`FundingDataProvider`] and returns raw quotes
//! in its venue's native basis:
//! - Variational: annualized percent, per-listing interval
//! - Binance, Bybit: percent per 8h (USDT-margined only; Bybit signs requests)
//! - Hyperliquid, Extended: percent per hour
//! - Lighter: percent per hour, collected over a WebSocket subscription

mod binance;
mod bybit;
mod extended;
pub mod hyperliquid;
mod lighter;
pub mod mock;
mod traits;
mod types;
mod variational;

use crate::config::Config;
use anyhow::Result;
use std::sync::Arc;

pub use binance::BinanceClient;
pub use bybit::{sign_request, BybitClient};
pub use extended::ExtendedClient;
pub use hyperliquid::HyperliquidClient;
pub use lighter::{apply_frame, FrameOutcome, LighterClient};
pub use mock::MockProvider;
pub use traits::*;
pub use types::{http_client, strip_quote_suffix, IntervalHints};
pub use variational::VariationalClient;

/// Build every enabled provider in canonical venue order.
pub fn build_providers(config: &Config) -> Result<Vec<Arc<dyn FundingDataProvider>>> {
    let mut providers: Vec<Arc<dyn FundingDataProvider>> = Vec::new();

    if config.variational.enabled {
        providers.push(Arc::new(VariationalClient::new(&config.variational)?));
    }
    if config.binance.enabled {
        providers.push(Arc::new(BinanceClient::new(&config.binance)?));
    }
    if config.bybit.enabled {
        providers.push(Arc::new(BybitClient::new(&config.bybit)?));
    }
    if config.hyperliquid.enabled {
        providers.push(Arc::new(HyperliquidClient::new(&config.hyperliquid)?));
    }
    if config.lighter.enabled {
        providers.push(Arc::new(LighterClient::new(&config.lighter)?));
    }
    if config.extended.enabled {
        providers.push(Arc::new(ExtendedClient::new(&config.extended)?));
    }

    Ok(providers)
}

/// Request/response providers only. The bot's fallback path skips the
/// streaming Lighter feed.
pub fn build_rest_providers(config: &Config) -> Result<Vec<Arc<dyn FundingDataProvider>>> {
    Ok(build_providers(config)?
        .into_iter()
        .filter(|p| p.venue() != Venue::Lighter)
        .collect())
}
