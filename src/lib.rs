//! # Funding Rate Arb
//!
//! Aggregates perpetual funding rates from several venues, normalizes them
//! to a common unit, and ranks cross-venue funding arbitrage opportunities.
//!
//! ## Architecture
//!
//! - `config`: Configuration loading and validation
//! - `exchange`: Venue adapters (REST + one WebSocket feed)
//! - `strategy`: Normalizer, detector, ranking, and the refresh cycle
//! - `api`: Aggregation endpoint and Telegram hooks (axum)
//! - `notify`: Telegram notifier and bot
//! - `report`: Terminal tables for the CLI
//! - `utils`: Shared decimal arithmetic

pub mod api;
pub mod config;
pub mod error;
pub mod exchange;
pub mod notify;
pub mod report;
pub mod strategy;
pub mod utils;

pub use config::Config;
