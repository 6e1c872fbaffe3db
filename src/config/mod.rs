//! Configuration management for the funding rate arbitrage scanner.
//!
//! Loads settings from `.env`, an optional `config.toml`, and `FRA__*`
//! environment variables. Secrets are never defaulted: an enabled feature
//! whose credentials are missing fails validation at startup.

use crate::error::ConfigError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Refresh cycle and ranking defaults
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub variational: VenueConfig,
    #[serde(default)]
    pub binance: VenueConfig,
    #[serde(default)]
    pub bybit: BybitConfig,
    #[serde(default)]
    pub hyperliquid: VenueConfig,
    #[serde(default)]
    pub lighter: LighterConfig,
    #[serde(default)]
    pub extended: VenueConfig,
    /// Telegram notifier and bot
    #[serde(default)]
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address for the HTTP server
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Seconds between refresh cycles in `serve` mode
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    /// Number of opportunities returned when the caller does not ask
    #[serde(default = "default_top")]
    pub default_top: usize,
}

/// Settings shared by the public, unauthenticated venues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Override of the venue's production base URL
    #[serde(default)]
    pub base_url: Option<String>,
    /// Override of the per-cycle fetch timeout
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BybitConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// API key for request signing
    #[serde(default)]
    pub api_key: String,
    /// Secret key for request signing
    #[serde(default)]
    pub api_secret: String,
    #[serde(default = "default_recv_window")]
    pub recv_window_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LighterConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Streaming endpoint for `market_stats/all`
    #[serde(default)]
    pub ws_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// How long to keep the subscription open collecting frames
    #[serde(default = "default_collect_window")]
    pub collect_window_secs: u64,
    /// Read-only token for the order book listing (optional)
    #[serde(default)]
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Send scheduled notifications from `serve`
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: String,
    /// Default destination for scheduled notifications
    #[serde(default)]
    pub chat_id: String,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
    /// Shared aggregation endpoint (e.g. `https://host/arbitrage`).
    /// When unset, the bot reads the in-process board.
    #[serde(default)]
    pub aggregation_url: Option<String>,
    #[serde(default = "default_notify_interval")]
    pub notify_interval_secs: u64,
    /// Opportunities per message
    #[serde(default = "default_top")]
    pub top: usize,
}

/// Validated Telegram credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramCredentials {
    pub bot_token: String,
    pub chat_id: String,
}

// Default value functions
fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_refresh_interval() -> u64 {
    60
}

fn default_top() -> usize {
    3
}

fn default_enabled() -> bool {
    true
}

fn default_recv_window() -> u64 {
    5000
}

fn default_collect_window() -> u64 {
    15
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".to_string()
}

fn default_notify_interval() -> u64 {
    3600 // hourly
}

impl Config {
    /// Load configuration from environment variables and config files.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::default().separator("__").prefix("FRA"))
            .set_override_option("bybit.api_key", env("BYBIT_API_KEY"))?
            .set_override_option("bybit.api_secret", env("BYBIT_API_SECRET"))?
            .set_override_option("lighter.auth_token", env("LIGHTER_AUTH_TOKEN"))?
            .set_override_option("telegram.bot_token", env("TELEGRAM_BOT_TOKEN"))?
            .set_override_option("telegram.chat_id", env("TELEGRAM_CHAT_ID"))?
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.default_top == 0 {
            return Err(ConfigError::Invalid {
                key: "scan.default_top",
                reason: "must be at least 1",
            });
        }

        if self.scan.refresh_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "scan.refresh_interval_secs",
                reason: "must be positive",
            });
        }

        if self.lighter.enabled && self.lighter.collect_window_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "lighter.collect_window_secs",
                reason: "must be positive",
            });
        }

        if self.bybit.enabled {
            if self.bybit.api_key.is_empty() {
                return Err(ConfigError::MissingCredential {
                    key: "bybit.api_key",
                    feature: "bybit",
                });
            }
            if self.bybit.api_secret.is_empty() {
                return Err(ConfigError::MissingCredential {
                    key: "bybit.api_secret",
                    feature: "bybit",
                });
            }
        }

        if self.telegram.enabled {
            self.telegram.credentials()?;
            if self.telegram.notify_interval_secs == 0 {
                return Err(ConfigError::Invalid {
                    key: "telegram.notify_interval_secs",
                    reason: "must be positive",
                });
            }
        }

        Ok(())
    }
}

impl TelegramConfig {
    /// Return the bot token and default chat id, or the missing key.
    pub fn credentials(&self) -> Result<TelegramCredentials, ConfigError> {
        if self.bot_token.is_empty() {
            return Err(ConfigError::MissingCredential {
                key: "telegram.bot_token",
                feature: "telegram",
            });
        }
        if self.chat_id.is_empty() {
            return Err(ConfigError::MissingCredential {
                key: "telegram.chat_id",
                feature: "telegram",
            });
        }
        Ok(TelegramCredentials {
            bot_token: self.bot_token.clone(),
            chat_id: self.chat_id.clone(),
        })
    }
}

impl VenueConfig {
    /// Configured base URL or the venue's production default.
    pub fn base_url_or(&self, default: &str) -> String {
        self.base_url.clone().unwrap_or_else(|| default.to_string())
    }

    /// Configured timeout or the venue's default.
    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout_secs.map(Duration::from_secs).unwrap_or(default)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
            default_top: default_top(),
        }
    }
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            base_url: None,
            timeout_secs: None,
        }
    }
}

impl Default for BybitConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            base_url: None,
            timeout_secs: None,
            api_key: String::new(),
            api_secret: String::new(),
            recv_window_ms: default_recv_window(),
        }
    }
}

impl Default for LighterConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            base_url: None,
            ws_url: None,
            timeout_secs: None,
            collect_window_secs: default_collect_window(),
            auth_token: None,
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: default_telegram_api(),
            aggregation_url: None,
            notify_interval_secs: default_notify_interval(),
            top: default_top(),
        }
    }
}
