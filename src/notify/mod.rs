//! Telegram notifier and bot.

pub mod aggregation;
pub mod bot;
pub mod feed;
pub mod format;
pub mod telegram;

use crate::config::Config;
use crate::exchange::build_rest_providers;
use crate::strategy::{FundingScanner, OpportunityBoard};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

pub use aggregation::AggregationClient;
pub use bot::{run_scheduled, BotCommand, NotifyOutcome, TelegramBot};
pub use feed::{OpportunityFeed, PrimarySource};
pub use format::{format_top_message, HELP_TEXT, LOADING_TEXT};
pub use telegram::{MessageSender, TelegramClient, Update};

/// Build the bot when credentials are configured. Without them the
/// webhook and notify routes answer with a credentials error.
pub fn build_bot(
    config: &Config,
    board: Arc<OpportunityBoard>,
    scanner: Arc<FundingScanner>,
) -> Result<Option<Arc<TelegramBot>>> {
    let Ok(credentials) = config.telegram.credentials() else {
        info!("Telegram credentials not configured, bot disabled");
        return Ok(None);
    };

    let primary = match &config.telegram.aggregation_url {
        Some(url) => PrimarySource::Remote(AggregationClient::new(url)?),
        None => PrimarySource::Local { board, scanner },
    };
    let feed = Arc::new(OpportunityFeed::new(primary, build_rest_providers(config)?));
    let sender = Arc::new(TelegramClient::new(&config.telegram.api_base, &credentials)?);

    Ok(Some(Arc::new(TelegramBot::new(
        sender,
        feed,
        credentials.chat_id,
        config.telegram.top,
    ))))
}
