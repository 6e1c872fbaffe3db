//! Chat commands and outbound notifications.

use crate::api::ArbitrageEntry;
use crate::error::NotifyError;
use crate::notify::feed::OpportunityFeed;
use crate::notify::format::{format_top_message, HELP_TEXT, LOADING_TEXT};
use crate::notify::telegram::{MessageSender, Update};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, instrument};

/// Command recognized in an incoming chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    /// `/funding` or `/start`
    Top,
    Help,
    /// Anything else, including non-message updates
    Other,
}

impl BotCommand {
    pub fn parse(text: &str) -> Self {
        if text.starts_with("/funding") || text.starts_with("/start") {
            BotCommand::Top
        } else if text.starts_with("/help") {
            BotCommand::Help
        } else {
            BotCommand::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotifyOutcome {
    /// Nothing to report; no message was sent.
    NoOpportunities,
    Sent(Vec<ArbitrageEntry>),
}

pub struct TelegramBot {
    sender: Arc<dyn MessageSender>,
    feed: Arc<OpportunityFeed>,
    /// Destination of scheduled notifications
    chat_id: String,
    top: usize,
}

impl TelegramBot {
    pub fn new(
        sender: Arc<dyn MessageSender>,
        feed: Arc<OpportunityFeed>,
        chat_id: impl Into<String>,
        top: usize,
    ) -> Self {
        Self {
            sender,
            feed,
            chat_id: chat_id.into(),
            top,
        }
    }

    async fn fetch_top(&self) -> Result<Vec<ArbitrageEntry>, NotifyError> {
        self.feed.top(self.top).await.map_err(NotifyError::Source)
    }

    async fn send(&self, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        self.sender
            .send_message(chat_id, text)
            .await
            .map_err(NotifyError::Delivery)
    }

    /// Send the current top list to the configured chat.
    #[instrument(skip(self), name = "telegram_notify")]
    pub async fn notify(&self) -> Result<NotifyOutcome, NotifyError> {
        let entries = self.fetch_top().await?;
        if entries.is_empty() {
            info!("No arbitrage opportunities, skipping notification");
            return Ok(NotifyOutcome::NoOpportunities);
        }

        self.send(&self.chat_id, &format_top_message(&entries, Utc::now()))
            .await?;
        info!(entries = entries.len(), "Notification sent");
        Ok(NotifyOutcome::Sent(entries))
    }

    /// Reply to one webhook update in its originating chat.
    #[instrument(skip(self, update), name = "telegram_update")]
    pub async fn handle_update(&self, update: &Update) -> Result<BotCommand, NotifyError> {
        let Some(message) = &update.message else {
            return Ok(BotCommand::Other);
        };
        let chat_id = message.chat.id.as_str();
        let command = BotCommand::parse(message.text.as_deref().unwrap_or(""));

        match command {
            BotCommand::Top => {
                self.send(chat_id, LOADING_TEXT).await?;
                let entries = self.fetch_top().await?;
                self.send(chat_id, &format_top_message(&entries, Utc::now()))
                    .await?;
            }
            BotCommand::Help => self.send(chat_id, HELP_TEXT).await?,
            BotCommand::Other => {}
        }

        Ok(command)
    }
}

/// Notify on a fixed interval until `shutdown` flips to true. Failures are
/// logged; the next tick is the retry.
pub async fn run_scheduled(bot: Arc<TelegramBot>, every: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(every);
    // The first tick completes immediately; skip it so startup doesn't notify.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match bot.notify().await {
                    Ok(NotifyOutcome::Sent(entries)) => {
                        info!("📨 [NOTIFY] Scheduled notification sent ({} entries)", entries.len());
                    }
                    Ok(NotifyOutcome::NoOpportunities) => {}
                    Err(e) => error!("❌ [NOTIFY] Scheduled notification failed: {}", e),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{FundingDataProvider, MockProvider, Venue};
    use crate::notify::feed::PrimarySource;
    use crate::notify::telegram::MockMessageSender;
    use crate::strategy::{FundingScanner, OpportunityBoard};
    use mockall::predicate::eq;
    use mockall::Sequence;
    use rust_decimal_macros::dec;

    fn feed(providers: Vec<Arc<dyn FundingDataProvider>>) -> Arc<OpportunityFeed> {
        Arc::new(OpportunityFeed::new(
            PrimarySource::Local {
                board: Arc::new(OpportunityBoard::new()),
                scanner: Arc::new(FundingScanner::new(providers)),
            },
            Vec::new(),
        ))
    }

    fn market() -> Vec<Arc<dyn FundingDataProvider>> {
        vec![
            Arc::new(MockProvider::new(Venue::Binance).with_rate("BTC", dec!(0.0100))),
            Arc::new(MockProvider::new(Venue::Hyperliquid).with_rate("BTC", dec!(0.0002))),
        ]
    }

    fn update(text: &str) -> Update {
        serde_json::from_value(serde_json::json!({
            "message": {"chat": {"id": 777}, "text": text}
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(BotCommand::parse("/funding"), BotCommand::Top);
        assert_eq!(BotCommand::parse("/start now"), BotCommand::Top);
        assert_eq!(BotCommand::parse("/help"), BotCommand::Help);
        assert_eq!(BotCommand::parse("hello /funding"), BotCommand::Other);
    }

    #[tokio::test]
    async fn test_funding_command_sends_loading_then_list() {
        let mut sender = MockMessageSender::new();
        let mut seq = Sequence::new();
        sender
            .expect_send_message()
            .with(eq("777"), eq(LOADING_TEXT))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        sender
            .expect_send_message()
            .withf(|chat, text| chat == "777" && text.starts_with("=== Top 1 Arbitrage"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let bot = TelegramBot::new(Arc::new(sender), feed(market()), "1", 3);
        let command = bot.handle_update(&update("/funding")).await.unwrap();
        assert_eq!(command, BotCommand::Top);
    }

    #[tokio::test]
    async fn test_help_and_other_updates() {
        let mut sender = MockMessageSender::new();
        sender
            .expect_send_message()
            .with(eq("777"), eq(HELP_TEXT))
            .times(1)
            .returning(|_, _| Ok(()));

        let bot = TelegramBot::new(Arc::new(sender), feed(market()), "1", 3);
        assert_eq!(bot.handle_update(&update("/help")).await.unwrap(), BotCommand::Help);
        assert_eq!(bot.handle_update(&update("gm")).await.unwrap(), BotCommand::Other);
        assert_eq!(bot.handle_update(&Update::default()).await.unwrap(), BotCommand::Other);
    }

    #[tokio::test]
    async fn test_notify_without_opportunities_sends_nothing() {
        let mut sender = MockMessageSender::new();
        sender.expect_send_message().times(0);

        let bot = TelegramBot::new(Arc::new(sender), feed(Vec::new()), "1", 3);
        assert_eq!(bot.notify().await.unwrap(), NotifyOutcome::NoOpportunities);
    }

    #[tokio::test]
    async fn test_notify_delivery_failure() {
        let mut sender = MockMessageSender::new();
        sender
            .expect_send_message()
            .with(eq("1"), mockall::predicate::always())
            .returning(|_, _| Err(anyhow::anyhow!("Telegram API error 401")));

        let bot = TelegramBot::new(Arc::new(sender), feed(market()), "1", 3);
        let err = bot.notify().await.unwrap_err();
        assert!(matches!(err, NotifyError::Delivery(_)));
    }
}
