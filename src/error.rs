//! Typed errors for the boundaries that callers need to distinguish.
//!
//! Everything else propagates as `anyhow::Error` with context.

use thiserror::Error;

/// Configuration problems detected at startup.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A credential required by an enabled feature is not configured.
    #[error("missing credential `{key}` (required when {feature} is enabled)")]
    MissingCredential {
        /// Configuration key that must be set.
        key: &'static str,
        /// Feature that needs it.
        feature: &'static str,
    },

    /// A numeric setting is out of range.
    #[error("invalid setting `{key}`: {reason}")]
    Invalid {
        /// Offending configuration key.
        key: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
}

/// Failures of the notification path.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Bot token or chat id absent. Terminal, never retried.
    #[error("Missing Telegram credentials")]
    MissingCredentials,

    /// The messaging API rejected or failed the delivery.
    #[error("telegram delivery failed: {0}")]
    Delivery(anyhow::Error),

    /// Neither the aggregation endpoint nor the fallback produced data.
    #[error("opportunity source failed: {0}")]
    Source(anyhow::Error),
}

/// Failures of the aggregation endpoint.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The refresh cycle itself failed.
    #[error("refresh failed: {0}")]
    Refresh(anyhow::Error),

    /// Webhook payload that is not a Telegram update.
    #[error("Invalid request body")]
    InvalidBody,

    /// Notification path failure surfaced through HTTP.
    #[error(transparent)]
    Notify(#[from] NotifyError),
}
