//! Hyperliquid exchange integration.
//!
//! # Funding Rate Notes
//!
//! Hyperliquid funding is paid **hourly**. `ctx.funding` is a decimal
//! fraction per hour; quotes are reported in percent with a 1h interval.

mod client;
mod types;

pub use client::{HyperliquidClient, HyperliquidFunding};
pub use types::*;
