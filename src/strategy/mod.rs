//! Funding arbitrage core: normalize, detect, rank.
//!
//! Data flow per refresh cycle:
//! providers -> normalizer -> detector -> ranking -> board

pub mod board;
pub mod calculator;
pub mod detector;
pub mod normalizer;
pub mod ranking;
mod scanner;

pub use board::{OpportunityBoard, Snapshot};
pub use calculator::ProfitEstimate;
pub use detector::{compute_opportunities, detect, Confidence, Leg, Opportunity, PositionSide};
pub use normalizer::{canonical_ticker, group_instruments, normalize_quote, normalize_venue, NormalizedQuote};
pub use ranking::{
    filter_by_ticker, rank_by_apr, rank_by_spread, sort_opportunities, top_n, RankMode, SortDirection,
    SortKey,
};
pub use scanner::FundingScanner;
