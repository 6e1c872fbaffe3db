//! Hyperliquid `info` endpoint payloads.

use crate::utils::decimal::parse_decimal;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Request body for `POST /info`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum InfoRequest {
    #[serde(rename = "metaAndAssetCtxs")]
    MetaAndAssetCtxs,
}

/// `[meta, ctxs]`, where `ctxs[i]` belongs to `meta.universe[i]`.
pub type MetaAndAssetCtxsResponse = (Meta, Vec<AssetCtx>);

#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
    pub universe: Vec<AssetMeta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetMeta {
    /// Asset name (e.g., "BTC", "ETH")
    pub name: String,
}

/// Per-asset market context. Only funding is read.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetCtx {
    /// Hourly funding rate, decimal fraction as a string
    #[serde(default, deserialize_with = "deserialize_funding")]
    pub funding: Option<Decimal>,
}

/// Accepts a string, `null`, or a missing field.
fn deserialize_funding<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_decimal))
}
