// src/models.rs
use serde::Serialize;

/// Display metadata for one mint, loaded from the bulk token list
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    pub symbol: String,
    pub name: String,
    pub logo_uri: String,
}

/// One token-account balance, already scaled to a UI amount
#[derive(Debug, Clone)]
pub struct BalanceEntry {
    pub mint: String,
    pub amount: f64,  // scaled by decimals upstream
    pub decimals: u8, // informational only
}

/// A balance joined with metadata and price. `usd_value` is `None` exactly
/// when no provider returned a usable price for the mint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRow {
    pub mint: String,
    pub amount: f64,
    pub decimals: u8,
    pub symbol: String,
    pub name: String,
    pub logo_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usd_value: Option<f64>,
}

/// Full wallet snapshot returned by /wallet
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSnapshot {
    pub owner: String,
    pub timestamp: String, // RFC3339
    pub native_amount: f64,
    pub native_usd_value: f64,
    pub total_usd_value: f64,
    pub tokens: Vec<TokenRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// One normalized trade event returned by /buys
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    pub signature: String,
    pub timestamp: i64, // unix seconds, 0 when the provider omitted it
    pub mint: String,
    pub symbol: String,
    pub name: String,
    pub logo_uri: String,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usd_value: Option<f64>,
    pub counterparty: String,
    pub is_buy: bool,
}
