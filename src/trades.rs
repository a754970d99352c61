// src/trades.rs
use crate::config::Config;
use crate::models::TradeRecord;
use crate::prices;
use crate::retry::get_json;
use crate::tokens::TokenDirectory;
use chrono::DateTime;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{info, warn};

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 50;

const TRADES_BASE_URL: &str = "https://public-api.birdeye.so";

/// Endpoint shapes in preference order; the provider API is versioned and
/// the older shape still serves some keys
const ENDPOINT_SHAPES: &[&str] = &["defi/v3/txs", "defi/txs"];

/// Ordered field candidates per logical attribute. Providers rename fields
/// between endpoints and versions; the first populated candidate wins.
const SIGNATURE_FIELDS: &[&str] = &["txHash", "tx_hash", "signature"];
const TIMESTAMP_FIELDS: &[&str] = &["blockUnixTime", "block_unix_time", "time", "timestamp"];
const SIDE_FIELDS: &[&str] = &["side", "txType", "tx_type", "type", "action"];
const BUY_FLAG_FIELDS: &[&str] = &["isBuy", "is_buy", "buy"];
const MINT_FIELDS: &[&str] = &["mint", "tokenMint", "token_address", "tokenAddress", "address"];
const AMOUNT_FIELDS: &[&str] = &["uiAmount", "ui_amount", "amount", "tokenAmount", "token_amount"];
const PRICE_FIELDS: &[&str] = &["priceUsd", "price_usd", "price"];
const USD_VALUE_FIELDS: &[&str] = &["volumeUsd", "volume_usd", "usdValue", "usd_value", "volume"];
const COUNTERPARTY_FIELDS: &[&str] = &["owner", "maker", "trader", "wallet"];

/// Normalized buys plus an optional warning for the caller
#[derive(Debug, Default)]
pub struct BuysOutcome {
    pub buys: Vec<TradeRecord>,
    pub warning: Option<String>,
}

/// Fetch recent buys for a token or wallet. Degrades to an empty list with
/// a warning instead of erroring, whatever the provider does.
pub async fn fetch_buys(
    client: &Client,
    cfg: &Config,
    directory: &TokenDirectory,
    kind: &str,
    address: &str,
    limit: usize,
    min_usd: f64,
) -> BuysOutcome {
    let Some(api_key) = cfg.trades_api_key.as_deref() else {
        return BuysOutcome {
            buys: Vec::new(),
            warning: Some("trade provider credential not configured".to_string()),
        };
    };

    // The provider's limit counts sells too; over-fetch so the buy filter
    // can still fill the caller's quota
    let provider_limit = limit.max(20).min(MAX_LIMIT);

    let mut items = None;
    for shape in ENDPOINT_SHAPES {
        let url = format!(
            "{TRADES_BASE_URL}/{shape}/{kind}?address={address}&limit={provider_limit}&tx_type=swap"
        );
        match get_json(client, &url, Some(api_key)).await {
            Ok(body) => {
                if let Some(found) = extract_items(&body) {
                    items = Some(found);
                    break;
                }
                warn!("⚠️ Trade endpoint {} returned no row array, trying next shape", shape);
            }
            Err(e) => warn!("⚠️ Trade endpoint {} failed: {}", shape, e),
        }
    }

    let Some(items) = items else {
        return BuysOutcome {
            buys: Vec::new(),
            warning: Some("trade provider unreachable".to_string()),
        };
    };
    info!("📡 Trade provider returned {} raw records for {} {}", items.len(), kind, address);

    let mut records: Vec<TradeRecord> =
        items.iter().map(normalize).filter(|r| r.is_buy).collect();

    // One batched lookup covers every row still missing a USD value
    let missing: Vec<String> = records
        .iter()
        .filter(|r| r.usd_value.is_none() && r.amount > 0.0 && !r.mint.is_empty())
        .map(|r| r.mint.clone())
        .collect();
    if !missing.is_empty() {
        let price_map = prices::resolve(client, cfg, &missing).await;
        fill_usd_values(&mut records, &price_map);
    }

    // Unknown value gets the benefit of the doubt
    records.retain(|r| r.usd_value.map(|v| v >= min_usd).unwrap_or(true));
    records.truncate(limit.clamp(1, MAX_LIMIT));

    for record in &mut records {
        let meta = directory.lookup(&record.mint);
        record.symbol = meta.symbol;
        record.name = meta.name;
        record.logo_uri = meta.logo_uri;
    }

    BuysOutcome {
        buys: records,
        warning: None,
    }
}

/// Providers disagree on where the row array lives; try each known spot
pub fn extract_items(body: &Value) -> Option<Vec<Value>> {
    if let Some(arr) = body.as_array() {
        return Some(arr.clone());
    }
    for candidate in [
        &body["data"]["items"],
        &body["data"]["solana"],
        &body["data"],
        &body["items"],
    ] {
        if let Some(arr) = candidate.as_array() {
            return Some(arr.clone());
        }
    }
    None
}

/// Flatten one raw provider record into the normalized schema. Missing
/// fields default to empty/zero/absent; nothing here fails a record.
pub fn normalize(record: &Value) -> TradeRecord {
    TradeRecord {
        signature: first_str(record, SIGNATURE_FIELDS),
        timestamp: first_timestamp(record, TIMESTAMP_FIELDS),
        mint: first_str(record, MINT_FIELDS),
        symbol: String::new(),
        name: String::new(),
        logo_uri: String::new(),
        amount: first_f64(record, AMOUNT_FIELDS)
            .filter(|a| *a > 0.0)
            .unwrap_or(0.0),
        price_usd: first_f64(record, PRICE_FIELDS).filter(|p| p.is_finite() && *p > 0.0),
        usd_value: first_f64(record, USD_VALUE_FIELDS).filter(|v| v.is_finite() && *v >= 0.0),
        counterparty: first_str(record, COUNTERPARTY_FIELDS),
        is_buy: is_buy(record),
    }
}

/// Any recognized positive signal marks a buy; a record with no signal at
/// all is not a buy
pub fn is_buy(record: &Value) -> bool {
    let side_says_buy = SIDE_FIELDS.iter().any(|field| {
        record
            .get(*field)
            .and_then(Value::as_str)
            .map(|s| s.eq_ignore_ascii_case("buy"))
            .unwrap_or(false)
    });
    let flag_says_buy = BUY_FLAG_FIELDS
        .iter()
        .any(|field| record.get(*field).and_then(Value::as_bool).unwrap_or(false));
    side_says_buy || flag_says_buy
}

/// Compute amount × price for rows the provider left unvalued
pub fn fill_usd_values(records: &mut [TradeRecord], price_map: &HashMap<String, f64>) {
    for record in records.iter_mut() {
        if record.usd_value.is_none() && record.amount > 0.0 {
            if let Some(price) = price_map.get(&record.mint) {
                record.price_usd.get_or_insert(*price);
                record.usd_value = Some(record.amount * price);
            }
        }
    }
}

fn first_str(record: &Value, fields: &[&str]) -> String {
    fields
        .iter()
        .find_map(|field| record.get(*field).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_default()
}

fn first_f64(record: &Value, fields: &[&str]) -> Option<f64> {
    fields.iter().find_map(|field| {
        let value = record.get(*field)?;
        value
            .as_f64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
    })
}

/// Unix seconds from a numeric field or an RFC3339 string; 0 when absent
fn first_timestamp(record: &Value, fields: &[&str]) -> i64 {
    fields
        .iter()
        .find_map(|field| {
            let value = record.get(*field)?;
            value.as_i64().or_else(|| {
                let raw = value.as_str()?;
                raw.parse::<i64>()
                    .ok()
                    .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.timestamp()))
            })
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn any_positive_signal_marks_a_buy() {
        assert!(is_buy(&json!({ "side": "buy" })));
        assert!(is_buy(&json!({ "side": "BUY" })));
        // OR semantics: a positive flag wins even against a "sell" side
        assert!(is_buy(&json!({ "side": "sell", "is_buy": true })));
        assert!(!is_buy(&json!({ "side": "sell" })));
        // no signal at all is not a buy
        assert!(!is_buy(&json!({ "amount": 100 })));
    }

    #[test]
    fn mint_candidates_resolve_most_specific_first() {
        let record = json!({ "address": "Pool111", "mint": "Mint111" });
        assert_eq!(normalize(&record).mint, "Mint111");

        let record = json!({ "address": "Pool111", "tokenAddress": "Mint222" });
        assert_eq!(normalize(&record).mint, "Mint222");
    }

    #[test]
    fn normalization_tolerates_sparse_records() {
        let record = normalize(&json!({}));
        assert!(record.signature.is_empty());
        assert_eq!(record.timestamp, 0);
        assert_eq!(record.amount, 0.0);
        assert_eq!(record.price_usd, None);
        assert_eq!(record.usd_value, None);
        assert!(!record.is_buy);
    }

    #[test]
    fn timestamps_accept_unix_and_rfc3339() {
        let unix = normalize(&json!({ "blockUnixTime": 1700000000, "side": "buy" }));
        assert_eq!(unix.timestamp, 1700000000);

        let iso = normalize(&json!({ "time": "2024-01-01T00:00:00Z", "side": "buy" }));
        assert_eq!(iso.timestamp, 1704067200);
    }

    #[test]
    fn missing_usd_value_is_computed_from_the_resolved_price() {
        let mut records = vec![normalize(&json!({
            "side": "buy",
            "mint": "MintA",
            "amount": 100.0
        }))];
        assert_eq!(records[0].usd_value, None);

        let price_map = HashMap::from([("MintA".to_string(), 2.0)]);
        fill_usd_values(&mut records, &price_map);
        assert_eq!(records[0].usd_value, Some(200.0));
        assert_eq!(records[0].price_usd, Some(2.0));
    }

    #[test]
    fn explicit_usd_value_beats_the_computed_one() {
        let mut records = vec![normalize(&json!({
            "side": "buy",
            "mint": "MintA",
            "amount": 100.0,
            "volume_usd": 42.0
        }))];
        let price_map = HashMap::from([("MintA".to_string(), 2.0)]);
        fill_usd_values(&mut records, &price_map);
        assert_eq!(records[0].usd_value, Some(42.0));
    }

    #[test]
    fn value_filter_keeps_unknown_and_drops_known_below_floor() {
        let mut records = vec![
            normalize(&json!({ "side": "buy", "mint": "A", "amount": 100.0 })),
            normalize(&json!({ "side": "buy", "mint": "B", "volume_usd": 200.0 })),
        ];
        let price_map = HashMap::new();
        fill_usd_values(&mut records, &price_map);

        let min_usd = 250.0;
        records.retain(|r| r.usd_value.map(|v| v >= min_usd).unwrap_or(true));

        // the $200 record is filtered out; the unvalued one survives
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].mint, "A");
    }

    #[test]
    fn items_are_found_under_every_known_shape() {
        let rows = json!([{ "side": "buy" }]);
        assert!(extract_items(&json!({ "data": { "items": rows.clone() } })).is_some());
        assert!(extract_items(&json!({ "data": { "solana": rows.clone() } })).is_some());
        assert!(extract_items(&json!({ "data": rows.clone() })).is_some());
        assert!(extract_items(&json!({ "items": rows.clone() })).is_some());
        assert!(extract_items(&rows).is_some());
        assert!(extract_items(&json!({ "data": "nope" })).is_none());
        assert!(extract_items(&json!("junk")).is_none());
    }
}
