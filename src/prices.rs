// src/prices.rs
use crate::config::Config;
use crate::retry::{get_json, FetchError};
use futures_util::future::join_all;
use reqwest::Client;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

/// Wrapped-SOL mint, used as the price-lookup key for the native balance
pub const WSOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// Mints per bulk request against the primary provider
const PRICE_BATCH_SIZE: usize = 50;

const JUPITER_PRICE_URL: &str = "https://lite-api.jup.ag/price/v2";
const BIRDEYE_PRICE_URL: &str = "https://public-api.birdeye.so/defi/price";

/// Resolve USD prices for a set of mints. Primary provider first, secondary
/// fills only the gaps. Always returns; a failed batch just leaves its mints
/// absent. Returned keys are a subset of the input.
pub async fn resolve(client: &Client, cfg: &Config, mints: &[String]) -> HashMap<String, f64> {
    let deduped = dedup(mints);
    if deduped.is_empty() {
        return HashMap::new();
    }

    let batches: Vec<_> = deduped.chunks(PRICE_BATCH_SIZE).collect();
    let results = join_all(batches.iter().map(|batch| resolve_batch(client, cfg, batch))).await;

    let mut prices = HashMap::new();
    for partial in results {
        prices.extend(partial);
    }
    info!("💰 Resolved {}/{} prices", prices.len(), deduped.len());
    prices
}

async fn resolve_batch(client: &Client, cfg: &Config, batch: &[String]) -> HashMap<String, f64> {
    let mut prices = match fetch_primary(client, batch).await {
        Ok(prices) => prices,
        Err(e) => {
            warn!("⚠️ Primary price lookup failed for batch of {}: {}", batch.len(), e);
            HashMap::new()
        }
    };

    let missing: Vec<&String> = batch.iter().filter(|m| !prices.contains_key(*m)).collect();
    if missing.is_empty() {
        return prices;
    }

    // Secondary provider is paid; skip it entirely when unkeyed
    let Some(key) = cfg.birdeye_api_key.as_deref() else {
        return prices;
    };

    let results = join_all(missing.iter().map(|mint| fetch_secondary(client, key, mint.as_str()))).await;
    let mut secondary = HashMap::new();
    for (mint, result) in missing.iter().zip(results) {
        match result {
            Ok(Some(price)) => {
                secondary.insert((*mint).clone(), price);
            }
            Ok(None) => {}
            Err(e) => warn!("⚠️ Secondary price lookup failed for {}: {}", mint, e),
        }
    }
    merge_gap_fill(&mut prices, secondary);
    prices
}

async fn fetch_primary(client: &Client, batch: &[String]) -> Result<HashMap<String, f64>, FetchError> {
    let url = format!("{JUPITER_PRICE_URL}?ids={}", batch.join(","));
    let body = get_json(client, &url, None).await?;
    Ok(parse_primary(&body, batch))
}

async fn fetch_secondary(client: &Client, api_key: &str, mint: &str) -> Result<Option<f64>, FetchError> {
    let url = format!("{BIRDEYE_PRICE_URL}?address={mint}");
    let body = get_json(client, &url, Some(api_key)).await?;
    Ok(numeric_price(&body["data"]["value"]))
}

/// Pull finite positive prices out of the primary response, keyed strictly
/// by the requested batch
pub fn parse_primary(body: &Value, batch: &[String]) -> HashMap<String, f64> {
    let mut prices = HashMap::new();
    let Some(data) = body["data"].as_object() else {
        return prices;
    };
    for mint in batch {
        if let Some(entry) = data.get(mint) {
            if let Some(price) = numeric_price(&entry["price"]) {
                prices.insert(mint.clone(), price);
            }
        }
    }
    prices
}

/// Secondary results fill gaps only; a primary price is never overwritten
pub fn merge_gap_fill(primary: &mut HashMap<String, f64>, secondary: HashMap<String, f64>) {
    for (mint, price) in secondary {
        primary.entry(mint).or_insert(price);
    }
}

/// Accept numbers or numeric strings; reject zero, negatives, NaN, infinities
pub fn numeric_price(value: &Value) -> Option<f64> {
    let price = value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))?;
    (price.is_finite() && price > 0.0).then_some(price)
}

fn dedup(mints: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    mints
        .iter()
        .filter(|m| !m.is_empty() && seen.insert(m.as_str()))
        .cloned()
        .collect()
}
