// src/snapshot.rs
use crate::config::Config;
use crate::models::{BalanceEntry, TokenRow, WalletSnapshot};
use crate::prices::{self, WSOL_MINT};
use crate::rpc;
use crate::tokens::TokenDirectory;
use chrono::Utc;
use reqwest::Client;
use std::collections::HashMap;

pub const DEFAULT_MAX_TOKENS: usize = 25;

/// Build the full wallet snapshot: balances, then prices for the discovered
/// mints, then the joined and ordered rows
pub async fn build_snapshot(
    client: &Client,
    cfg: &Config,
    directory: &TokenDirectory,
    owner: &str,
    min_usd: f64,
    max_tokens: usize,
) -> WalletSnapshot {
    let balances = rpc::fetch_balances(client, &cfg.rpc_url, owner, cfg.include_token_2022).await;

    // The price set depends on the discovered mints, so this call strictly
    // follows the balance fetch
    let mut mints: Vec<String> = balances.tokens.iter().map(|b| b.mint.clone()).collect();
    mints.push(WSOL_MINT.to_string());
    let price_map = prices::resolve(client, cfg, &mints).await;

    assemble(
        owner,
        balances.native_sol,
        balances.tokens,
        &price_map,
        directory,
        min_usd,
        max_tokens,
    )
}

/// Join, sort, filter, truncate, total. Pure apart from the directory read.
pub fn assemble(
    owner: &str,
    native_sol: f64,
    balances: Vec<BalanceEntry>,
    price_map: &HashMap<String, f64>,
    directory: &TokenDirectory,
    min_usd: f64,
    max_tokens: usize,
) -> WalletSnapshot {
    let mut rows: Vec<TokenRow> = balances
        .into_iter()
        .map(|balance| {
            let meta = directory.lookup(&balance.mint);
            let price_usd = price_map.get(&balance.mint).copied();
            let usd_value = price_usd.map(|price| price * balance.amount);
            TokenRow {
                mint: balance.mint,
                amount: balance.amount,
                decimals: balance.decimals,
                symbol: meta.symbol,
                name: meta.name,
                logo_uri: meta.logo_uri,
                price_usd,
                usd_value,
            }
        })
        .collect();

    // Highest value first; unpriced rows sink to the bottom
    rows.sort_by(|a, b| sort_key(b).total_cmp(&sort_key(a)));

    // A row is hidden only when its value is known AND below the floor.
    // Unpriced is not worthless: rows with no price are always shown.
    rows.retain(|row| match row.usd_value {
        Some(value) => value >= min_usd,
        None => true,
    });
    rows.truncate(max_tokens.max(1));

    let native_usd_value = price_map
        .get(WSOL_MINT)
        .map(|price| price * native_sol)
        .unwrap_or(0.0);

    // The total reflects what is shown, not the full holdings
    let total_usd_value =
        native_usd_value + rows.iter().filter_map(|row| row.usd_value).sum::<f64>();

    WalletSnapshot {
        owner: owner.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        native_amount: native_sol,
        native_usd_value,
        total_usd_value,
        tokens: rows,
        warning: None,
    }
}

fn sort_key(row: &TokenRow) -> f64 {
    row.usd_value.unwrap_or(f64::NEG_INFINITY)
}

/// Same shape, zeroed fields, a warning instead of an error status. Callers
/// always get valid JSON-shaped data back.
pub fn degraded(owner: &str, reason: &str) -> WalletSnapshot {
    WalletSnapshot {
        owner: owner.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        native_amount: 0.0,
        native_usd_value: 0.0,
        total_usd_value: 0.0,
        tokens: Vec::new(),
        warning: Some(reason.to_string()),
    }
}
