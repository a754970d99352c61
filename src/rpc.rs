// src/rpc.rs
use crate::models::BalanceEntry;
use crate::retry::{post_json, FetchError};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// Legacy SPL Token program
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
/// Token-2022 program
pub const TOKEN_2022_PROGRAM_ID: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";

const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// Balances discovered for one owner
#[derive(Debug, Clone, Default)]
pub struct OwnerBalances {
    pub native_sol: f64,
    pub tokens: Vec<BalanceEntry>,
}

async fn call(client: &Client, rpc_url: &str, method: &str, params: Value) -> Result<Value, FetchError> {
    let payload = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params
    });
    let body = post_json(client, rpc_url, &payload).await?;
    debug!("📩 Raw {} response: {}", method, body);
    if let Some(err) = body.get("error") {
        return Err(FetchError::Malformed(err.to_string()));
    }
    Ok(body.get("result").cloned().unwrap_or(Value::Null))
}

/// Native SOL balance; failure is non-fatal and reads as zero
pub async fn get_native_balance(client: &Client, rpc_url: &str, owner: &str) -> f64 {
    match call(client, rpc_url, "getBalance", json!([owner])).await {
        Ok(result) => {
            let lamports = result["value"].as_u64().unwrap_or(0);
            lamports as f64 / LAMPORTS_PER_SOL
        }
        Err(e) => {
            warn!("⚠️ getBalance failed for {}: {}", owner, e);
            0.0
        }
    }
}

/// Token accounts owned by `owner` under one program; failure yields an empty list
pub async fn get_token_accounts(
    client: &Client,
    rpc_url: &str,
    owner: &str,
    program_id: &str,
) -> Vec<BalanceEntry> {
    let params = json!([
        owner,
        { "programId": program_id },
        { "encoding": "jsonParsed" }
    ]);
    match call(client, rpc_url, "getTokenAccountsByOwner", params).await {
        Ok(result) => parse_token_accounts(&result),
        Err(e) => {
            warn!("⚠️ getTokenAccountsByOwner failed for {} ({}): {}", owner, program_id, e);
            Vec::new()
        }
    }
}

/// Decode a jsonParsed account list into balance entries. Entries with a
/// missing mint or a non-positive amount are dropped here.
pub fn parse_token_accounts(result: &Value) -> Vec<BalanceEntry> {
    let accounts = match result["value"].as_array() {
        Some(accounts) => accounts,
        None => return Vec::new(),
    };

    let mut entries = Vec::with_capacity(accounts.len());
    for account in accounts {
        let info = &account["account"]["data"]["parsed"]["info"];
        let mint = match info["mint"].as_str() {
            Some(mint) if !mint.is_empty() => mint,
            _ => continue,
        };

        let token_amount = &info["tokenAmount"];
        let decimals = token_amount["decimals"].as_u64().unwrap_or(0) as u8;
        let amount = token_amount["uiAmount"].as_f64().or_else(|| {
            token_amount["uiAmountString"]
                .as_str()
                .and_then(|s| s.parse().ok())
        });

        match amount {
            Some(amount) if amount > 0.0 => entries.push(BalanceEntry {
                mint: mint.to_string(),
                amount,
                decimals,
            }),
            _ => {}
        }
    }
    entries
}

/// Fetch native balance and per-program token accounts concurrently.
/// Each sub-fetch fails independently; the same mint held under both
/// programs stays two rows, matching account-level granularity.
pub async fn fetch_balances(
    client: &Client,
    rpc_url: &str,
    owner: &str,
    include_token_2022: bool,
) -> OwnerBalances {
    info!("📡 Fetching balances for {}", owner);

    let native_fut = get_native_balance(client, rpc_url, owner);
    let legacy_fut = get_token_accounts(client, rpc_url, owner, TOKEN_PROGRAM_ID);

    if include_token_2022 {
        let t22_fut = get_token_accounts(client, rpc_url, owner, TOKEN_2022_PROGRAM_ID);
        let (native_sol, mut tokens, mut extra) = tokio::join!(native_fut, legacy_fut, t22_fut);
        tokens.append(&mut extra);
        OwnerBalances { native_sol, tokens }
    } else {
        let (native_sol, tokens) = tokio::join!(native_fut, legacy_fut);
        OwnerBalances { native_sol, tokens }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(mint: &str, ui_amount: Value, decimals: u64) -> Value {
        json!({
            "pubkey": "acc111",
            "account": {
                "data": {
                    "parsed": {
                        "info": {
                            "mint": mint,
                            "tokenAmount": {
                                "uiAmount": ui_amount,
                                "decimals": decimals,
                                "amount": "0"
                            }
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn parses_positive_balances_only() {
        let result = json!({
            "value": [
                account("MintA", json!(12.5), 6),
                account("MintB", json!(0.0), 9),
                account("", json!(3.0), 6),
            ]
        });
        let entries = parse_token_accounts(&result);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].mint, "MintA");
        assert_eq!(entries[0].amount, 12.5);
        assert_eq!(entries[0].decimals, 6);
    }

    #[test]
    fn falls_back_to_ui_amount_string() {
        let result = json!({
            "value": [account("MintC", Value::Null, 9)]
        });
        // uiAmount null but uiAmountString present
        let mut with_string = result.clone();
        with_string["value"][0]["account"]["data"]["parsed"]["info"]["tokenAmount"]
            ["uiAmountString"] = json!("7.25");
        let entries = parse_token_accounts(&with_string);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].amount, 7.25);
    }

    #[test]
    fn missing_value_array_is_empty() {
        assert!(parse_token_accounts(&json!({})).is_empty());
        assert!(parse_token_accounts(&json!({ "value": "junk" })).is_empty());
    }
}
