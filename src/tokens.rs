// src/tokens.rs
use crate::models::TokenMetadata;
use crate::retry::get_json;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

const REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// In-memory mint → metadata directory. The whole map is replaced on
/// refresh; readers always see either the previous map or the new one.
#[derive(Clone)]
pub struct TokenDirectory {
    map: Arc<RwLock<Arc<HashMap<String, TokenMetadata>>>>,
}

impl Default for TokenDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenDirectory {
    pub fn new() -> Self {
        Self {
            map: Arc::new(RwLock::new(Arc::new(HashMap::new()))),
        }
    }

    /// Never fails: a miss yields empty fields plus the CDN fallback logo
    pub fn lookup(&self, mint: &str) -> TokenMetadata {
        let map = self.map.read().unwrap().clone();
        match map.get(mint) {
            Some(meta) => {
                let mut meta = meta.clone();
                if meta.logo_uri.is_empty() {
                    meta.logo_uri = fallback_logo(mint);
                }
                meta
            }
            None => TokenMetadata {
                symbol: String::new(),
                name: String::new(),
                logo_uri: fallback_logo(mint),
            },
        }
    }

    pub fn len(&self) -> usize {
        self.map.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch the bulk token list and swap the directory in one shot.
    /// On failure the previous map is kept.
    pub async fn refresh(&self, client: &Client, token_list_url: &str) {
        match get_json(client, token_list_url, None).await {
            Ok(body) => {
                let next = parse_token_list(&body);
                info!("📖 Token directory refreshed: {} entries", next.len());
                self.install(next);
            }
            Err(e) => warn!("⚠️ Token list fetch failed, keeping previous directory: {}", e),
        }
    }

    /// Install an already-built mapping wholesale
    pub fn install(&self, entries: HashMap<String, TokenMetadata>) {
        *self.map.write().unwrap() = Arc::new(entries);
    }
}

/// Refresh once at startup, then daily. Requests never block on this task.
pub async fn refresh_loop(directory: TokenDirectory, client: Client, token_list_url: String) {
    loop {
        directory.refresh(&client, &token_list_url).await;
        sleep(REFRESH_INTERVAL).await;
    }
}

/// The list is either a bare array or wrapped in a `tokens` field depending
/// on the source
pub fn parse_token_list(body: &Value) -> HashMap<String, TokenMetadata> {
    let mut map = HashMap::new();
    let Some(items) = body.as_array().or_else(|| body["tokens"].as_array()) else {
        return map;
    };
    for item in items {
        let Some(mint) = item["address"].as_str() else {
            continue;
        };
        map.insert(
            mint.to_string(),
            TokenMetadata {
                symbol: item["symbol"].as_str().unwrap_or_default().to_string(),
                name: item["name"].as_str().unwrap_or_default().to_string(),
                logo_uri: item["logoURI"].as_str().unwrap_or_default().to_string(),
            },
        );
    }
    map
}

pub fn fallback_logo(mint: &str) -> String {
    format!("https://cdn.jsdelivr.net/gh/solana-labs/token-list@main/assets/mainnet/{mint}/logo.png")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_miss_falls_back_to_cdn_logo() {
        let directory = TokenDirectory::new();
        let meta = directory.lookup("UnknownMint");
        assert!(meta.symbol.is_empty());
        assert!(meta.name.is_empty());
        assert!(meta.logo_uri.contains("UnknownMint"));
    }

    #[test]
    fn install_replaces_the_map_wholesale() {
        let directory = TokenDirectory::new();
        directory.install(HashMap::from([(
            "MintA".to_string(),
            TokenMetadata {
                symbol: "AAA".to_string(),
                name: "Token A".to_string(),
                logo_uri: "https://example.com/a.png".to_string(),
            },
        )]));
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.lookup("MintA").symbol, "AAA");

        directory.install(HashMap::new());
        assert!(directory.is_empty());
        // a miss after replacement still resolves
        assert!(directory.lookup("MintA").symbol.is_empty());
    }

    #[test]
    fn parses_both_list_shapes() {
        let bare = json!([
            { "address": "MintA", "symbol": "AAA", "name": "Token A", "logoURI": "https://a" },
            { "symbol": "no-address" }
        ]);
        let map = parse_token_list(&bare);
        assert_eq!(map.len(), 1);
        assert_eq!(map["MintA"].symbol, "AAA");

        let wrapped = json!({ "tokens": [ { "address": "MintB", "name": "Token B" } ] });
        let map = parse_token_list(&wrapped);
        assert_eq!(map["MintB"].name, "Token B");
        assert!(map["MintB"].symbol.is_empty());
    }
}
