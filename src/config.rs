use dotenvy::dotenv;
use eyre::Result;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub port: u16,
    pub birdeye_api_key: Option<String>, // secondary price provider; fallback disabled without it
    pub trades_api_key: Option<String>,  // trade-history provider; /buys degrades without it
    pub token_list_url: String,
    pub allowed_origins: Vec<String>,
    pub cache_ttl_secs: u64,
    pub include_token_2022: bool,
}

pub fn load() -> Result<Config> {
    dotenv().ok();

    // Prefer an explicit RPC URL, then a Helius key, then the public endpoint
    let rpc_url = env::var("RPC_URL").unwrap_or_else(|_| match env::var("HELIUS_API_KEY") {
        Ok(key) if !key.is_empty() => format!("https://mainnet.helius-rpc.com/?api-key={key}"),
        _ => "https://api.mainnet-beta.solana.com".to_string(),
    });

    // API port (default: 8080)
    let port = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    let birdeye_api_key = env::var("BIRDEYE_API_KEY").ok().filter(|k| !k.is_empty());

    // Trade provider key, with the Birdeye key as an alias
    let trades_api_key = env::var("TRADES_API_KEY")
        .or_else(|_| env::var("BIRDEYE_API_KEY"))
        .ok()
        .filter(|k| !k.is_empty());

    let token_list_url = env::var("TOKEN_LIST_URL")
        .unwrap_or_else(|_| "https://tokens.jup.ag/tokens?tags=verified".to_string());

    // Allowed CORS origins (default: any)
    let allowed_origins: Vec<String> = env::var("ALLOWED_ORIGINS")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let cache_ttl_secs = env::var("CACHE_TTL_SECS")
        .unwrap_or_else(|_| "10".to_string())
        .parse()
        .unwrap_or(10);

    let include_token_2022 = env::var("INCLUDE_TOKEN_2022")
        .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
        .unwrap_or(true);

    Ok(Config {
        rpc_url,
        port,
        birdeye_api_key,
        trades_api_key,
        token_list_url,
        allowed_origins,
        cache_ttl_secs,
        include_token_2022,
    })
}
