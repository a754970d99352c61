mod api;
mod cache;
mod config;
mod models;
mod prices;
mod retry;
mod rpc;
mod snapshot;
mod tokens;
mod trades;

use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stdout)
        .with_target(false)
        .init();

    info!("Portfolio proxy starting...");

    // Load configuration
    let cfg = config::load()?;
    info!("Loaded config:");
    info!("  RPC URL: {}", cfg.rpc_url);
    info!("  Port: {}", cfg.port);
    info!("  Token list: {}", cfg.token_list_url);
    info!("  Cache TTL: {}s", cfg.cache_ttl_secs);
    info!("  Token-2022 accounts: {}", cfg.include_token_2022);
    info!(
        "  Secondary price provider: {}",
        if cfg.birdeye_api_key.is_some() { "configured" } else { "not configured" }
    );
    info!(
        "  Trade provider: {}",
        if cfg.trades_api_key.is_some() { "configured" } else { "not configured" }
    );

    // One shared HTTP client; every outbound call is bounded by its timeout
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(3))
        .build()?;

    let directory = tokens::TokenDirectory::new();
    let cache = cache::ResponseCache::new(Duration::from_secs(cfg.cache_ttl_secs));

    // Daily token-list refresh; request handling never blocks on it
    let refresh_handle = tokio::spawn(tokens::refresh_loop(
        directory.clone(),
        client.clone(),
        cfg.token_list_url.clone(),
    ));

    // Spawn API task
    let ctx = api::ServiceContext {
        cfg,
        client,
        directory,
        cache,
    };
    let api_handle = tokio::spawn(async move { api::serve(ctx).await });

    // Graceful shutdown
    tokio::select! {
        res = api_handle => match res {
            Ok(Ok(_)) => info!("API exited cleanly"),
            Ok(Err(e)) => error!("API error: {:?}", e),
            Err(e) => error!("API task panicked: {:?}", e),
        },
        res = refresh_handle => match res {
            Ok(_) => info!("Token refresh task exited"),
            Err(e) => error!("Token refresh task panicked: {:?}", e),
        },
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received, stopping...");
        }
    }

    info!("Portfolio proxy stopped.");
    Ok(())
}
