use axum::{
    extract::Query,
    http::{HeaderValue, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{debug, info};

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::snapshot::{self, DEFAULT_MAX_TOKENS};
use crate::tokens::TokenDirectory;
use crate::trades::{self, DEFAULT_LIMIT, MAX_LIMIT};

#[derive(Deserialize)]
pub struct WalletQuery {
    pub address: Option<String>,
    #[serde(rename = "minUsd")]
    pub min_usd: Option<f64>,
    #[serde(rename = "maxTokens")]
    pub max_tokens: Option<usize>,
}

#[derive(Deserialize)]
pub struct BuysQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub address: Option<String>,
    pub limit: Option<usize>,
    #[serde(rename = "minUsd")]
    pub min_usd: Option<f64>,
}

/// Everything the route handlers share, owned by the composition root
#[derive(Clone)]
pub struct ServiceContext {
    pub cfg: Config,
    pub client: reqwest::Client,
    pub directory: TokenDirectory,
    pub cache: ResponseCache,
}

pub async fn serve(ctx: ServiceContext) -> eyre::Result<()> {
    let cors = cors_layer(&ctx.cfg.allowed_origins);

    let app = Router::new()
        .route(
            "/",
            get(|| async {
                Json(json!({
                    "status": "ok",
                    "service": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                }))
            }),
        )
        .route(
            "/wallet",
            get({
                let ctx = ctx.clone();
                move |q: Query<WalletQuery>| {
                    let ctx = ctx.clone();
                    async move { get_wallet(ctx, q.0).await }
                }
            }),
        )
        .route(
            "/buys",
            get({
                let ctx = ctx.clone();
                move |q: Query<BuysQuery>| {
                    let ctx = ctx.clone();
                    async move { get_buys(ctx, q.0).await }
                }
            }),
        )
        .layer(cors);

    let addr = SocketAddr::from(([127, 0, 0, 1], ctx.cfg.port));
    info!("API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

// ---------- Route handlers ----------

async fn get_wallet(ctx: ServiceContext, q: WalletQuery) -> (StatusCode, Json<Value>) {
    let Some(address) = q.address.filter(|a| !a.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "address query parameter is required" })),
        );
    };
    let min_usd = q.min_usd.unwrap_or(0.0);
    let max_tokens = q.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS).max(1);

    let cache_key = format!("wallet:{address}:{min_usd}:{max_tokens}");
    if let Some(hit) = ctx.cache.get(&cache_key) {
        debug!("💾 Cache hit for {}", cache_key);
        return (StatusCode::OK, Json(hit));
    }

    let snapshot = snapshot::build_snapshot(
        &ctx.client,
        &ctx.cfg,
        &ctx.directory,
        &address,
        min_usd,
        max_tokens,
    )
    .await;

    // The availability contract: whatever went wrong internally, callers
    // get a 200 with the snapshot shape
    let payload = match serde_json::to_value(&snapshot) {
        Ok(value) => value,
        Err(e) => serde_json::to_value(snapshot::degraded(&address, &e.to_string()))
            .unwrap_or_else(|_| json!({})),
    };
    ctx.cache.put(&cache_key, payload.clone());
    (StatusCode::OK, Json(payload))
}

async fn get_buys(ctx: ServiceContext, q: BuysQuery) -> (StatusCode, Json<Value>) {
    let Some(address) = q.address.filter(|a| !a.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "address query parameter is required" })),
        );
    };
    let kind = match q.kind.as_deref() {
        Some("wallet") => "wallet",
        _ => "token",
    };
    let limit = q.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let min_usd = q.min_usd.unwrap_or(0.0);

    let cache_key = format!("buys:{kind}:{address}:{limit}:{min_usd}");
    if let Some(hit) = ctx.cache.get(&cache_key) {
        debug!("💾 Cache hit for {}", cache_key);
        return (StatusCode::OK, Json(hit));
    }

    let outcome = trades::fetch_buys(
        &ctx.client,
        &ctx.cfg,
        &ctx.directory,
        kind,
        &address,
        limit,
        min_usd,
    )
    .await;

    let mut payload = json!({ "buys": outcome.buys });
    if let Some(warning) = outcome.warning {
        payload["warning"] = json!(warning);
    }
    ctx.cache.put(&cache_key, payload.clone());
    (StatusCode::OK, Json(payload))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    let list: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(list))
        .allow_methods(Any)
        .allow_headers(Any)
}
