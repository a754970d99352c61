// src/retry.rs
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

/// Failure of one outbound HTTP call, split by whether a retry can help
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {0}")]
    Status(StatusCode),
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// 429 and 5xx are worth a second attempt; other 4xx and bad bodies are not
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status(code) => {
                *code == StatusCode::TOO_MANY_REQUESTS || code.is_server_error()
            }
            FetchError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            FetchError::Malformed(_) => false,
        }
    }
}

/// Retry budget for one logical upstream call
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub jitter: f64, // fraction of the delay added at random
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_millis(400),
            jitter: 0.5,
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as f64 * 2f64.powi(attempt as i32 - 1);
        let jitter = base * self.jitter * rand::thread_rng().gen::<f64>();
        Duration::from_millis((base + jitter) as u64)
    }
}

/// Run `call` under `policy`, retrying only failures a retry can fix
pub async fn with_retry<T, F, Fut>(
    label: &str,
    policy: &RetryPolicy,
    mut call: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "⚠️ {} failed (attempt {}): {}. Retrying in {:?}...",
                    label, attempt, e, delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, FetchError> {
    if resp.status().is_success() {
        Ok(resp)
    } else {
        Err(FetchError::Status(resp.status()))
    }
}

/// GET a JSON body under the default retry policy. The key, when present,
/// is sent the way the Birdeye-style providers expect it.
pub async fn get_json(client: &Client, url: &str, api_key: Option<&str>) -> Result<Value, FetchError> {
    let policy = RetryPolicy::default();
    with_retry(url, &policy, || {
        let client = client.clone();
        let url = url.to_string();
        let api_key = api_key.map(str::to_string);
        async move {
            let mut req = client.get(&url);
            if let Some(key) = api_key {
                req = req.header("X-API-KEY", key).header("x-chain", "solana");
            }
            let resp = check_status(req.send().await?)?;
            Ok(resp.json::<Value>().await?)
        }
    })
    .await
}

/// POST a JSON-RPC style payload under the default retry policy
pub async fn post_json(client: &Client, url: &str, payload: &Value) -> Result<Value, FetchError> {
    let policy = RetryPolicy::default();
    with_retry("rpc", &policy, || {
        let client = client.clone();
        let url = url.to_string();
        let payload = payload.clone();
        async move {
            let resp = check_status(client.post(&url).json(&payload).send().await?)?;
            Ok(resp.json::<Value>().await?)
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn rate_limits_and_server_errors_are_retryable() {
        assert!(FetchError::Status(StatusCode::TOO_MANY_REQUESTS).is_retryable());
        assert!(FetchError::Status(StatusCode::BAD_GATEWAY).is_retryable());
        assert!(!FetchError::Status(StatusCode::NOT_FOUND).is_retryable());
        assert!(!FetchError::Status(StatusCode::UNAUTHORIZED).is_retryable());
        assert!(!FetchError::Malformed("junk".to_string()).is_retryable());
    }

    #[tokio::test]
    async fn retries_once_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            jitter: 0.0,
        };
        let result = with_retry("test", &policy, || {
            let calls = calls.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(FetchError::Status(StatusCode::SERVICE_UNAVAILABLE))
                } else {
                    Ok(42u32)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::default();
        let result: Result<u32, _> = with_retry("test", &policy, || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(FetchError::Status(StatusCode::BAD_REQUEST))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
