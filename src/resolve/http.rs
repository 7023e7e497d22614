//! HTTP client factory shared by the resolvers.
//!
//! ## Retry Strategy
//!
//! Only failures that may clear up on their own are retried: connection
//! errors, timeouts and HTTP 429 / 500 / 502 / 503 / 504. Attempt `n`
//! (1-based) waits `retry_backoff_ms * 2^(n-1)`, or the server's
//! `Retry-After` (capped at `max_retry_after_secs`) when one was sent. Any
//! other 4xx returns immediately. With the default of one retry and 200 ms
//! backoff, a dead provider costs at most two requests and 200 ms of sleep.

use crate::config::ResolverConfig;
use crate::error::{ExtractError, LookupError};
use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Statuses worth another attempt.
pub const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// A configured `reqwest::Client` plus the retry policy.
///
/// Cheap to clone: the connection pool is shared.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    max_retries: u32,
    backoff: Duration,
    max_retry_after: Duration,
}

/// Build the shared client from `config`.
pub fn build_client(config: &ResolverConfig) -> Result<HttpClient, ExtractError> {
    let client = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .build()
        .map_err(|e| ExtractError::HttpClientBuild(e.to_string()))?;

    Ok(HttpClient {
        client,
        max_retries: config.max_retries,
        backoff: Duration::from_millis(config.retry_backoff_ms),
        max_retry_after: Duration::from_secs(config.max_retry_after_secs),
    })
}

impl HttpClient {
    /// GET `url?query` and parse the body as JSON.
    pub async fn get_json(
        &self,
        provider: &'static str,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, LookupError> {
        let resp = self
            .send_with_retry(provider, || self.client.get(url).query(query))
            .await?;
        read_json(provider, resp).await
    }

    /// POST a urlencoded form and parse the body as JSON.
    pub async fn post_form_json(
        &self,
        provider: &'static str,
        url: &str,
        form: &[(&str, &str)],
        accept: &str,
    ) -> Result<Value, LookupError> {
        let resp = self
            .send_with_retry(provider, || {
                self.client.post(url).header(ACCEPT, accept).form(form)
            })
            .await?;
        read_json(provider, resp).await
    }

    async fn send_with_retry<F>(
        &self,
        provider: &'static str,
        build: F,
    ) -> Result<Response, LookupError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut last_err: Option<LookupError> = None;
        let mut delay = Duration::ZERO;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(
                    "{}: retry {}/{} after {}ms",
                    provider,
                    attempt,
                    self.max_retries,
                    delay.as_millis()
                );
                sleep(delay).await;
            }
            let backoff = self.backoff * 2u32.saturating_pow(attempt);

            match build().send().await {
                Ok(resp) if is_retryable(resp.status()) => {
                    debug!("{}: attempt {} got HTTP {}", provider, attempt + 1, resp.status());
                    delay = self.retry_after(&resp).unwrap_or(backoff);
                    last_err = Some(LookupError::Status {
                        provider,
                        status: resp.status().as_u16(),
                    });
                }
                Ok(resp) if !resp.status().is_success() => {
                    return Err(LookupError::Status {
                        provider,
                        status: resp.status().as_u16(),
                    });
                }
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    debug!("{}: attempt {} failed: {}", provider, attempt + 1, e);
                    delay = backoff;
                    last_err = Some(classify(provider, &e));
                }
            }
        }

        Err(last_err.unwrap_or(LookupError::Transport {
            provider,
            detail: "no attempt was made".to_string(),
        }))
    }

    fn retry_after(&self, resp: &Response) -> Option<Duration> {
        let secs = resp
            .headers()
            .get(RETRY_AFTER)?
            .to_str()
            .ok()?
            .trim()
            .parse::<u64>()
            .ok()?;
        Some(Duration::from_secs(secs).min(self.max_retry_after))
    }
}

pub fn is_retryable(status: StatusCode) -> bool {
    RETRY_STATUSES.contains(&status.as_u16())
}

fn classify(provider: &'static str, e: &reqwest::Error) -> LookupError {
    if e.is_timeout() {
        LookupError::Timeout { provider }
    } else {
        LookupError::Transport {
            provider,
            detail: e.to_string(),
        }
    }
}

async fn read_json(provider: &'static str, resp: Response) -> Result<Value, LookupError> {
    let text = resp.text().await.map_err(|e| classify(provider, &e))?;
    serde_json::from_str(&text).map_err(|e| LookupError::Malformed {
        provider,
        detail: e.to_string(),
    })
}
