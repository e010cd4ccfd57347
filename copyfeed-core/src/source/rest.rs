//! Backend RPC client.
//!
//! The hosted backend exposes the feed's data-access functions as PostgREST
//! style remote procedures: `POST {url}/rest/v1/rpc/{function}` with a JSON
//! argument object, authenticated by the project's anon key. This client adds
//! bounded retries with exponential backoff and a shared circuit breaker.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use super::circuit_breaker::CircuitBreaker;
use super::{CancelToken, FetchError, SignalSource};
use crate::config::BackendConfig;
use crate::domain::{Direction, Signal, TraderId, UserId};

/// Connection settings for `RestSource`.
#[derive(Debug, Clone)]
pub struct RestSourceOptions {
    pub base_url: String,
    pub anon_key: String,
    /// Session token of the signed-in user; falls back to the anon key.
    pub access_token: Option<String>,
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RestSourceOptions {
    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            base_url: config.url.clone(),
            anon_key: config.anon_key.clone(),
            access_token: None,
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// Longest single wait between retries.
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Wait before retry `attempt` (1-based): `base * 2^(attempt-1)`, capped.
fn backoff(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

/// Trader id rows come back either as bare strings or as `{ "trader_id": ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TraderIdRow {
    Bare(TraderId),
    Row { trader_id: TraderId },
}

impl From<TraderIdRow> for TraderId {
    fn from(row: TraderIdRow) -> Self {
        match row {
            TraderIdRow::Bare(id) | TraderIdRow::Row { trader_id: id } => id,
        }
    }
}

/// `SignalSource` backed by the hosted backend.
pub struct RestSource {
    client: reqwest::blocking::Client,
    options: RestSourceOptions,
    circuit_breaker: Arc<CircuitBreaker>,
    cancel: CancelToken,
}

impl RestSource {
    pub fn new(options: RestSourceOptions, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(options.timeout)
            .user_agent(concat!("copyfeed/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            options,
            circuit_breaker,
            cancel: CancelToken::new(),
        }
    }

    /// Abort retries and backoff waits once `cancel` fires. A request already
    /// on the wire still runs until it answers or times out.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// RPC endpoint for a database function.
    pub fn rpc_url(base_url: &str, function: &str) -> String {
        format!("{}/rest/v1/rpc/{function}", base_url.trim_end_matches('/'))
    }

    fn bearer(&self) -> &str {
        self.options
            .access_token
            .as_deref()
            .unwrap_or(&self.options.anon_key)
    }

    /// Call one RPC function with retry and circuit breaker logic.
    fn call<T: DeserializeOwned>(&self, function: &str, args: Value) -> Result<T, FetchError> {
        let url = Self::rpc_url(&self.options.base_url, function);
        let mut last_error = None;

        for attempt in 0..=self.options.max_retries {
            if attempt > 0 {
                let delay = backoff(self.options.base_delay, attempt);
                tracing::debug!(function, attempt, delay_ms = delay.as_millis() as u64, "retrying");
                self.cancel.sleep(delay)?;
            }
            self.cancel.check()?;

            if !self.circuit_breaker.is_allowed() {
                tracing::warn!(
                    function,
                    cooldown_secs = self.circuit_breaker.remaining_cooldown().as_secs(),
                    "backend blocked by circuit breaker"
                );
                return Err(FetchError::CircuitBreakerTripped);
            }

            tracing::debug!(function, attempt, "rpc call");

            let response = self
                .client
                .post(&url)
                .header("apikey", &self.options.anon_key)
                .bearer_auth(self.bearer())
                .json(&args)
                .send();

            let resp = match response {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    self.circuit_breaker.record_failure();
                    last_error = Some(FetchError::Network(e.to_string()));
                    continue;
                }
                Err(e) => return Err(FetchError::Network(e.to_string())),
            };

            let status = resp.status();

            if status == reqwest::StatusCode::FORBIDDEN {
                self.circuit_breaker.trip();
                return Err(FetchError::Backend {
                    status: status.as_u16(),
                    message: format!("{function} refused"),
                });
            }

            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(FetchError::Unauthorized(format!(
                    "{function} rejected the API key"
                )));
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                self.circuit_breaker.record_failure();
                last_error = Some(FetchError::Backend {
                    status: status.as_u16(),
                    message: resp.text().unwrap_or_default(),
                });
                continue;
            }

            if !status.is_success() {
                return Err(FetchError::Backend {
                    status: status.as_u16(),
                    message: resp.text().unwrap_or_default(),
                });
            }

            let parsed = resp
                .json::<T>()
                .map_err(|e| FetchError::Malformed(format!("{function}: {e}")))?;
            self.circuit_breaker.record_success();
            return Ok(parsed);
        }

        Err(last_error.unwrap_or_else(|| FetchError::Network("max retries exceeded".into())))
    }

    fn trader_ids(&self, function: &str, user: &UserId) -> Result<Vec<TraderId>, FetchError> {
        let rows: Vec<TraderIdRow> = self.call(function, json!({ "p_user_id": user.as_str() }))?;
        Ok(rows.into_iter().map(TraderId::from).collect())
    }
}

impl SignalSource for RestSource {
    fn name(&self) -> &str {
        "backend"
    }

    fn fetch_active_signals(&self, max_count: usize) -> Result<Vec<Signal>, FetchError> {
        self.call("get_active_signals", json!({ "limit_count": max_count }))
    }

    fn fetch_signals_by_direction(
        &self,
        direction: Direction,
        max_count: usize,
    ) -> Result<Vec<Signal>, FetchError> {
        self.call(
            "get_signals_by_direction",
            json!({ "p_direction": direction.as_str(), "limit_count": max_count }),
        )
    }

    fn fetch_subscribed_trader_ids(&self, user: &UserId) -> Result<Vec<TraderId>, FetchError> {
        self.trader_ids("get_subscribed_trader_ids", user)
    }

    fn fetch_followed_trader_ids(&self, user: &UserId) -> Result<Vec<TraderId>, FetchError> {
        self.trader_ids("get_followed_trader_ids", user)
    }
}
