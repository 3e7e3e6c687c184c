//! Request execution: the only layer that issues HTTP calls.
//!
//! Handles authentication headers, JSON bodies, failure classification,
//! retries with exponential backoff and jitter, and a bound on the number
//! of requests in flight. Layers above never retry on their own; they
//! interpret the classified result.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use crate::config::{Credentials, Settings};

use super::error::{ApiError, Result};
use super::session::SessionManager;
use super::transport::{Method, Transport, TransportRequest, TransportResponse};

/// Default bound on concurrently executing requests.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// Retry policy for transient failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each attempt after that.
    pub base_delay: Duration,
    /// Cap on the computed backoff (jitter is added on top).
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(15),
        }
    }
}

impl From<&Settings> for RetryConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: Duration::from_millis(settings.retry_base_delay_ms),
            max_delay: Duration::from_millis(settings.retry_max_delay_ms),
        }
    }
}

impl RetryConfig {
    /// Exponential backoff with uniform jitter, capped at `max_delay`.
    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
        let capped = exp.min(self.max_delay);
        let jitter_ms = rand::thread_rng().gen_range(0..=capped.as_millis() as u64 / 2);
        capped + Duration::from_millis(jitter_ms)
    }
}

/// Executes tracker API requests with a consistent retry and error policy.
pub struct RequestExecutor<T> {
    transport: Arc<T>,
    session: Arc<SessionManager<T>>,
    base_url: String,
    retry: RetryConfig,
    limiter: Arc<Semaphore>,
}

impl<T: Transport> RequestExecutor<T> {
    pub fn new(
        credentials: &Credentials,
        transport: Arc<T>,
        session: Arc<SessionManager<T>>,
    ) -> Self {
        Self {
            transport,
            session,
            base_url: credentials.base_url().to_string(),
            retry: RetryConfig::default(),
            limiter: Arc::new(Semaphore::new(DEFAULT_MAX_IN_FLIGHT)),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.limiter = Arc::new(Semaphore::new(max_in_flight.max(1)));
        self
    }

    /// Send a request and return the parsed JSON body.
    ///
    /// `path` is relative to the base URL (e.g. `/rest/api/3/issue/X-1`).
    /// Empty success bodies (204 and friends) come back as `Value::Null`.
    #[instrument(skip(self, body), fields(method = method.as_str(), path = %path))]
    pub async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let _permit = self
            .limiter
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ApiError::Internal("request limiter closed".to_string()))?;

        let url = format!("{}{}", self.base_url, path);
        let mut attempt: u32 = 0;
        let mut reauthed = false;

        loop {
            attempt += 1;
            let auth_header = self.session.auth_header().await?;
            let request = TransportRequest {
                method,
                url: url.clone(),
                auth_header: Some(auth_header),
                body: body.clone(),
            };

            let outcome = match self.transport.execute(request).await {
                Ok(response) => classify(response),
                Err(e) => Err(ApiError::Network(e.to_string())),
            };

            match outcome {
                Ok(value) => {
                    debug!(attempt, "request succeeded");
                    return Ok(value);
                }
                Err(e) if e.is_auth() && !reauthed => {
                    // The server rejected a token it issued: refresh the
                    // session once and retry immediately. A second auth
                    // failure surfaces.
                    warn!("auth rejected, refreshing session and retrying");
                    self.session.invalidate().await;
                    reauthed = true;
                    attempt -= 1; // the re-auth retry does not consume an attempt
                }
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "request failed, retrying: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Send a request and deserialize the response body into `D`.
    pub async fn send_as<D: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<D> {
        let value = self.send(method, path, body).await?;
        serde_json::from_value(value)
            .map_err(|e| ApiError::Internal(format!("unexpected response shape: {}", e)))
    }
}

/// Split a response into a parsed success value or a classified error.
fn classify(response: TransportResponse) -> Result<Value> {
    if (200..300).contains(&response.status) {
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Internal(format!("malformed response body: {}", e)))
    } else {
        Err(error_from_response(response.status, &response.body))
    }
}

/// Mine the error body for tracker-reported messages before falling back to
/// the bare status.
fn error_from_response(status: u16, body: &str) -> ApiError {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if let Some(messages) = json.get("errorMessages").and_then(|m| m.as_array()) {
            if !messages.is_empty() {
                let joined = messages
                    .iter()
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                return ApiError::from_status(status, &joined);
            }
        }
        if let Some(errors) = json.get("errors").and_then(|e| e.as_object()) {
            if !errors.is_empty() {
                let joined = errors
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v))
                    .collect::<Vec<_>>()
                    .join(", ");
                return ApiError::from_status(status, &joined);
            }
        }
    }

    let context = if body.is_empty() { "request failed" } else { body };
    ApiError::from_status(status, context)
}
