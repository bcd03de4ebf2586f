//! JSON-over-HTTP requests with per-attempt timeouts and bounded retry.
//!
//! Shared by the embedding and generation providers. The strategy:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors and elapsed timeouts → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! Each attempt (send plus body read) is bounded by
//! [`RetryPolicy::timeout`] via `tokio::time::timeout`.

use std::time::Duration;

use ragdoc_core::error::{EmbeddingError, GenerationError};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Bound on a single attempt.
    pub timeout: Duration,
    /// First backoff delay; doubled per retry up to 32×.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, timeout_secs: u64) -> Self {
        Self {
            max_retries,
            timeout: Duration::from_secs(timeout_secs),
            base_delay: Duration::from_secs(1),
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * (1u32 << (attempt.saturating_sub(1)).min(5))
    }
}

/// Why a request ultimately failed.
#[derive(Debug)]
pub enum HttpFailure {
    Timeout(Duration),
    Status { status: u16, body: String },
    Transport(String),
    Decode(String),
}

impl HttpFailure {
    fn is_transient(&self) -> bool {
        match self {
            HttpFailure::Timeout(_) | HttpFailure::Transport(_) => true,
            HttpFailure::Status { status, .. } => *status == 429 || *status >= 500,
            HttpFailure::Decode(_) => false,
        }
    }
}

impl From<HttpFailure> for EmbeddingError {
    fn from(f: HttpFailure) -> Self {
        match f {
            HttpFailure::Timeout(d) => EmbeddingError::Timeout(d),
            HttpFailure::Status { status, body } => EmbeddingError::Service { status, body },
            HttpFailure::Transport(msg) => EmbeddingError::Transport(msg),
            HttpFailure::Decode(msg) => EmbeddingError::InvalidResponse(msg),
        }
    }
}

impl From<HttpFailure> for GenerationError {
    fn from(f: HttpFailure) -> Self {
        match f {
            HttpFailure::Timeout(d) => GenerationError::Timeout(d),
            HttpFailure::Status { status, body } => GenerationError::Service { status, body },
            HttpFailure::Transport(msg) => GenerationError::Transport(msg),
            HttpFailure::Decode(msg) => GenerationError::InvalidResponse(msg),
        }
    }
}

/// POST `body` to `url` and return the decoded JSON response.
///
/// `service` names the remote end in log lines.
pub async fn post_json(
    client: &reqwest::Client,
    url: &str,
    bearer: Option<&str>,
    body: &serde_json::Value,
    policy: &RetryPolicy,
    service: &str,
) -> Result<serde_json::Value, HttpFailure> {
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            tokio::time::sleep(policy.backoff(attempt)).await;
        }

        let result = match tokio::time::timeout(policy.timeout, send_once(client, url, bearer, body)).await {
            Ok(r) => r,
            Err(_) => Err(HttpFailure::Timeout(policy.timeout)),
        };

        match result {
            Ok(json) => {
                debug!(service, url, attempt, "request succeeded");
                return Ok(json);
            }
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                warn!(
                    service,
                    attempt,
                    max_retries = policy.max_retries,
                    error = ?e,
                    "transient failure; retrying"
                );
            }
            Err(e) => return Err(e),
        }
    }
}

async fn send_once(
    client: &reqwest::Client,
    url: &str,
    bearer: Option<&str>,
    body: &serde_json::Value,
) -> Result<serde_json::Value, HttpFailure> {
    let mut request = client
        .post(url)
        .header("Content-Type", "application/json")
        .json(body);
    if let Some(key) = bearer {
        request = request.header("Authorization", format!("Bearer {}", key));
    }

    let response = request
        .send()
        .await
        .map_err(|e| HttpFailure::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        return Err(HttpFailure::Status {
            status: status.as_u16(),
            body: body_text,
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| HttpFailure::Transport(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| HttpFailure::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let p = RetryPolicy::new(10, 30);
        assert_eq!(p.backoff(1), Duration::from_secs(1));
        assert_eq!(p.backoff(2), Duration::from_secs(2));
        assert_eq!(p.backoff(4), Duration::from_secs(8));
        assert_eq!(p.backoff(6), Duration::from_secs(32));
        assert_eq!(p.backoff(9), Duration::from_secs(32));
    }

    #[test]
    fn test_transient_classification() {
        assert!(HttpFailure::Timeout(Duration::from_secs(1)).is_transient());
        assert!(HttpFailure::Transport("reset".into()).is_transient());
        for status in [429, 500, 503] {
            assert!(HttpFailure::Status { status, body: String::new() }.is_transient());
        }
        for status in [400, 401, 404] {
            assert!(!HttpFailure::Status { status, body: String::new() }.is_transient());
        }
        assert!(!HttpFailure::Decode("eof".into()).is_transient());
    }

    #[test]
    fn test_maps_into_core_errors() {
        let e: EmbeddingError = HttpFailure::Status { status: 503, body: "busy".into() }.into();
        assert!(matches!(e, EmbeddingError::Service { status: 503, .. }));
        let e: GenerationError = HttpFailure::Timeout(Duration::from_secs(5)).into();
        assert!(matches!(e, GenerationError::Timeout(_)));
    }
}
