//! Bounded-retry fetch of release version metadata
//!
//! Network-dependent steps retry a fixed number of times with fixed backoff,
//! then fail. Nothing here retries indefinitely.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::config::RetryPolicy;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("download failed after {attempts} attempts: {url} ({detail})")]
    Exhausted {
        url: String,
        attempts: u32,
        detail: String,
    },
}

/// Run `op` up to `policy.max_attempts` times, sleeping `policy.delay`
/// between attempts. Returns the last error with the attempt count.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, (u32, E)>
where
    E: std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if attempt >= max_attempts => return Err((attempt, error)),
            Err(error) => {
                tracing::warn!(attempt, max_attempts, %error, "attempt failed, retrying");
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}

/// Resolves `latest` version markers from release metadata endpoints
/// (e.g. the go.dev VERSION endpoint or the Kubernetes stable.txt file).
pub struct VersionFetcher {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl VersionFetcher {
    pub fn new(retry: RetryPolicy) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("rigup/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, retry }
    }

    /// Fetch the endpoint and return the first whitespace-delimited token of
    /// the body, which is the version string for the endpoints we consume.
    pub async fn latest_version(&self, url: &str) -> Result<String, FetchError> {
        let client = &self.client;
        let result = with_retry(&self.retry, |_attempt| async move {
            let body = client
                .get(url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| e.to_string())?
                .text()
                .await
                .map_err(|e| e.to_string())?;
            body.split_whitespace()
                .next()
                .map(str::to_string)
                .ok_or_else(|| "empty response body".to_string())
        })
        .await;

        match result {
            Ok(version) => {
                tracing::debug!(url, version, "resolved latest version");
                Ok(version)
            }
            Err((attempts, detail)) => Err(FetchError::Exhausted {
                url: url.to_string(),
                attempts,
                detail,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn always_failing_op_is_attempted_exactly_max_times() {
        let attempts = AtomicU32::new(0);
        let policy = fast_policy(4);

        let result: Result<(), (u32, String)> = with_retry(&policy, |_| {
            let attempts = &attempts;
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err("refused".to_string())
            }
        })
        .await;

        let (reported, _) = result.unwrap_err();
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert_eq!(reported, 4);
    }

    #[tokio::test]
    async fn succeeds_without_exhausting_attempts() {
        let attempts = AtomicU32::new(0);
        let policy = fast_policy(5);

        let result: Result<u32, (u32, String)> = with_retry(&policy, |attempt| {
            let attempts = &attempts;
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                if attempt < 3 {
                    Err("not yet".to_string())
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_max_attempts_still_runs_once() {
        let attempts = AtomicU32::new(0);
        let policy = fast_policy(0);

        let result: Result<(), (u32, String)> = with_retry(&policy, |_| {
            let attempts = &attempts;
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err("no".to_string())
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
