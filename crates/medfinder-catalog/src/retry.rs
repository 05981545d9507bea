//! Backoff for transient catalog fetch failures.
//!
//! Only rate limiting and network-level failures are retried. Everything else
//! (404s, bad bodies, unexpected statuses) is returned on the first try. A
//! server's `Retry-After` is honoured when it asks for a longer wait than the
//! exponential schedule would give.

use std::future::Future;
use std::time::Duration;

use crate::error::CatalogError;

/// Upper bound on a server-requested wait, so a hostile `Retry-After` cannot
/// park the caller indefinitely.
const MAX_RETRY_AFTER_SECS: u64 = 300;

/// Wait before retry number `retry` (zero-based), or `None` if `err` is final.
fn backoff_for(err: &CatalogError, retry: u32, backoff_base_secs: u64) -> Option<Duration> {
    let exponential = backoff_base_secs.saturating_mul(1u64 << retry.min(62));
    let secs = match err {
        CatalogError::RateLimited {
            retry_after_secs, ..
        } => exponential.max((*retry_after_secs).min(MAX_RETRY_AFTER_SECS)),
        CatalogError::Http(_) => exponential,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}

/// Runs `operation`, retrying transient errors up to `max_retries` more times.
///
/// The wait before retry `n` is `backoff_base_secs * 2^n` seconds, raised to
/// the server's `Retry-After` on a 429. When retries run out the last error
/// is returned.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, CatalogError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CatalogError>>,
{
    let mut retry = 0u32;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        let delay = match backoff_for(&err, retry, backoff_base_secs) {
            Some(delay) if retry < max_retries => delay,
            _ => return Err(err),
        };

        tracing::warn!(
            retry = retry + 1,
            max_retries,
            delay_secs = delay.as_secs(),
            error = %err,
            "transient catalog error, retrying"
        );
        tokio::time::sleep(delay).await;
        retry += 1;
    }
}
