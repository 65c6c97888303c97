//! Retry utilities shared by the HTTP adapters.
//!
//! Transient failures (network errors, 5xx) are retried with exponential
//! backoff. Rate limits are not retried: adapters stop at the throttled request
//! and return what they collected before it.

use std::future::Future;
use std::time::Duration;

use crate::error::SourceError;
use crate::source::FetchContext;

/// Returns `true` if `err` is a transient condition worth another attempt.
///
/// - [`SourceError::Http`]: connection reset, timeout, TLS hiccup.
/// - [`SourceError::UnexpectedStatus`] with a 5xx status.
///
/// Everything else (auth, 4xx, parse failures, rate limits) is returned
/// immediately.
fn is_retriable(err: &SourceError) -> bool {
    match err {
        SourceError::Http(_) => true,
        SourceError::UnexpectedStatus { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Executes `operation` with exponential backoff retries on transient errors.
///
/// The wait before the n-th retry is `backoff_base_ms * 2^(n-1)` milliseconds.
/// With `max_retries = 2` the operation runs at most 3 times. A backoff that
/// would cross the deadline in `ctx` is not taken; the last error is
/// returned instead.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    ctx: &FetchContext,
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !is_retriable(&err) || attempt >= max_retries {
            return Err(err);
        }

        let delay = Duration::from_millis(backoff_base_ms.saturating_mul(1u64 << attempt.min(62)));
        if delay >= ctx.remaining() {
            tracing::debug!(attempt, error = %err, "no time left for retry backoff");
            return Err(err);
        }

        tracing::warn!(
            attempt,
            max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "transient source error, retrying after backoff"
        );
        if !ctx.pause(delay).await {
            return Err(err);
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn server_error() -> SourceError {
        SourceError::UnexpectedStatus {
            status: 503,
            url: "https://api.example.com/search".to_owned(),
        }
    }

    fn ctx() -> FetchContext {
        FetchContext::with_timeout(Duration::from_secs(60))
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(&ctx(), 3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, SourceError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(&ctx(), 3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                let n = cc.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(server_error())
                } else {
                    Ok::<u32, SourceError>(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn propagates_last_error_after_exhausting_retries() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(&ctx(), 2, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, SourceError>(server_error())
            }
        })
        .await;
        // max_retries=2 → 3 total attempts
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
        assert!(matches!(
            result,
            Err(SourceError::UnexpectedStatus { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn does_not_retry_rate_limits() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(&ctx(), 3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, SourceError>(SourceError::RateLimited {
                    source_name: "twitter".to_owned(),
                    retry_after_secs: Some(900),
                })
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(SourceError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(&ctx(), 3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, SourceError>(SourceError::UnexpectedStatus {
                    status: 404,
                    url: "https://api.example.com/missing".to_owned(),
                })
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn skips_backoff_that_would_cross_the_deadline() {
        let ctx = FetchContext::with_timeout(Duration::from_secs(1));
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(&ctx, 5, 5_000, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, SourceError>(server_error())
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(result.is_err());
    }
}
