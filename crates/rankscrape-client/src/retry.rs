//! Retry with exponential back-off for game API requests.
//!
//! [`retry_with_backoff`] wraps any fallible async operation and retries on
//! transient errors (network failures, non-200 statuses, unreadable bodies).
//! [`ClientError::EventInactive`] is returned immediately: once the event is
//! over every further attempt is wasted. A caller-supplied guard is consulted
//! before every attempt so work that became pointless mid-retry is dropped.

use std::future::Future;
use std::time::Duration;

use crate::error::ClientError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:** network failures, non-200 statuses, empty or non-JSON
/// bodies.
///
/// **Not retriable:**
/// - [`ClientError::EventInactive`]: fatal, stop immediately.
/// - [`ClientError::Api`]: application-level error.
/// - [`ClientError::Auth`]: no credential available.
pub(crate) fn is_retriable(err: &ClientError) -> bool {
    match err {
        ClientError::Http(_)
        | ClientError::UnexpectedStatus { .. }
        | ClientError::MissingBody { .. } => true,
        ClientError::Api { .. } | ClientError::EventInactive { .. } | ClientError::Auth(_) => {
            false
        }
    }
}

/// Runs `operation` up to `max_attempts` times in total on transient errors.
///
/// Back-off schedule with `backoff_base_ms = 1_000` and `max_attempts = 3`:
///
/// | Attempt | Sleep before next attempt |
/// |---------|---------------------------|
/// | 1       | 1 000 ms × 2⁰             |
/// | 2       | 1 000 ms × 2¹             |
/// | 3       | none, last error returned |
///
/// Non-retriable errors are returned immediately. `Ok(None)` means
/// `should_continue` returned `false` before an attempt.
pub(crate) async fn retry_with_backoff<T, G, F, Fut>(
    max_attempts: u32,
    backoff_base_ms: u64,
    mut should_continue: G,
    mut operation: F,
) -> Result<Option<T>, ClientError>
where
    G: FnMut() -> bool,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1u32;
    loop {
        if !should_continue() {
            tracing::debug!(attempt, "request no longer needed");
            return Ok(None);
        }
        match operation().await {
            Ok(value) => return Ok(Some(value)),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_attempts {
                    return Err(err);
                }
                let delay_ms = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(20));
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms,
                    error = %err,
                    "transient API error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                attempt += 1;
            }
        }
    }
}
