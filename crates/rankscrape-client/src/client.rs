//! Retrying wrapper around a [`Transport`].
//!
//! Every request goes through [`RetryingTransport`], which applies the
//! bounded exponential back-off from [`crate::retry`] and turns exhausted
//! retries into an absent result so callers can skip that unit of work. The
//! "event not active" sentinel is checked on every response body whatever
//! its status, and is the only error that escapes.

use std::sync::Arc;

use serde_json::Value;

use crate::error::ClientError;
use crate::retry::retry_with_backoff;
use crate::transport::{ApiRequest, RawResponse, Transport};

/// `error_code` the API returns when the competitive event is not running.
pub const EVENT_INACTIVE_CODE: &str = "21001_210102";

pub struct RetryingTransport {
    inner: Arc<dyn Transport>,
    max_attempts: u32,
    backoff_base_ms: u64,
}

impl RetryingTransport {
    /// `max_attempts` counts the first try; the wait after the n-th failed
    /// attempt is `backoff_base_ms * 2^(n-1)`.
    #[must_use]
    pub fn new(inner: Arc<dyn Transport>, max_attempts: u32, backoff_base_ms: u64) -> Self {
        Self {
            inner,
            max_attempts,
            backoff_base_ms,
        }
    }

    /// Executes `request` and returns the parsed body of a successful
    /// response, or `None` if the request failed after all attempts or the
    /// API answered with a non-fatal error code.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::EventInactive`] as soon as any response body
    /// carries [`EVENT_INACTIVE_CODE`].
    pub async fn execute(&self, request: &ApiRequest) -> Result<Option<Value>, ClientError> {
        Ok(self
            .execute_response(request)
            .await?
            .and_then(|response| response.body))
    }

    /// Like [`Self::execute`] but returns the whole response so callers can
    /// read headers.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::EventInactive`] as soon as any response body
    /// carries [`EVENT_INACTIVE_CODE`].
    pub async fn execute_response(
        &self,
        request: &ApiRequest,
    ) -> Result<Option<RawResponse>, ClientError> {
        self.execute_response_while(request, || true).await
    }

    /// Like [`Self::execute`], but consults `still_needed` before every
    /// attempt and returns `None` without sending once it says `false`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::EventInactive`] as soon as any response body
    /// carries [`EVENT_INACTIVE_CODE`].
    pub async fn execute_while(
        &self,
        request: &ApiRequest,
        still_needed: impl FnMut() -> bool,
    ) -> Result<Option<Value>, ClientError> {
        Ok(self
            .execute_response_while(request, still_needed)
            .await?
            .and_then(|response| response.body))
    }

    async fn execute_response_while(
        &self,
        request: &ApiRequest,
        still_needed: impl FnMut() -> bool,
    ) -> Result<Option<RawResponse>, ClientError> {
        let result = retry_with_backoff(
            self.max_attempts,
            self.backoff_base_ms,
            still_needed,
            || self.attempt(request),
        )
        .await;

        match result {
            Ok(response) => Ok(response),
            Err(err) if err.is_event_inactive() => {
                tracing::error!(url = %request.url, error = %err, "event is not active");
                Err(err)
            }
            Err(err) => {
                tracing::warn!(
                    url = %request.url,
                    max_attempts = self.max_attempts,
                    error = %err,
                    "request abandoned"
                );
                Ok(None)
            }
        }
    }

    async fn attempt(&self, request: &ApiRequest) -> Result<RawResponse, ClientError> {
        let response = self.inner.post_json(request).await?;

        if let Some(body) = &response.body {
            check_event_inactive(body)?;
        }

        if response.status != 200 {
            return Err(ClientError::UnexpectedStatus {
                status: response.status,
                url: request.url.clone(),
            });
        }

        let Some(body) = &response.body else {
            return Err(ClientError::MissingBody {
                url: request.url.clone(),
            });
        };

        if let Some(code) = error_code(body) {
            return Err(ClientError::Api {
                code,
                message: error_message(body),
            });
        }

        Ok(response)
    }
}

/// Fails with [`ClientError::EventInactive`] if `body` carries the
/// event-not-active sentinel.
///
/// # Errors
///
/// Returns [`ClientError::EventInactive`] when the sentinel is present.
pub fn check_event_inactive(body: &Value) -> Result<(), ClientError> {
    if error_code(body).as_deref() == Some(EVENT_INACTIVE_CODE) {
        return Err(ClientError::EventInactive {
            message: error_message(body),
        });
    }
    Ok(())
}

/// The body's `error_code`, accepting string or numeric encodings.
fn error_code(body: &Value) -> Option<String> {
    match body.get("error_code")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn error_message(body: &Value) -> String {
    body.get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string()
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
