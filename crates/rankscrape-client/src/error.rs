use thiserror::Error;

/// Errors returned by the game API client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Any status other than 200.
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// A 200 response whose body is empty or not JSON.
    #[error("response from {url} has no JSON body")]
    MissingBody { url: String },

    /// The API answered with an application-level `error_code`.
    #[error("API error {code}: {message}")]
    Api { code: String, message: String },

    /// The competitive event is not currently running. Continuing would only
    /// burn requests, so callers must treat this as fatal.
    #[error("event is not active: {message}")]
    EventInactive { message: String },

    /// No credential could be obtained.
    #[error("authentication failed: {0}")]
    Auth(String),
}

impl ClientError {
    #[must_use]
    pub fn is_event_inactive(&self) -> bool {
        matches!(self, ClientError::EventInactive { .. })
    }
}
