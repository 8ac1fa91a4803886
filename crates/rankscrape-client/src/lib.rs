pub mod auth;
pub mod client;
pub mod error;
mod retry;
pub mod session;
pub mod transport;

pub use auth::{Credential, LoginTokenProvider, StaticTokenProvider, TokenProvider};
pub use client::{check_event_inactive, RetryingTransport, EVENT_INACTIVE_CODE};
pub use error::ClientError;
pub use session::Session;
pub use transport::{ApiRequest, HttpTransport, RawResponse, Transport};
