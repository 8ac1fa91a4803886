//! Credential acquisition.
//!
//! The pipeline depends only on [`TokenProvider`]. Two providers ship here:
//! a fixed token from configuration, and a login round-trip against the
//! game's `user/login` endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::client::RetryingTransport;
use crate::error::ClientError;
use crate::session::{Session, IDEMPOTENCY_KEY};

const LOGIN_ENDPOINT: &str = "user/login";

/// A bearer token plus the resource version the server reported with it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub res_version: Option<String>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"[redacted]")
            .field("res_version", &self.res_version)
            .finish()
    }
}

#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a usable credential.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Auth`] when no credential can be obtained, or
    /// [`ClientError::EventInactive`] if the login call hits the sentinel.
    async fn credential(&self) -> Result<Credential, ClientError>;
}

/// Hands out a token taken from configuration.
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn credential(&self) -> Result<Credential, ClientError> {
        self.token
            .as_ref()
            .map(|token| Credential {
                token: token.trim_start_matches("Bearer ").to_owned(),
                res_version: None,
            })
            .ok_or_else(|| ClientError::Auth("no auth token configured".to_owned()))
    }
}

/// Logs in with a player id and device id to obtain a fresh session token.
pub struct LoginTokenProvider {
    client: Arc<RetryingTransport>,
    session: Session,
    player_id: String,
    device_id: String,
}

impl LoginTokenProvider {
    #[must_use]
    pub fn new(
        client: Arc<RetryingTransport>,
        session: Session,
        player_id: String,
        device_id: String,
    ) -> Self {
        Self {
            client,
            session,
            player_id,
            device_id,
        }
    }
}

#[async_trait]
impl TokenProvider for LoginTokenProvider {
    async fn credential(&self) -> Result<Credential, ClientError> {
        let mut request = self.session.anonymous_request(
            LOGIN_ENDPOINT,
            json!({
                "player_id": self.player_id,
                "device_specific_id": self.device_id,
                "version": 1,
            }),
        );
        request.headers.insert(
            IDEMPOTENCY_KEY.to_owned(),
            uuid::Uuid::new_v4().simple().to_string(),
        );

        let response = self
            .client
            .execute_response(&request)
            .await?
            .ok_or_else(|| ClientError::Auth("login request failed".to_owned()))?;

        let token = response
            .body
            .as_ref()
            .and_then(|b| b.get("session_token"))
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ClientError::Auth("login response has no session_token".to_owned()))?
            .to_owned();

        // The header carries a signature after '@' that must not be echoed back.
        let res_version = response
            .headers
            .get("x-res-version")
            .and_then(|raw| raw.split('@').next())
            .filter(|v| !v.is_empty())
            .map(str::to_owned);

        tracing::info!(
            player_id = %self.player_id,
            res_version = res_version.as_deref().unwrap_or("unchanged"),
            "login succeeded"
        );

        Ok(Credential { token, res_version })
    }
}
