//! The single-request seam between the harvesting core and HTTP.
//!
//! The core only depends on [`Transport`]: POST a JSON payload with a header
//! map, get back status, headers and (if it parses) the JSON body.
//! [`HttpTransport`] is the `reqwest` implementation.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::error::ClientError;

/// One POST request against the game API.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub url: String,
    /// Header names are lowercase.
    pub headers: BTreeMap<String, String>,
    pub payload: Value,
}

/// A response as seen by the transport, before any status handling.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    /// Header names are lowercase.
    pub headers: BTreeMap<String, String>,
    /// `None` when the body is empty or not valid JSON.
    pub body: Option<Value>,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Executes one POST. Any HTTP response, whatever its status, is `Ok`;
    /// only failures to get a response at all are `Err`.
    async fn post_json(&self, request: &ApiRequest) -> Result<RawResponse, ClientError>;
}

pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, request: &ApiRequest) -> Result<RawResponse, ClientError> {
        let mut builder = self.client.post(&request.url).json(&request.payload);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_owned()))
            })
            .collect();

        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            None
        } else {
            serde_json::from_str::<Value>(&text).ok()
        };

        if body.is_none() && !text.trim().is_empty() {
            tracing::debug!(url = %request.url, status, "response body is not JSON");
        }

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
