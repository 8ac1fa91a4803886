//! Immutable request context: base URL plus the header set every request carries.
//!
//! A [`Session`] is never mutated once requests are in flight. Logging in
//! produces a new value via [`Session::with_credential`].

use std::collections::BTreeMap;

use rankscrape_core::AppConfig;
use serde_json::Value;

use crate::auth::Credential;
use crate::transport::ApiRequest;

const AUTHORIZATION: &str = "authorization";
const RES_VERSION: &str = "x-res-version";
pub(crate) const IDEMPOTENCY_KEY: &str = "x-idempotency-key";

#[derive(Clone)]
pub struct Session {
    base_url: String,
    headers: BTreeMap<String, String>,
}

impl Session {
    /// Header names are normalised to lowercase.
    #[must_use]
    pub fn new(base_url: &str, headers: BTreeMap<String, String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v))
                .collect(),
        }
    }

    /// The header set the mobile client sends, plus the configured token if any.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        let mut headers = BTreeMap::new();
        let mut set = |k: &str, v: String| {
            headers.insert(k.to_owned(), v);
        };
        set(RES_VERSION, config.res_version.clone());
        set("x-client-version", config.client_version.clone());
        set("x-device-specific-id", config.device_id.clone());
        set("x-device-type", "android".to_owned());
        set(IDEMPOTENCY_KEY, uuid::Uuid::new_v4().simple().to_string());
        set("inspix-user-api-version", "1.0.0".to_owned());
        set("accept", "application/json".to_owned());
        set("content-type", "application/json".to_owned());
        set("x-api-key", config.api_key.clone());
        set(
            "user-agent",
            format!("inspix-android/{}", config.client_version),
        );
        if let Some(token) = &config.auth_token {
            set(AUTHORIZATION, bearer(token));
        }
        Self::new(&config.api_base_url, headers)
    }

    /// A new session carrying `credential`; `self` is left untouched.
    #[must_use]
    pub fn with_credential(&self, credential: &Credential) -> Self {
        let mut next = self.clone();
        next.headers
            .insert(AUTHORIZATION.to_owned(), bearer(&credential.token));
        if let Some(version) = &credential.res_version {
            next.headers.insert(RES_VERSION.to_owned(), version.clone());
        }
        next
    }

    #[must_use]
    pub fn has_authorization(&self) -> bool {
        self.headers.contains_key(AUTHORIZATION)
    }

    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    #[must_use]
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Builds a POST request for `endpoint` with this session's headers.
    #[must_use]
    pub fn request(&self, endpoint: &str, payload: Value) -> ApiRequest {
        ApiRequest {
            url: self.url(endpoint),
            headers: self.headers.clone(),
            payload,
        }
    }

    /// Like [`Self::request`] but without the `Authorization` header.
    #[must_use]
    pub fn anonymous_request(&self, endpoint: &str, payload: Value) -> ApiRequest {
        let mut request = self.request(endpoint, payload);
        request.headers.remove(AUTHORIZATION);
        request
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn bearer(token: &str) -> String {
    if token.starts_with("Bearer ") {
        token.to_owned()
    } else {
        format!("Bearer {token}")
    }
}
