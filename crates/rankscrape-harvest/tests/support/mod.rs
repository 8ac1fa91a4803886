//! In-memory fakes shared by the integration suites.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use rankscrape_client::{
    ApiRequest, ClientError, RawResponse, RetryingTransport, Session, Transport,
};
use rankscrape_harvest::{CollectionOutput, Operator, Sink, SinkError};

type Handler = dyn Fn(&ApiRequest) -> RawResponse + Send + Sync;

/// Answers every request through a routing closure and records what it saw.
pub struct FakeApi {
    handler: Box<Handler>,
    calls: Mutex<Vec<ApiRequest>>,
    delay: Option<Duration>,
}

impl FakeApi {
    pub fn new(
        handler: impl Fn(&ApiRequest) -> RawResponse + Send + Sync + 'static,
    ) -> Arc<Self> {
        Self::build(handler, None)
    }

    pub fn with_delay(
        delay: Duration,
        handler: impl Fn(&ApiRequest) -> RawResponse + Send + Sync + 'static,
    ) -> Arc<Self> {
        Self::build(handler, Some(delay))
    }

    fn build(
        handler: impl Fn(&ApiRequest) -> RawResponse + Send + Sync + 'static,
        delay: Option<Duration>,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
            delay,
        })
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn ranking_calls(&self) -> Vec<ApiRequest> {
        self.calls().into_iter().filter(|r| !is_profile(r)).collect()
    }

    pub fn profile_calls(&self) -> Vec<ApiRequest> {
        self.calls().into_iter().filter(is_profile).collect()
    }
}

#[async_trait]
impl Transport for FakeApi {
    async fn post_json(&self, request: &ApiRequest) -> Result<RawResponse, ClientError> {
        self.calls.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok((self.handler)(request))
    }
}

pub fn client(api: &Arc<FakeApi>) -> Arc<RetryingTransport> {
    client_with_backoff(api, 0)
}

pub fn client_with_backoff(api: &Arc<FakeApi>, backoff_base_ms: u64) -> Arc<RetryingTransport> {
    let transport: Arc<dyn Transport> = Arc::clone(api) as Arc<dyn Transport>;
    Arc::new(RetryingTransport::new(transport, 3, backoff_base_ms))
}

pub fn session() -> Session {
    let mut headers = BTreeMap::new();
    headers.insert("x-api-key".to_owned(), "test-key".to_owned());
    Session::new("https://api.test/v1", headers)
}

pub fn ok(body: Value) -> RawResponse {
    RawResponse {
        status: 200,
        headers: BTreeMap::new(),
        body: Some(body),
    }
}

pub fn status(code: u16) -> RawResponse {
    RawResponse {
        status: code,
        headers: BTreeMap::new(),
        body: None,
    }
}

pub fn event_inactive(code: u16) -> RawResponse {
    RawResponse {
        status: code,
        headers: BTreeMap::new(),
        body: Some(json!({
            "error_code": rankscrape_client::EVENT_INACTIVE_CODE,
            "message": "event is over"
        })),
    }
}

pub fn is_profile(request: &ApiRequest) -> bool {
    request.url.ends_with("profile/get_info")
}

pub fn offset(request: &ApiRequest) -> u32 {
    request.payload["target_rank"]
        .as_u64()
        .and_then(|o| u32::try_from(o).ok())
        .unwrap()
}

pub fn ranking_type(request: &ApiRequest) -> u64 {
    request.payload["ranking_type"].as_u64().unwrap_or(0)
}

pub fn player_id(request: &ApiRequest) -> String {
    request.payload["player_id"].as_str().unwrap().to_owned()
}

/// One page of a ladder with `len` entries keyed `P<rank>`, scored by rank.
pub fn ladder_page(key_field: &str, offset: u32, len: u32, page_size: u32) -> Value {
    let last = offset.saturating_add(page_size - 1).min(len);
    let entries: Vec<Value> = (offset..=last)
        .map(|rank| {
            let mut entry = Map::new();
            entry.insert(key_field.to_owned(), Value::from(format!("P{rank}")));
            entry.insert("rank".to_owned(), Value::from(rank));
            entry.insert("point".to_owned(), Value::from(100_000 - i64::from(rank)));
            Value::Object(entry)
        })
        .collect();
    json!({ "point_rankings": entries })
}

pub fn profile(key: &str) -> Value {
    json!({"profile_info": {
        "player_name": format!("name-{key}"),
        "guild_name": "guild",
        "search_guild_key": "G1",
        "dream_style_num": 3,
        "fan_level_list": [
            {"character_id": 1031, "d_season_fan_level": 10},
            {"character_id": 1052, "d_season_fan_level": 4}
        ]
    }})
}

#[derive(Default)]
pub struct RecordingSink {
    outputs: Mutex<Vec<CollectionOutput>>,
}

impl RecordingSink {
    pub fn outputs(&self) -> Vec<CollectionOutput> {
        self.outputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sink for RecordingSink {
    async fn accept(&self, output: &CollectionOutput) -> Result<(), SinkError> {
        self.outputs.lock().unwrap().push(output.clone());
        Ok(())
    }
}

/// Gives a fixed answer and counts how often it was asked.
pub struct ScriptedOperator {
    answer: bool,
    asked: AtomicUsize,
}

impl ScriptedOperator {
    pub fn new(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer,
            asked: AtomicUsize::new(0),
        })
    }

    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Operator for ScriptedOperator {
    async fn confirm(&self, _prompt: &str) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}

/// Never answers, like a terminal nobody is watching.
#[derive(Default)]
pub struct SilentOperator {
    asked: AtomicUsize,
}

impl SilentOperator {
    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Operator for SilentOperator {
    async fn confirm(&self, _prompt: &str) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}
