use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::NaiveDate;

/// Which grand-prix flavour the event id is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleType {
    Personal,
    Guild,
}

impl BattleType {
    /// Leading digit of the grand-prix event id.
    #[must_use]
    pub fn event_prefix(self) -> u32 {
        match self {
            BattleType::Personal => 8,
            BattleType::Guild => 7,
        }
    }
}

impl std::fmt::Display for BattleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BattleType::Personal => write!(f, "personal"),
            BattleType::Guild => write!(f, "guild"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub api_key: String,
    pub client_version: String,
    pub res_version: String,
    pub device_id: String,
    pub player_id: Option<String>,
    pub auth_token: Option<String>,
    pub log_level: String,
    pub output_dir: PathBuf,
    pub concurrency: usize,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub request_timeout_secs: u64,
    pub target_rank: u32,
    pub page_size: u32,
    pub battle_type: BattleType,
    pub event_start: NaiveDate,
    pub excluded_categories: BTreeSet<u32>,
    pub phase_deadline_secs: Option<u64>,
    pub unattended: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_base_url", &self.api_base_url)
            .field("api_key", &"[redacted]")
            .field("client_version", &self.client_version)
            .field("res_version", &self.res_version)
            .field("device_id", &self.device_id)
            .field("player_id", &self.player_id)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[redacted]"),
            )
            .field("log_level", &self.log_level)
            .field("output_dir", &self.output_dir)
            .field("concurrency", &self.concurrency)
            .field("max_attempts", &self.max_attempts)
            .field("backoff_base_ms", &self.backoff_base_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("target_rank", &self.target_rank)
            .field("page_size", &self.page_size)
            .field("battle_type", &self.battle_type)
            .field("event_start", &self.event_start)
            .field("excluded_categories", &self.excluded_categories)
            .field("phase_deadline_secs", &self.phase_deadline_secs)
            .field("unattended", &self.unattended)
            .finish()
    }
}
