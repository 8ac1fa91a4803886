use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};

use crate::app_config::{AppConfig, BattleType};
use crate::roster::DEFAULT_EXCLUDED_CATEGORIES;
use crate::ConfigError;

const DEFAULT_API_BASE_URL: &str = "https://api.link-like-lovelive.app/v1";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    let today = chrono::Local::now().date_naive();
    build_app_config(|key| std::env::var(key), today)
}

/// Build application configuration using the provided env-var lookup function.
///
/// `today` anchors the default event start (first day of the current month).
fn build_app_config<F>(lookup: F, today: NaiveDate) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let non_empty = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let api_key = require("RANKSCRAPE_API_KEY")?;
    let api_base_url = or_default("RANKSCRAPE_API_BASE_URL", DEFAULT_API_BASE_URL);
    let client_version = or_default("RANKSCRAPE_CLIENT_VERSION", "3.0.10");
    let res_version = or_default("RANKSCRAPE_RES_VERSION", "");
    let device_id =
        non_empty("RANKSCRAPE_DEVICE_ID").unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let player_id = non_empty("RANKSCRAPE_PLAYER_ID");
    let auth_token = non_empty("RANKSCRAPE_AUTH_TOKEN");
    let log_level = or_default("RANKSCRAPE_LOG_LEVEL", "info");
    let output_dir = PathBuf::from(or_default("RANKSCRAPE_OUTPUT_DIR", "./output"));

    let concurrency = parse_usize("RANKSCRAPE_CONCURRENCY", "100")?;
    let max_attempts = parse_u32("RANKSCRAPE_MAX_ATTEMPTS", "3")?;
    let backoff_base_ms = parse_u64("RANKSCRAPE_BACKOFF_BASE_MS", "1000")?;
    let request_timeout_secs = parse_u64("RANKSCRAPE_REQUEST_TIMEOUT_SECS", "30")?;
    let target_rank = parse_u32("RANKSCRAPE_TARGET_RANK", "99999")?;
    let page_size = parse_u32("RANKSCRAPE_PAGE_SIZE", "26")?;

    if concurrency == 0 {
        return Err(invalid("RANKSCRAPE_CONCURRENCY", "must be at least 1".to_string()));
    }
    if max_attempts == 0 {
        return Err(invalid("RANKSCRAPE_MAX_ATTEMPTS", "must be at least 1".to_string()));
    }
    if page_size == 0 {
        return Err(invalid("RANKSCRAPE_PAGE_SIZE", "must be at least 1".to_string()));
    }

    let battle_type = parse_battle_type(&or_default("RANKSCRAPE_BATTLE_TYPE", "personal"))
        .map_err(|reason| invalid("RANKSCRAPE_BATTLE_TYPE", reason))?;

    let event_start = match non_empty("RANKSCRAPE_EVENT_START") {
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|e| invalid("RANKSCRAPE_EVENT_START", e.to_string()))?,
        None => today.with_day(1).unwrap_or(today),
    };

    let excluded_categories = match lookup("RANKSCRAPE_EXCLUDED_CATEGORIES") {
        Ok(raw) => parse_id_list(&raw)
            .map_err(|reason| invalid("RANKSCRAPE_EXCLUDED_CATEGORIES", reason))?,
        Err(_) => DEFAULT_EXCLUDED_CATEGORIES.iter().copied().collect(),
    };

    let phase_deadline_secs = match non_empty("RANKSCRAPE_PHASE_DEADLINE_SECS") {
        Some(raw) => Some(
            raw.trim()
                .parse::<u64>()
                .map_err(|e| invalid("RANKSCRAPE_PHASE_DEADLINE_SECS", e.to_string()))?,
        ),
        None => None,
    };

    let unattended = parse_bool(&or_default("RANKSCRAPE_UNATTENDED", "false"))
        .map_err(|reason| invalid("RANKSCRAPE_UNATTENDED", reason))?;

    Ok(AppConfig {
        api_base_url,
        api_key,
        client_version,
        res_version,
        device_id,
        player_id,
        auth_token,
        log_level,
        output_dir,
        concurrency,
        max_attempts,
        backoff_base_ms,
        request_timeout_secs,
        target_rank,
        page_size,
        battle_type,
        event_start,
        excluded_categories,
        phase_deadline_secs,
        unattended,
    })
}

fn parse_battle_type(s: &str) -> Result<BattleType, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "personal" => Ok(BattleType::Personal),
        "guild" => Ok(BattleType::Guild),
        other => Err(format!("expected 'personal' or 'guild', got '{other}'")),
    }
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        other => Err(format!("expected a boolean, got '{other}'")),
    }
}

/// Parses a comma-separated list of category ids. Blank input yields an empty set.
fn parse_id_list(s: &str) -> Result<BTreeSet<u32>, String> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u32>()
                .map_err(|e| format!("'{part}' is not a category id: {e}"))
        })
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
