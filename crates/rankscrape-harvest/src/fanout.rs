//! Second phase: one profile request per harvested entity.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use rankscrape_client::{RetryingTransport, Session};
use rankscrape_core::{DetailRecord, EntitySummary, Roster, StreamDef, StreamId, SubScore};
use serde_json::{json, Value};

use crate::error::HarvestError;

const DEFAULT_DETAIL_ENDPOINT: &str = "profile/get_info";

/// Category sub-ladder scores by entity key, built from the phase-1 harvest.
#[derive(Debug, Clone, Default)]
pub struct SiblingIndex {
    by_category: BTreeMap<String, HashMap<String, SubScore>>,
}

impl SiblingIndex {
    /// Indexes every stream that carries a category tag. Categories with no
    /// entries are still listed so their absence shows up on every record.
    #[must_use]
    pub fn from_rankings(
        streams: &[StreamDef],
        rankings: &BTreeMap<StreamId, Vec<EntitySummary>>,
    ) -> Self {
        let mut by_category = BTreeMap::new();
        for s in streams {
            let Some(category) = &s.category else {
                continue;
            };
            let scores: &mut HashMap<String, SubScore> =
                by_category.entry(category.clone()).or_default();
            for entry in rankings.get(&s.id).into_iter().flatten() {
                scores.entry(entry.key.clone()).or_insert(SubScore {
                    rank: entry.rank,
                    score: entry.score,
                });
            }
        }
        Self { by_category }
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.by_category.keys().map(String::as_str)
    }

    /// One entry per indexed category; `None` where `key` has no entry.
    #[must_use]
    pub fn sub_scores_for(&self, key: &str) -> BTreeMap<String, Option<SubScore>> {
        self.by_category
            .iter()
            .map(|(category, scores)| (category.clone(), scores.get(key).copied()))
            .collect()
    }
}

pub struct DetailFanout {
    client: Arc<RetryingTransport>,
    session: Session,
    roster: Roster,
    concurrency: usize,
    endpoint: String,
    include_last_login: bool,
}

impl DetailFanout {
    #[must_use]
    pub fn new(
        client: Arc<RetryingTransport>,
        session: Session,
        roster: Roster,
        concurrency: usize,
    ) -> Self {
        Self {
            client,
            session,
            roster,
            concurrency: concurrency.max(1),
            endpoint: DEFAULT_DETAIL_ENDPOINT.to_owned(),
            include_last_login: false,
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_last_login(mut self, include: bool) -> Self {
        self.include_last_login = include;
        self
    }

    /// Fetches and merges one detail record per summary.
    ///
    /// Entities whose fetch fails or whose profile cannot be read are left
    /// out. The result is ordered by rank ascending.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::EventInactive`] if the API reports the event is
    /// not running; requests not yet started are never sent.
    pub async fn fetch_details(
        &self,
        summaries: &[EntitySummary],
        siblings: &SiblingIndex,
    ) -> Result<Vec<DetailRecord>, HarvestError> {
        let total = summaries.len();
        tracing::info!(total, concurrency = self.concurrency, "fetching details");

        let mut pending = stream::iter(summaries)
            .map(|summary| async move { (summary, self.fetch_profile(&summary.key).await) })
            .buffer_unordered(self.concurrency);

        let mut records = Vec::with_capacity(total);
        let mut done = 0usize;
        let mut dropped = 0usize;
        while let Some((summary, result)) = pending.next().await {
            done += 1;
            let record = result?.and_then(|body| {
                detail_from_profile(
                    &self.roster,
                    summary,
                    &body,
                    siblings,
                    self.include_last_login,
                )
            });
            match record {
                Some(record) => records.push(record),
                None => {
                    dropped += 1;
                    tracing::warn!(key = %summary.key, "dropping entity without profile");
                }
            }
            if done % 100 == 0 || done == total {
                tracing::info!(done, total, dropped, "detail progress");
            }
        }

        records.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.key.cmp(&b.key)));
        Ok(records)
    }

    async fn fetch_profile(&self, key: &str) -> Result<Option<Value>, HarvestError> {
        let request = self
            .session
            .request(&self.endpoint, json!({ "player_id": key }));
        self.client
            .execute(&request)
            .await
            .map_err(HarvestError::from)
    }
}

/// Builds the detail record for `summary` from a profile response body.
///
/// Returns `None` if the body has no `profile_info` object. Levels of
/// categories outside the roster are ignored.
#[must_use]
pub fn detail_from_profile(
    roster: &Roster,
    summary: &EntitySummary,
    body: &Value,
    siblings: &SiblingIndex,
    include_last_login: bool,
) -> Option<DetailRecord> {
    let info = body.get("profile_info")?.as_object()?;
    let text = |field: &str| {
        info.get(field)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned()
    };

    let mut levels = roster.empty_levels();
    for item in info
        .get("fan_level_list")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        let Some(id) = item.get("character_id").and_then(as_u32) else {
            continue;
        };
        if !roster.contains(id) {
            continue;
        }
        let level = item
            .get("d_season_fan_level")
            .and_then(as_u32)
            .unwrap_or(0);
        levels.insert(id, level);
    }
    let (level_total, level_total_filtered) = roster.aggregate(&levels);

    Some(DetailRecord {
        key: summary.key.clone(),
        name: text("player_name"),
        guild_name: text("guild_name"),
        guild_key: text("search_guild_key"),
        dream_style_count: info.get("dream_style_num").and_then(as_u32).unwrap_or(0),
        last_login: include_last_login
            .then(|| text("last_login_date"))
            .filter(|s| !s.is_empty()),
        levels,
        level_total,
        level_total_filtered,
        rank: summary.rank,
        score: summary.score,
        sub_scores: siblings.sub_scores_for(&summary.key),
    })
}

/// Accepts numbers and numeric strings.
fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
#[path = "fanout_test.rs"]
mod tests;
