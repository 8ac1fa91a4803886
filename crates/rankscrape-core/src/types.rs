use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identifier of one independently paginated ranking list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One ranked entity as seen on a ranking page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub key: String,
    pub rank: u32,
    pub score: i64,
    /// Category tag of the sub-ladder this entry came from, if any.
    pub category: Option<String>,
}

/// Rank and score of an entity on a category sub-ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubScore {
    pub rank: u32,
    pub score: i64,
}

/// Per-entity profile detail merged with its phase-1 ranking data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub key: String,
    pub name: String,
    pub guild_name: String,
    pub guild_key: String,
    pub dream_style_count: u32,
    pub last_login: Option<String>,
    /// Level per roster category id; categories absent from the profile are 0.
    pub levels: BTreeMap<u32, u32>,
    pub level_total: u32,
    /// Level total without the configured excluded categories.
    pub level_total_filtered: u32,
    pub rank: u32,
    pub score: i64,
    /// One entry per category stream of the run. `None` means the entity has
    /// no entry on that sub-ladder, which is not the same as scoring zero.
    pub sub_scores: BTreeMap<String, Option<SubScore>>,
}
