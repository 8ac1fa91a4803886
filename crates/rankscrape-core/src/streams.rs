//! Ranking stream definitions and the collection plans built from them.
//!
//! A [`StreamDef`] describes one paginated ranking list: where to POST, the
//! payload template, and which fields of the response hold the page entries.
//! Grand-prix and season-grade collections differ only in their stream
//! definitions; the harvesting machinery is shared.

use serde_json::{Map, Value};

use crate::types::StreamId;

const GRAND_PRIX_ENDPOINT: &str = "out_quest_live/grand_prix/get_ranking_list";
const GRADE_ENDPOINT: &str = "out_quest_live/grade/get_ranking_list";
const PROFILE_ENDPOINT: &str = "profile/get_info";

const OFFSET_FIELD: &str = "target_rank";
const LIST_FIELD: &str = "point_rankings";

/// Grand-prix category sub-ladders: `(tag, ranking_type)`.
const CATEGORY_LADDERS: [(&str, u32); 3] = [("A", 10), ("B", 11), ("C", 12)];

#[derive(Debug, Clone)]
pub struct StreamDef {
    pub id: StreamId,
    pub label: String,
    /// Endpoint path relative to the API base URL.
    pub endpoint: String,
    pub payload: Map<String, Value>,
    pub offset_field: String,
    pub list_field: String,
    pub key_field: String,
    pub page_size: u32,
    pub category: Option<String>,
}

impl StreamDef {
    /// The request payload for the page starting at `offset`.
    #[must_use]
    pub fn page_payload(&self, offset: u32) -> Value {
        let mut payload = self.payload.clone();
        payload.insert(self.offset_field.clone(), Value::from(offset));
        Value::Object(payload)
    }
}

/// Which grand-prix day ranking to collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayKind {
    Current,
    Previous,
}

impl DayKind {
    #[must_use]
    pub fn ranking_type(self) -> u32 {
        match self {
            DayKind::Current => 21,
            DayKind::Previous => 20,
        }
    }

    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            DayKind::Current => "current-day",
            DayKind::Previous => "previous-day",
        }
    }
}

/// What to do when the liveness probe comes back empty or fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessPolicy {
    /// Ask the operator whether to continue.
    Confirm,
    /// No data means the event is not running; stop.
    HardAbort,
}

/// Everything the pipeline needs to know about one kind of collection.
#[derive(Debug, Clone)]
pub struct CollectionPlan {
    pub name: String,
    pub streams: Vec<StreamDef>,
    /// Stream whose entities are expanded with detail records.
    pub primary: StreamId,
    pub liveness: LivenessPolicy,
    pub detail_endpoint: String,
    pub include_last_login: bool,
    /// Tag appended to export file names.
    pub file_tag: String,
    pub previous_day: bool,
}

impl CollectionPlan {
    #[must_use]
    pub fn primary_stream(&self) -> Option<&StreamDef> {
        self.streams.iter().find(|s| s.id == self.primary)
    }
}

fn object(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

/// Plan for the grand-prix ranking of `event_id`.
///
/// Current-day runs also harvest the A/B/C category sub-ladders; the
/// previous-day ranking only exposes the day total.
#[must_use]
pub fn grand_prix_plan(event_id: u32, day: DayKind, page_size: u32) -> CollectionPlan {
    let stream = |id: &str, label: String, ranking_type: u32, category: Option<&str>| StreamDef {
        id: StreamId::new(id),
        label,
        endpoint: GRAND_PRIX_ENDPOINT.to_string(),
        payload: object(&[
            ("grand_prix_id", Value::from(event_id)),
            ("ranking_type", Value::from(ranking_type)),
            ("get_rank_type", Value::from(2)),
        ]),
        offset_field: OFFSET_FIELD.to_string(),
        list_field: LIST_FIELD.to_string(),
        key_field: "id".to_string(),
        page_size,
        category: category.map(str::to_string),
    };

    let primary = StreamId::new("day-total");
    let mut streams = vec![stream(
        primary.as_str(),
        format!("{} total", day.tag()),
        day.ranking_type(),
        None,
    )];
    if day == DayKind::Current {
        for (tag, ranking_type) in CATEGORY_LADDERS {
            streams.push(stream(
                &format!("category-{}", tag.to_ascii_lowercase()),
                format!("category {tag}"),
                ranking_type,
                Some(tag),
            ));
        }
    }

    CollectionPlan {
        name: format!("grand-prix {event_id}"),
        streams,
        primary,
        liveness: LivenessPolicy::Confirm,
        detail_endpoint: PROFILE_ENDPOINT.to_string(),
        include_last_login: false,
        file_tag: day.tag().to_string(),
        previous_day: day == DayKind::Previous,
    }
}

/// Plan for the season-grade ladder `grade_id`.
#[must_use]
pub fn grade_plan(grade_id: u32, page_size: u32) -> CollectionPlan {
    let primary = StreamId::new("grade");
    CollectionPlan {
        name: format!("season grade {grade_id}"),
        streams: vec![StreamDef {
            id: primary.clone(),
            label: "season grade".to_string(),
            endpoint: GRADE_ENDPOINT.to_string(),
            payload: object(&[
                ("season_grade_id", Value::from(grade_id)),
                ("get_rank_type", Value::from(0)),
            ]),
            offset_field: OFFSET_FIELD.to_string(),
            list_field: LIST_FIELD.to_string(),
            key_field: "player_id".to_string(),
            page_size,
            category: None,
        }],
        primary,
        liveness: LivenessPolicy::HardAbort,
        detail_endpoint: PROFILE_ENDPOINT.to_string(),
        include_last_login: false,
        file_tag: "grade".to_string(),
        previous_day: false,
    }
}
