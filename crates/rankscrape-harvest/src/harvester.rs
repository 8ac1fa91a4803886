//! Concurrent paginated ranking harvest with early stop.
//!
//! Every `(stream, offset)` pair is one unit of work. Units run through a
//! single bounded pool. The first empty page of a stream fixes its tail, and
//! units beyond that tail are skipped without touching the network. Results
//! are merged by the consuming loop only, so the accumulator is never
//! shared between tasks.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use rankscrape_client::{RetryingTransport, Session};
use rankscrape_core::{EntitySummary, StreamDef, StreamId};
use serde_json::Value;

use crate::error::HarvestError;
use crate::stop::StopOffsets;

/// What a single probe produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The offset lies beyond the stream's known tail; nothing more was sent.
    Skipped,
    /// The request was abandoned after retries.
    Failed,
    /// The page entries; empty past the end of the list.
    Page(Vec<EntitySummary>),
}

impl ProbeOutcome {
    #[must_use]
    pub fn has_entries(&self) -> bool {
        matches!(self, ProbeOutcome::Page(entries) if !entries.is_empty())
    }
}

/// Result of a full harvest.
#[derive(Debug, Clone, Default)]
pub struct Harvest {
    /// One list per stream, ordered by rank ascending with unique keys.
    pub rankings: BTreeMap<StreamId, Vec<EntitySummary>>,
    pub stop_offsets: BTreeMap<StreamId, Option<u32>>,
    /// Units abandoned after retries.
    pub failed_units: usize,
    /// Units skipped because they lay beyond a known tail.
    pub skipped_units: usize,
}

impl Harvest {
    #[must_use]
    pub fn entities(&self, stream: &StreamId) -> &[EntitySummary] {
        self.rankings.get(stream).map_or(&[], Vec::as_slice)
    }
}

pub struct RankHarvester {
    client: Arc<RetryingTransport>,
    session: Session,
    concurrency: usize,
}

impl RankHarvester {
    #[must_use]
    pub fn new(client: Arc<RetryingTransport>, session: Session, concurrency: usize) -> Self {
        Self {
            client,
            session,
            concurrency: concurrency.max(1),
        }
    }

    /// Fetches one page of `stream` at `offset`, unless `stops` already
    /// places the tail of the stream below it.
    ///
    /// The tail is checked again before every retry, so a unit that another
    /// probe has ruled out stops sending. An empty page lowers the stream's
    /// stop offset in `stops`. A failed request leaves it untouched.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::EventInactive`] when the API reports the event
    /// is not running.
    pub async fn probe(
        &self,
        stream: &StreamDef,
        offset: u32,
        stops: &StopOffsets,
    ) -> Result<ProbeOutcome, HarvestError> {
        let request = self
            .session
            .request(&stream.endpoint, stream.page_payload(offset));
        let body = self
            .client
            .execute_while(&request, || !stops.exceeds(&stream.id, offset))
            .await?;

        let outcome = match body {
            None if stops.exceeds(&stream.id, offset) => {
                tracing::debug!(stream = %stream.id, offset, "skipping offset beyond known tail");
                return Ok(ProbeOutcome::Skipped);
            }
            None => ProbeOutcome::Failed,
            Some(body) => {
                let entries = parse_page(stream, &body);
                if entries.is_empty() && stops.record_empty(&stream.id, offset) {
                    tracing::info!(
                        stream = %stream.id,
                        stop_offset = offset,
                        "reached end of ranking"
                    );
                }
                ProbeOutcome::Page(entries)
            }
        };
        stops.record_completed(&stream.id);
        Ok(outcome)
    }

    /// Harvests every stream at every offset in `target_offsets`.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::EventInactive`] as soon as any probe hits it.
    /// Units not yet started are dropped without being sent.
    pub async fn harvest(
        &self,
        target_offsets: &[u32],
        streams: &[StreamDef],
    ) -> Result<Harvest, HarvestError> {
        let mut offsets = target_offsets.to_vec();
        offsets.sort_unstable();
        offsets.dedup();

        let stops = StopOffsets::new();
        let per_stream = offsets.len();
        let units = streams
            .iter()
            .flat_map(|s| offsets.iter().map(move |offset| (s, *offset)));

        tracing::info!(
            streams = streams.len(),
            offsets = per_stream,
            concurrency = self.concurrency,
            "starting ranking harvest"
        );

        let mut pending = stream::iter(units)
            .map(|(s, offset)| {
                let stops = &stops;
                async move { (s, offset, self.probe(s, offset, stops).await) }
            })
            .buffer_unordered(self.concurrency);

        // Pages in arrival order; filtered against the final tail below.
        let mut pages: BTreeMap<StreamId, Vec<(u32, Vec<EntitySummary>)>> = BTreeMap::new();
        let mut harvest = Harvest::default();

        while let Some((s, offset, outcome)) = pending.next().await {
            match outcome? {
                ProbeOutcome::Skipped => harvest.skipped_units += 1,
                ProbeOutcome::Failed => {
                    harvest.failed_units += 1;
                    tracing::warn!(stream = %s.id, offset, "page abandoned");
                }
                ProbeOutcome::Page(entries) => {
                    tracing::info!(
                        stream = %s.id,
                        offset,
                        entries = entries.len(),
                        completed = stops.completed(&s.id),
                        total = per_stream,
                        "page fetched"
                    );
                    if !entries.is_empty() {
                        pages.entry(s.id.clone()).or_default().push((offset, entries));
                    }
                }
            }
        }

        for s in streams {
            let stop = stops.get(&s.id);
            let list = merge_pages(&s.id, pages.remove(&s.id).unwrap_or_default(), stop);
            tracing::info!(
                stream = %s.id,
                entities = list.len(),
                stop_offset = ?stop,
                "stream harvested"
            );
            harvest.rankings.insert(s.id.clone(), list);
            harvest.stop_offsets.insert(s.id.clone(), stop);
        }

        Ok(harvest)
    }
}

/// Drops pages beyond `stop`, keeps the first occurrence of every key, and
/// sorts by rank.
fn merge_pages(
    stream: &StreamId,
    pages: Vec<(u32, Vec<EntitySummary>)>,
    stop: Option<u32>,
) -> Vec<EntitySummary> {
    let mut seen = HashSet::new();
    let mut list = Vec::new();
    for (offset, entries) in pages {
        if stop.is_some_and(|stop| offset > stop) {
            tracing::debug!(%stream, offset, "discarding page beyond tail");
            continue;
        }
        for entry in entries {
            if seen.insert(entry.key.clone()) {
                list.push(entry);
            }
        }
    }
    list.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.key.cmp(&b.key)));
    list
}

/// Extracts the entries of one ranking page. A body without the list field
/// reads as an empty page.
fn parse_page(stream: &StreamDef, body: &Value) -> Vec<EntitySummary> {
    let Some(items) = body.get(&stream.list_field).and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let entry = parse_entry(stream, item);
            if entry.is_none() {
                tracing::debug!(stream = %stream.id, "skipping ranking entry without key or rank");
            }
            entry
        })
        .collect()
}

fn parse_entry(stream: &StreamDef, item: &Value) -> Option<EntitySummary> {
    let key = match item.get(&stream.key_field)? {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let rank = item
        .get("rank")
        .and_then(Value::as_u64)
        .and_then(|r| u32::try_from(r).ok())?;
    let score = item.get("point").and_then(Value::as_i64).unwrap_or(0);

    Some(EntitySummary {
        key,
        rank,
        score,
        category: stream.category.clone(),
    })
}
