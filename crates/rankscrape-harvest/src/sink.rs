//! Where a finished collection goes.

use std::collections::BTreeMap;

use async_trait::async_trait;
use rankscrape_core::{DetailRecord, EntitySummary, StreamId};
use serde::Serialize;
use thiserror::Error;

/// Everything one successful run produced.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionOutput {
    pub plan: String,
    /// Tag the exporter appends to file names.
    pub file_tag: String,
    pub previous_day: bool,
    /// Each list is ordered by rank ascending.
    pub rankings: BTreeMap<StreamId, Vec<EntitySummary>>,
    /// Ordered by rank ascending.
    pub details: Vec<DetailRecord>,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[async_trait]
pub trait Sink: Send + Sync {
    /// Persists `output`. Called at most once per run, and only when the run
    /// reached the end without a fatal error.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the output cannot be written.
    async fn accept(&self, output: &CollectionOutput) -> Result<(), SinkError>;
}
