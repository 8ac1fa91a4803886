use rankscrape_client::ClientError;
use thiserror::Error;

use crate::pipeline::PipelineState;
use crate::sink::SinkError;

/// Errors that end a collection run.
///
/// Transient request failures never show up here: they are absorbed by the
/// harvester and the detail fan-out as missing pages or dropped entities.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// The event is not running. Nothing collected so far may be exported.
    #[error("event is not active: {message}")]
    EventInactive { message: String },

    #[error("collection aborted while {stage}: {reason}")]
    Aborted {
        stage: PipelineState,
        reason: String,
    },

    #[error("{stage} did not finish within {secs}s")]
    DeadlineExceeded { stage: PipelineState, secs: u64 },

    #[error("client error: {0}")]
    Client(ClientError),

    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
}

impl HarvestError {
    #[must_use]
    pub fn is_event_inactive(&self) -> bool {
        matches!(self, HarvestError::EventInactive { .. })
    }
}

impl From<ClientError> for HarvestError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::EventInactive { message } => HarvestError::EventInactive { message },
            other => HarvestError::Client(other),
        }
    }
}
