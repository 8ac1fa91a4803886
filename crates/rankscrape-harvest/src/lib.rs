pub mod error;
pub mod fanout;
pub mod harvester;
pub mod pipeline;
pub mod sink;
pub mod stop;

pub use error::HarvestError;
pub use fanout::{detail_from_profile, DetailFanout, SiblingIndex};
pub use harvester::{Harvest, ProbeOutcome, RankHarvester};
pub use pipeline::{
    CollectionPipeline, Operator, PipelineReport, PipelineSettings, PipelineState, Unattended,
};
pub use sink::{CollectionOutput, Sink, SinkError};
pub use stop::StopOffsets;
