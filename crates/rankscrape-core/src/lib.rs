pub mod app_config;
pub mod config;
pub mod event;
pub mod roster;
pub mod streams;
pub mod types;

pub use app_config::{AppConfig, BattleType};
pub use config::{load_app_config, load_app_config_from_env};
pub use event::{day_prefix, generate_rank_targets, grade_id_for, grand_prix_event_id};
pub use roster::{Roster, DEFAULT_EXCLUDED_CATEGORIES};
pub use streams::{grade_plan, grand_prix_plan, CollectionPlan, DayKind, LivenessPolicy, StreamDef};
pub use types::{DetailRecord, EntitySummary, StreamId, SubScore};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("config validation failed: {0}")]
    Validation(String),
}
