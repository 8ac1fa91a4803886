//! Wires configuration, transport, credentials and sink into a pipeline run.

use std::process::ExitCode;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use rankscrape_client::{
    HttpTransport, LoginTokenProvider, RetryingTransport, Session, StaticTokenProvider,
    TokenProvider,
};
use rankscrape_core::{
    day_prefix, grade_id_for, grade_plan, grand_prix_event_id, grand_prix_plan, AppConfig,
    CollectionPlan, DayKind,
};
use rankscrape_harvest::{
    CollectionPipeline, HarvestError, Operator, PipelineReport, PipelineSettings, Unattended,
};

use crate::operator::StdinOperator;
use crate::sink::JsonFileSink;

/// Exit code for a run stopped because the event is not running.
const EXIT_EVENT_INACTIVE: u8 = 2;
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Collection {
    Ranking { previous_day: bool },
    Grade,
}

/// Per-invocation switches from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RunOptions {
    /// Only the first page of each ladder.
    pub(crate) test_mode: bool,
    pub(crate) last_login: bool,
    pub(crate) unattended: bool,
}

/// The day whose ranking a run collects.
fn ranking_date(today: NaiveDate, previous_day: bool) -> NaiveDate {
    if previous_day {
        today.pred_opt().unwrap_or(today)
    } else {
        today
    }
}

pub(crate) fn build_plan(
    config: &AppConfig,
    collection: Collection,
    today: NaiveDate,
) -> CollectionPlan {
    match collection {
        Collection::Ranking { previous_day } => {
            let date = ranking_date(today, previous_day);
            let event_id = grand_prix_event_id(config.battle_type, date.year(), date.month());
            let day = if previous_day {
                DayKind::Previous
            } else {
                DayKind::Current
            };
            grand_prix_plan(event_id, day, config.page_size)
        }
        Collection::Grade => {
            grade_plan(grade_id_for(today.year(), today.month()), config.page_size)
        }
    }
}

pub(crate) fn print_plan(config: &AppConfig, previous_day: bool, today: NaiveDate) {
    let ranking = build_plan(config, Collection::Ranking { previous_day }, today);
    let grade = build_plan(config, Collection::Grade, today);
    println!("battle type:  {}", config.battle_type);
    println!("ranking:      {} ({} streams)", ranking.name, ranking.streams.len());
    println!("grade:        {}", grade.name);
    println!(
        "file prefix:  {:?}",
        day_prefix(config.event_start, today, previous_day)
    );
    println!("output dir:   {}", config.output_dir.display());
}

/// Runs one collection and maps its outcome to a process exit code.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built or the run fails
/// for a reason other than an abort the pipeline reports itself.
pub(crate) async fn run(
    config: &AppConfig,
    collection: Collection,
    options: RunOptions,
    today: NaiveDate,
) -> anyhow::Result<ExitCode> {
    let mut plan = build_plan(config, collection, today);
    plan.include_last_login = options.last_login;

    let transport = HttpTransport::new(config.request_timeout_secs)
        .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;
    let client = Arc::new(RetryingTransport::new(
        Arc::new(transport),
        config.max_attempts,
        config.backoff_base_ms,
    ));
    let session = Session::from_config(config);

    let tokens: Arc<dyn TokenProvider> = match &config.player_id {
        Some(player_id) => Arc::new(LoginTokenProvider::new(
            Arc::clone(&client),
            session.clone(),
            player_id.clone(),
            config.device_id.clone(),
        )),
        None => Arc::new(StaticTokenProvider::new(config.auth_token.clone())),
    };

    let unattended = options.unattended || config.unattended;
    let operator: Arc<dyn Operator> = if unattended {
        Arc::new(Unattended)
    } else {
        Arc::new(StdinOperator)
    };

    let prefix = day_prefix(config.event_start, today, plan.previous_day);
    let sink = Arc::new(JsonFileSink::new(config.output_dir.clone(), prefix));

    let mut settings = PipelineSettings::from_config(config);
    settings.unattended = unattended;
    if options.test_mode {
        settings.target_offsets = vec![1];
    }

    tracing::info!(
        plan = %plan.name,
        streams = plan.streams.len(),
        offsets = settings.target_offsets.len(),
        unattended,
        last_login = plan.include_last_login,
        "starting collection"
    );

    let pipeline = CollectionPipeline::new(client, session, tokens, sink, operator, settings);
    tokio::select! {
        result = pipeline.run(&plan) => exit_code(&plan, result),
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!(plan = %plan.name, "interrupted; nothing exported");
            Ok(ExitCode::from(EXIT_INTERRUPTED))
        }
    }
}

fn exit_code(
    plan: &CollectionPlan,
    result: Result<PipelineReport, HarvestError>,
) -> anyhow::Result<ExitCode> {
    match result {
        Ok(report) => {
            tracing::info!(
                plan = %plan.name,
                entities = report.entities,
                details = report.details,
                exported = report.exported,
                "collection finished"
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(err) if err.is_event_inactive() => {
            tracing::error!(
                plan = %plan.name,
                error = %err,
                "event is not running; shutting down"
            );
            Ok(ExitCode::from(EXIT_EVENT_INACTIVE))
        }
        Err(err @ (HarvestError::Aborted { .. } | HarvestError::DeadlineExceeded { .. })) => {
            tracing::error!(plan = %plan.name, error = %err, "collection stopped");
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(err.into()),
    }
}
