//! One collection run, from credential to export.
//!
//! ```text
//! Init -> Authenticating -> ProbingLiveness -> Harvesting -> FetchingDetails -> Done
//!                                                                       \-> Aborted
//! ```
//!
//! Any error returned from [`CollectionPipeline::run`] means the sink was not
//! called.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rankscrape_client::{RetryingTransport, Session, TokenProvider};
use rankscrape_core::{
    generate_rank_targets, AppConfig, CollectionPlan, DetailRecord, EntitySummary,
    LivenessPolicy, Roster, StreamId,
};

use crate::error::HarvestError;
use crate::fanout::{DetailFanout, SiblingIndex};
use crate::harvester::RankHarvester;
use crate::sink::{CollectionOutput, Sink};
use crate::stop::StopOffsets;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Authenticating,
    ProbingLiveness,
    Harvesting,
    FetchingDetails,
    Done,
    Aborted,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineState::Init => "init",
            PipelineState::Authenticating => "authenticating",
            PipelineState::ProbingLiveness => "probing liveness",
            PipelineState::Harvesting => "harvesting",
            PipelineState::FetchingDetails => "fetching details",
            PipelineState::Done => "done",
            PipelineState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Asks a human whether to go on after a recoverable problem.
///
/// The answer is awaited, so a run waiting on the operator can still be
/// cancelled.
#[async_trait]
pub trait Operator: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Never continues; used for scheduled runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unattended;

#[async_trait]
impl Operator for Unattended {
    async fn confirm(&self, prompt: &str) -> bool {
        tracing::warn!(prompt, "no operator available; declining");
        false
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Width of the request pool in each phase.
    pub concurrency: usize,
    pub target_offsets: Vec<u32>,
    /// When set, problems that would ask the operator abort instead.
    pub unattended: bool,
    pub phase_deadline: Option<Duration>,
    pub roster: Roster,
}

impl PipelineSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            target_offsets: generate_rank_targets(config.target_rank, config.page_size),
            unattended: config.unattended,
            phase_deadline: config.phase_deadline_secs.map(Duration::from_secs),
            roster: Roster::with_exclusions(config.excluded_categories.clone()),
        }
    }
}

/// What a finished run went through.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub states: Vec<PipelineState>,
    /// Entities on the primary stream.
    pub entities: usize,
    pub details: usize,
    pub stop_offsets: BTreeMap<StreamId, Option<u32>>,
    pub exported: bool,
}

impl PipelineReport {
    #[must_use]
    pub fn final_state(&self) -> Option<PipelineState> {
        self.states.last().copied()
    }

    fn enter(&mut self, plan: &CollectionPlan, next: PipelineState) {
        let from = self.final_state().map(|s| s.to_string());
        tracing::info!(
            plan = %plan.name,
            from = from.as_deref().unwrap_or("-"),
            to = %next,
            "pipeline state"
        );
        self.states.push(next);
    }
}

pub struct CollectionPipeline {
    client: Arc<RetryingTransport>,
    session: Session,
    tokens: Arc<dyn TokenProvider>,
    sink: Arc<dyn Sink>,
    operator: Arc<dyn Operator>,
    settings: PipelineSettings,
}

impl CollectionPipeline {
    #[must_use]
    pub fn new(
        client: Arc<RetryingTransport>,
        session: Session,
        tokens: Arc<dyn TokenProvider>,
        sink: Arc<dyn Sink>,
        operator: Arc<dyn Operator>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            client,
            session,
            tokens,
            sink,
            operator,
            settings,
        }
    }

    /// Runs `plan` to completion.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::EventInactive`] if the event is not running,
    /// [`HarvestError::Aborted`] when the run stops at a liveness or
    /// credential check, [`HarvestError::DeadlineExceeded`] when a phase runs
    /// past its deadline, and [`HarvestError::Sink`] if the export fails.
    pub async fn run(&self, plan: &CollectionPlan) -> Result<PipelineReport, HarvestError> {
        let mut report = PipelineReport::default();
        match self.drive(plan, &mut report).await {
            Ok(()) => Ok(report),
            Err(err) => {
                report.enter(plan, PipelineState::Aborted);
                tracing::error!(plan = %plan.name, error = %err, "collection aborted");
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        plan: &CollectionPlan,
        report: &mut PipelineReport,
    ) -> Result<(), HarvestError> {
        report.enter(plan, PipelineState::Init);
        let primary = plan
            .primary_stream()
            .ok_or_else(|| HarvestError::Aborted {
                stage: PipelineState::Init,
                reason: format!("plan has no stream named {}", plan.primary),
            })?;

        report.enter(plan, PipelineState::Authenticating);
        let session = self.authenticate().await?;
        let harvester = RankHarvester::new(
            Arc::clone(&self.client),
            session.clone(),
            self.settings.concurrency,
        );

        report.enter(plan, PipelineState::ProbingLiveness);
        // Separate stop offsets so the probe cannot bound the real harvest.
        let probe = harvester.probe(primary, 1, &StopOffsets::new()).await?;
        if !probe.has_entries() {
            self.on_dead_ranking(plan).await?;
        }

        report.enter(plan, PipelineState::Harvesting);
        let harvest = self
            .within_deadline(
                PipelineState::Harvesting,
                harvester.harvest(&self.settings.target_offsets, &plan.streams),
            )
            .await?;
        report.stop_offsets.clone_from(&harvest.stop_offsets);

        let primary_entities = harvest.entities(&plan.primary);
        report.entities = primary_entities.len();
        if primary_entities.is_empty() {
            if harvest.rankings.values().all(Vec::is_empty) {
                tracing::warn!(plan = %plan.name, "no entities harvested; nothing to export");
            } else {
                tracing::warn!(
                    plan = %plan.name,
                    "primary ranking is empty; exporting rankings without details"
                );
                self.sink
                    .accept(&collection_output(plan, harvest.rankings, Vec::new()))
                    .await?;
                report.exported = true;
            }
            report.enter(plan, PipelineState::Done);
            return Ok(());
        }

        report.enter(plan, PipelineState::FetchingDetails);
        let siblings = SiblingIndex::from_rankings(&plan.streams, &harvest.rankings);
        let fanout = DetailFanout::new(
            Arc::clone(&self.client),
            session,
            self.settings.roster.clone(),
            self.settings.concurrency,
        )
        .with_endpoint(plan.detail_endpoint.clone())
        .with_last_login(plan.include_last_login);
        let details = self
            .within_deadline(
                PipelineState::FetchingDetails,
                fanout.fetch_details(primary_entities, &siblings),
            )
            .await?;
        report.details = details.len();

        self.sink
            .accept(&collection_output(plan, harvest.rankings, details))
            .await?;
        report.exported = true;

        report.enter(plan, PipelineState::Done);
        Ok(())
    }

    /// Obtains a credential and derives the session the run will use.
    async fn authenticate(&self) -> Result<Session, HarvestError> {
        match self.tokens.credential().await {
            Ok(credential) => Ok(self.session.with_credential(&credential)),
            Err(err) if err.is_event_inactive() => Err(err.into()),
            Err(err) => {
                tracing::warn!(error = %err, "could not obtain a credential");
                if self.settings.unattended
                    || !self
                        .operator
                        .confirm("authentication failed; continue with the configured session?")
                        .await
                {
                    return Err(HarvestError::Aborted {
                        stage: PipelineState::Authenticating,
                        reason: err.to_string(),
                    });
                }
                Ok(self.session.clone())
            }
        }
    }

    async fn on_dead_ranking(&self, plan: &CollectionPlan) -> Result<(), HarvestError> {
        let abort = |reason: &str| HarvestError::Aborted {
            stage: PipelineState::ProbingLiveness,
            reason: reason.to_owned(),
        };
        match plan.liveness {
            LivenessPolicy::HardAbort => Err(abort("no ranking data; the event is not running")),
            LivenessPolicy::Confirm => {
                tracing::warn!(plan = %plan.name, "liveness probe returned no data");
                if self.settings.unattended
                    || !self
                        .operator
                        .confirm("the first ranking page is empty; continue anyway?")
                        .await
                {
                    return Err(abort("first ranking page is empty"));
                }
                Ok(())
            }
        }
    }

    async fn within_deadline<T>(
        &self,
        stage: PipelineState,
        phase: impl Future<Output = Result<T, HarvestError>>,
    ) -> Result<T, HarvestError> {
        match self.settings.phase_deadline {
            None => phase.await,
            Some(deadline) => tokio::time::timeout(deadline, phase)
                .await
                .map_err(|_| HarvestError::DeadlineExceeded {
                    stage,
                    secs: deadline.as_secs(),
                })?,
        }
    }
}

fn collection_output(
    plan: &CollectionPlan,
    rankings: BTreeMap<StreamId, Vec<EntitySummary>>,
    details: Vec<DetailRecord>,
) -> CollectionOutput {
    CollectionOutput {
        plan: plan.name.clone(),
        file_tag: plan.file_tag.clone(),
        previous_day: plan.previous_day,
        rankings,
        details,
    }
}
