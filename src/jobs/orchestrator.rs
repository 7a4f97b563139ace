//! The job orchestrator: launch, poll, commit, cancel.
//!
//! One orchestrator instance tracks every in-flight generation job across
//! workflows. Jobs are keyed by `(workflow_id, artifact)`; at most one job
//! may be active per key. Each key also carries a monotonically increasing
//! generation counter: launching bumps it, cancelling bumps it again, and a
//! job may only commit its result while the counter still matches the value
//! it was launched with. A poll reply that arrives after cancellation or
//! supersession is therefore discarded instead of overwriting newer state.
//!
//! Polling is cooperative: the cancel flag is checked before every poll,
//! and every loop has a hard attempt ceiling. Exceeding the ceiling
//! resolves the handle with [`JobError::Timeout`] but deliberately leaves
//! the artifact `processing` — the upstream job may still complete, and the
//! user retries explicitly.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tracing::{instrument, warn};

use super::Generation;
use super::service::GenerationService;
use super::types::{PollReply, StageSpec, StartStatus};
use crate::artifact::{ArtifactRecord, ArtifactState, reattach_custom_items};
use crate::config::OrchestratorConfig;
use crate::event_bus::{Event, JobPhase};
use crate::store::{ArtifactRepository, StoreError};
use crate::types::ArtifactKind;
use crate::workflow::WorkflowId;

type JobKey = (WorkflowId, ArtifactKind);

// ============================================================================
// Errors
// ============================================================================

/// Local precondition failures surfaced synchronously by `launch`.
///
/// None of these ever reach the polling loop.
#[derive(Debug, Error, Diagnostic)]
pub enum LaunchError {
    /// Another job is already active for the same `(workflow, artifact)`.
    #[error("a job is already active for {workflow_id}/{artifact}")]
    #[diagnostic(
        code(draftloom::jobs::conflicting_job),
        help("Await or cancel the active job, or use supersede() to replace it.")
    )]
    ConflictingJob {
        workflow_id: String,
        artifact: ArtifactKind,
    },

    /// A required upstream artifact is not `completed`.
    #[error("required upstream artifacts for {artifact} are not completed: {missing:?}")]
    #[diagnostic(
        code(draftloom::jobs::validation),
        help("Generate the missing upstream artifacts before launching this one.")
    )]
    ValidationFailed {
        artifact: ArtifactKind,
        missing: Vec<ArtifactKind>,
    },

    /// A staged launch was given no stages.
    #[error("stage plan for {artifact} is empty")]
    #[diagnostic(code(draftloom::jobs::empty_stage_plan))]
    EmptyStagePlan { artifact: ArtifactKind },

    /// The workflow record could not be read before launch.
    #[error(transparent)]
    #[diagnostic(code(draftloom::jobs::store))]
    Store(#[from] StoreError),
}

/// Terminal job outcomes surfaced through the resolved [`JobHandle`].
#[derive(Debug, Error, Diagnostic)]
pub enum JobError {
    /// The poll attempt ceiling was exceeded without a terminal reply.
    /// The artifact remains `processing`; retry without re-validating.
    #[error("generation timed out after {attempts} poll attempts")]
    #[diagnostic(
        code(draftloom::jobs::timeout),
        help("The upstream job may still complete; the artifact stays processing for a manual retry.")
    )]
    Timeout { attempts: u32 },

    /// The service reported the job as failed.
    #[error("generation failed upstream: {detail}")]
    #[diagnostic(code(draftloom::jobs::upstream_failed))]
    UpstreamGenerationFailed { detail: String },

    /// The job was cancelled or superseded; any late result was discarded.
    #[error("job was cancelled or superseded")]
    #[diagnostic(code(draftloom::jobs::cancelled))]
    Cancelled,
}

// ============================================================================
// Handle
// ============================================================================

/// Awaitable handle for one launched job.
///
/// The handle resolves exactly once: with the committed payload, or with the
/// terminal [`JobError`]. Dropping the handle does not cancel the job; use
/// [`JobOrchestrator::cancel`] for that.
#[derive(Debug)]
pub struct JobHandle {
    workflow_id: WorkflowId,
    artifact: ArtifactKind,
    generation: Generation,
    outcome: oneshot::Receiver<Result<Value, JobError>>,
}

impl JobHandle {
    #[must_use]
    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    #[must_use]
    pub fn artifact(&self) -> &ArtifactKind {
        &self.artifact
    }

    /// The generation this job was launched under.
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Await the terminal outcome.
    pub async fn outcome(self) -> Result<Value, JobError> {
        self.outcome
            .await
            .unwrap_or_else(|_| Err(JobError::Cancelled))
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Ephemeral tracking record for one in-flight job.
struct ActiveJob {
    generation: Generation,
    cancel: watch::Sender<bool>,
    started_at: DateTime<Utc>,
}

#[derive(Default)]
struct OrchestratorInner {
    active: FxHashMap<JobKey, ActiveJob>,
    generations: FxHashMap<JobKey, Generation>,
}

/// One stage of a job sequence; `launch` uses a single unlabeled stage.
struct SequenceStage {
    label: Option<String>,
    commit_to: Option<ArtifactKind>,
    request: Value,
}

/// Launches generation jobs and drives them to a terminal state.
///
/// Cloning is cheap; clones share the same active-job table, generation
/// counters, repository, and event sender.
#[derive(Clone)]
pub struct JobOrchestrator {
    service: Arc<dyn GenerationService>,
    repository: Arc<ArtifactRepository>,
    config: OrchestratorConfig,
    events: flume::Sender<Event>,
    inner: Arc<Mutex<OrchestratorInner>>,
}

impl JobOrchestrator {
    /// Create an orchestrator without an event bus attached.
    #[must_use]
    pub fn new(
        service: Arc<dyn GenerationService>,
        repository: Arc<ArtifactRepository>,
        config: OrchestratorConfig,
    ) -> Self {
        // Detached channel: events are dropped until a sender is attached.
        let (events, _) = flume::unbounded();
        Self {
            service,
            repository,
            config,
            events,
            inner: Arc::new(Mutex::new(OrchestratorInner::default())),
        }
    }

    /// Route progress events to an event bus sender.
    #[must_use]
    pub fn with_event_sender(mut self, events: flume::Sender<Event>) -> Self {
        self.events = events;
        self
    }

    #[must_use]
    pub fn repository(&self) -> &Arc<ArtifactRepository> {
        &self.repository
    }

    /// Launch a single-stage generation job.
    ///
    /// Fails synchronously with [`LaunchError::ConflictingJob`] if a job is
    /// already active for the pair. Upstream-completeness validation is the
    /// caller's responsibility (the wizard checks it against the dependency
    /// graph before calling in).
    #[instrument(skip(self, request), fields(artifact = %artifact), err)]
    pub async fn launch(
        &self,
        workflow_id: &str,
        artifact: &ArtifactKind,
        request: Value,
    ) -> Result<JobHandle, LaunchError> {
        self.launch_sequence(
            workflow_id,
            artifact,
            vec![SequenceStage {
                label: None,
                commit_to: None,
                request,
            }],
        )
        .await
    }

    /// Launch a strict sequence of sub-jobs producing one composite artifact.
    ///
    /// Stages run in order; the active stage is surfaced through the
    /// artifact's `processing` state and a `StageStarted` event. A failing
    /// stage aborts the remainder without committing the composite; stages
    /// that name `commit_to` targets commit those independently as they
    /// succeed. The final stage's payload becomes the composite artifact.
    #[instrument(skip(self, stages), fields(artifact = %composite, stages = stages.len()), err)]
    pub async fn launch_staged(
        &self,
        workflow_id: &str,
        composite: &ArtifactKind,
        stages: Vec<StageSpec>,
    ) -> Result<JobHandle, LaunchError> {
        if stages.is_empty() {
            return Err(LaunchError::EmptyStagePlan {
                artifact: composite.clone(),
            });
        }
        self.launch_sequence(
            workflow_id,
            composite,
            stages
                .into_iter()
                .map(|stage| SequenceStage {
                    label: Some(stage.label),
                    commit_to: stage.commit_to,
                    request: stage.request,
                })
                .collect(),
        )
        .await
    }

    /// Replace any active job for the pair: cancel it, then launch fresh.
    pub async fn supersede(
        &self,
        workflow_id: &str,
        artifact: &ArtifactKind,
        request: Value,
    ) -> Result<JobHandle, LaunchError> {
        self.cancel(workflow_id, artifact);
        self.launch(workflow_id, artifact, request).await
    }

    /// Cancel the active job for the pair, if any.
    ///
    /// Bumps the generation counter unconditionally, so even a commit that
    /// already passed its cancel check is rejected at the guard. Returns
    /// whether a job was actually active.
    pub fn cancel(&self, workflow_id: &str, artifact: &ArtifactKind) -> bool {
        let key: JobKey = (workflow_id.to_string(), artifact.clone());
        let removed = {
            let mut inner = self.inner.lock();
            *inner.generations.entry(key.clone()).or_insert(0) += 1;
            inner.active.remove(&key)
        };
        match removed {
            Some(job) => {
                let _ = job.cancel.send(true);
                self.emit(Event::job(
                    workflow_id,
                    artifact.encode(),
                    job.generation,
                    JobPhase::Cancelled,
                    "cancelled by caller",
                ));
                true
            }
            None => false,
        }
    }

    /// Whether a job is currently active for the pair.
    #[must_use]
    pub fn has_active_job(&self, workflow_id: &str, artifact: &ArtifactKind) -> bool {
        self.inner
            .lock()
            .active
            .contains_key(&(workflow_id.to_string(), artifact.clone()))
    }

    /// When the active job for the pair was launched, if one is running.
    #[must_use]
    pub fn active_since(
        &self,
        workflow_id: &str,
        artifact: &ArtifactKind,
    ) -> Option<DateTime<Utc>> {
        self.inner
            .lock()
            .active
            .get(&(workflow_id.to_string(), artifact.clone()))
            .map(|job| job.started_at)
    }

    /// The current generation counter for the pair.
    #[must_use]
    pub fn current_generation(&self, workflow_id: &str, artifact: &ArtifactKind) -> Generation {
        self.inner
            .lock()
            .generations
            .get(&(workflow_id.to_string(), artifact.clone()))
            .copied()
            .unwrap_or(0)
    }

    // ------------------------------------------------------------------
    // internals
    // ------------------------------------------------------------------

    async fn launch_sequence(
        &self,
        workflow_id: &str,
        artifact: &ArtifactKind,
        stages: Vec<SequenceStage>,
    ) -> Result<JobHandle, LaunchError> {
        let key: JobKey = (workflow_id.to_string(), artifact.clone());
        let (generation, cancel_rx) = self.begin(&key)?;

        self.set_artifact_state(&key.0, &key.1, ArtifactState::Pending)
            .await;
        self.emit(Event::job(
            &key.0,
            key.1.encode(),
            generation,
            JobPhase::Launched,
            format!("{} stage(s)", stages.len()),
        ));

        let (done_tx, done_rx) = oneshot::channel();
        let worker = self.clone();
        let worker_key = key.clone();
        tokio::spawn(async move {
            worker
                .run_sequence(worker_key, generation, cancel_rx, stages, done_tx)
                .await;
        });

        Ok(JobHandle {
            workflow_id: key.0,
            artifact: key.1,
            generation,
            outcome: done_rx,
        })
    }

    /// Conflict-check, bump the generation, and register the active job.
    fn begin(&self, key: &JobKey) -> Result<(Generation, watch::Receiver<bool>), LaunchError> {
        let mut inner = self.inner.lock();
        if inner.active.contains_key(key) {
            return Err(LaunchError::ConflictingJob {
                workflow_id: key.0.clone(),
                artifact: key.1.clone(),
            });
        }
        let generation = {
            let counter = inner.generations.entry(key.clone()).or_insert(0);
            *counter += 1;
            *counter
        };
        let (cancel_tx, cancel_rx) = watch::channel(false);
        inner.active.insert(
            key.clone(),
            ActiveJob {
                generation,
                cancel: cancel_tx,
                started_at: Utc::now(),
            },
        );
        Ok((generation, cancel_rx))
    }

    fn is_current(&self, key: &JobKey, generation: Generation) -> bool {
        self.inner.lock().generations.get(key).copied() == Some(generation)
    }

    /// Remove the active entry if it still belongs to this generation.
    fn finish_if_current(&self, key: &JobKey, generation: Generation) {
        let mut inner = self.inner.lock();
        if inner
            .active
            .get(key)
            .is_some_and(|job| job.generation == generation)
        {
            inner.active.remove(key);
        }
    }

    async fn run_sequence(
        self,
        key: JobKey,
        generation: Generation,
        cancel_rx: watch::Receiver<bool>,
        stages: Vec<SequenceStage>,
        done_tx: oneshot::Sender<Result<Value, JobError>>,
    ) {
        let total = stages.len();
        let mut outcome: Result<Value, JobError> = Err(JobError::Cancelled);

        for (index, stage) in stages.into_iter().enumerate() {
            if *cancel_rx.borrow() {
                outcome = Err(JobError::Cancelled);
                break;
            }
            if self.is_current(&key, generation) {
                self.set_artifact_state(
                    &key.0,
                    &key.1,
                    ArtifactState::Processing {
                        stage: stage.label.clone(),
                    },
                )
                .await;
            }
            if let Some(label) = &stage.label {
                self.emit(Event::job(
                    &key.0,
                    key.1.encode(),
                    generation,
                    JobPhase::StageStarted,
                    format!("{label} ({}/{total})", index + 1),
                ));
            }

            match self.drive_job(&key, stage.request, &cancel_rx).await {
                Ok(payload) => {
                    if let Some(target) = &stage.commit_to {
                        if self.is_current(&key, generation) {
                            self.commit_independent(&key.0, target, payload.clone()).await;
                        }
                    }
                    outcome = Ok(payload);
                    if index + 1 < total {
                        continue;
                    }
                }
                Err(error) => {
                    outcome = Err(error);
                    break;
                }
            }
        }

        self.resolve(key, generation, outcome, done_tx).await;
    }

    /// Start one service job and poll it to a terminal reply.
    async fn drive_job(
        &self,
        key: &JobKey,
        request: Value,
        cancel_rx: &watch::Receiver<bool>,
    ) -> Result<Value, JobError> {
        let ack = match self.service.start(&key.0, &key.1, request).await {
            Ok(ack) => ack,
            Err(error) => {
                return Err(JobError::UpstreamGenerationFailed {
                    detail: error.to_string(),
                });
            }
        };

        // Synchronous completion: fetch the payload without waiting a tick.
        if matches!(ack.status, StartStatus::Completed) {
            match self.service.poll(&ack.job_ref).await {
                Ok(PollReply::Completed { payload }) => return Ok(payload),
                Ok(PollReply::Failed { error }) => {
                    return Err(JobError::UpstreamGenerationFailed { detail: error });
                }
                Ok(PollReply::Processing) => {}
                Err(error) => warn!(%error, job_ref = %ack.job_ref, "poll transport error"),
            }
        }

        let mut attempts = 0u32;
        while attempts < self.config.max_poll_attempts {
            if *cancel_rx.borrow() {
                return Err(JobError::Cancelled);
            }
            tokio::time::sleep(self.config.poll_interval).await;
            if *cancel_rx.borrow() {
                return Err(JobError::Cancelled);
            }
            attempts += 1;
            match self.service.poll(&ack.job_ref).await {
                Ok(PollReply::Processing) => {}
                Ok(PollReply::Completed { payload }) => return Ok(payload),
                Ok(PollReply::Failed { error }) => {
                    return Err(JobError::UpstreamGenerationFailed { detail: error });
                }
                // Transport hiccups consume an attempt but are not terminal.
                Err(error) => warn!(%error, attempts, job_ref = %ack.job_ref, "poll transport error"),
            }
        }
        Err(JobError::Timeout { attempts })
    }

    async fn resolve(
        &self,
        key: JobKey,
        generation: Generation,
        outcome: Result<Value, JobError>,
        done_tx: oneshot::Sender<Result<Value, JobError>>,
    ) {
        let resolved = match outcome {
            Ok(payload) => match self.commit_composite(&key, generation, payload).await {
                Some(committed) => {
                    self.emit(Event::job(
                        &key.0,
                        key.1.encode(),
                        generation,
                        JobPhase::Completed,
                        "payload committed",
                    ));
                    Ok(committed)
                }
                // Superseded between the terminal poll and the commit.
                None => Err(JobError::Cancelled),
            },
            Err(JobError::Timeout { attempts }) => {
                // The upstream job may still finish; the artifact stays
                // processing so the user can retry explicitly.
                self.emit(Event::job(
                    &key.0,
                    key.1.encode(),
                    generation,
                    JobPhase::TimedOut,
                    format!("after {attempts} attempts"),
                ));
                Err(JobError::Timeout { attempts })
            }
            Err(JobError::UpstreamGenerationFailed { detail }) => {
                if self.is_current(&key, generation) {
                    self.set_artifact_state(&key.0, &key.1, ArtifactState::failed(detail.clone()))
                        .await;
                }
                self.emit(Event::job(
                    &key.0,
                    key.1.encode(),
                    generation,
                    JobPhase::Failed,
                    detail.clone(),
                ));
                Err(JobError::UpstreamGenerationFailed { detail })
            }
            Err(JobError::Cancelled) => Err(JobError::Cancelled),
        };

        self.finish_if_current(&key, generation);
        let _ = done_tx.send(resolved);
    }

    /// Commit the composite payload if this job is still the current
    /// generation. Returns the committed payload (with custom items
    /// re-attached), or `None` if the job went stale.
    async fn commit_composite(
        &self,
        key: &JobKey,
        generation: Generation,
        mut payload: Value,
    ) -> Option<Value> {
        if !self.is_current(key, generation) {
            return None;
        }
        let record = match self.repository.get(&key.0, &key.1).await {
            Ok(Some(record)) => record,
            // A store outage must not lose the payload: commit over an
            // empty record; the cache keeps it until the store recovers.
            _ => ArtifactRecord::absent(),
        };
        reattach_custom_items(&mut payload, &record.inputs.custom_items);
        let committed = ArtifactRecord {
            state: ArtifactState::completed(payload.clone()),
            inputs: record.inputs,
            is_custom: record.is_custom,
        };
        self.repository.put(&key.0, &key.1, committed).await;
        // The counter may have moved while the write was in flight (an edit
        // raced the commit); if so the artifact was re-cleared by the edit's
        // invalidation pass, and this payload must not stand.
        if !self.is_current(key, generation) {
            self.repository.clear(&key.0, &key.1).await;
            return None;
        }
        Some(payload)
    }

    /// Commit a sub-stage payload to an independent artifact.
    async fn commit_independent(&self, workflow_id: &str, target: &ArtifactKind, payload: Value) {
        let record = match self.repository.get(workflow_id, target).await {
            Ok(Some(record)) => record,
            _ => ArtifactRecord::absent(),
        };
        let committed = ArtifactRecord {
            state: ArtifactState::completed(payload),
            inputs: record.inputs,
            is_custom: record.is_custom,
        };
        self.repository.put(workflow_id, target, committed).await;
    }

    /// Overwrite the lifecycle state while preserving inputs.
    async fn set_artifact_state(
        &self,
        workflow_id: &str,
        artifact: &ArtifactKind,
        state: ArtifactState,
    ) {
        let record = match self.repository.get(workflow_id, artifact).await {
            Ok(Some(record)) => record,
            _ => ArtifactRecord::absent(),
        };
        self.repository
            .put(
                workflow_id,
                artifact,
                ArtifactRecord { state, ..record },
            )
            .await;
    }

    fn emit(&self, event: Event) {
        if self.events.send(event).is_err() {
            tracing::trace!("no event bus attached; progress event dropped");
        }
    }
}
