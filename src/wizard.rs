//! The wizard runtime facade.
//!
//! [`Wizard`] wires the dependency graph, invalidation engine, artifact
//! repository, job orchestrator, and step state machine together behind the
//! surface a UI layer consumes: input/edit notifications, generation
//! launches, and step gating queries.
//!
//! Two ordering rules hold everywhere in this module:
//!
//! 1. Invalidation is applied synchronously and completely — cache cleared,
//!    store delete issued, in-flight jobs cancelled — before any new job is
//!    enqueued in the same logical operation.
//! 2. Navigation gating is always recomputed from a fresh
//!    [`WorkflowSnapshot`](crate::workflow::WorkflowSnapshot); nothing is
//!    answered from cached booleans.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use draftloom::config::OrchestratorConfig;
//! use draftloom::jobs::GenerationService;
//! use draftloom::store::InMemoryArtifactStore;
//! use draftloom::types::{ArtifactKind, InputKind};
//! use draftloom::wizard::Wizard;
//! use serde_json::json;
//!
//! async fn example(service: Arc<dyn GenerationService>) -> miette::Result<()> {
//!     let store = Arc::new(InMemoryArtifactStore::new());
//!     let wizard = Wizard::new(service, store, OrchestratorConfig::default());
//!
//!     let workflow = wizard.create_workflow("user-1").await?;
//!     wizard
//!         .on_input_changed(&workflow.id, &InputKind::SourceDocument)
//!         .await?;
//!
//!     let handle = wizard
//!         .generate(&workflow.id, &ArtifactKind::SourceAnalysis, json!({"doc": "…"}))
//!         .await?;
//!     let payload = handle.outcome().await;
//!     println!("analysis: {payload:?}");
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use miette::Diagnostic;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::instrument;

use crate::artifact::InputsPatch;
use crate::config::OrchestratorConfig;
use crate::event_bus::{Event, EventBus};
use crate::graph::{ClearSet, InvalidationEngine, dependency_graph};
use crate::jobs::{GenerationService, JobHandle, JobOrchestrator, LaunchError, StageSpec};
use crate::steps::{StepCompletion, WizardStep, can_advance, step_completion};
use crate::store::{ArtifactRepository, ArtifactStore, StoreError};
use crate::types::{ArtifactKind, InputKind, WorkflowStatus};
use crate::workflow::{Workflow, WorkflowSummary};

/// Errors surfaced by the wizard facade.
#[derive(Debug, Error, Diagnostic)]
pub enum WizardError {
    #[error("workflow not found: {workflow_id}")]
    #[diagnostic(code(draftloom::wizard::not_found))]
    WorkflowNotFound { workflow_id: String },

    /// Forward navigation was requested while the active step's completion
    /// predicate does not hold.
    #[error("step '{step}' is not complete")]
    #[diagnostic(
        code(draftloom::wizard::step_incomplete),
        help("Generate the step's artifact (or wait for it to complete) before advancing.")
    )]
    StepIncomplete { step: WizardStep },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

/// The wizard runtime: one instance serves all workflows of a deployment.
pub struct Wizard {
    engine: InvalidationEngine,
    repository: Arc<ArtifactRepository>,
    orchestrator: JobOrchestrator,
    events: flume::Sender<Event>,
}

impl Wizard {
    /// Wire a wizard over a generation service and a durable store, using
    /// the built-in domain dependency graph.
    #[must_use]
    pub fn new(
        service: Arc<dyn GenerationService>,
        store: Arc<dyn ArtifactStore>,
        config: OrchestratorConfig,
    ) -> Self {
        let repository = Arc::new(
            ArtifactRepository::new(store).with_write_retries(config.store_write_retries),
        );
        let orchestrator =
            JobOrchestrator::new(service, Arc::clone(&repository), config);
        let (events, _) = flume::unbounded();
        Self {
            engine: InvalidationEngine::new(dependency_graph()),
            repository,
            orchestrator,
            events,
        }
    }

    /// Route progress events (job lifecycle, invalidations) to `bus`.
    #[must_use]
    pub fn with_event_bus(mut self, bus: &EventBus) -> Self {
        let sender = bus.get_sender();
        self.orchestrator = self.orchestrator.with_event_sender(sender.clone());
        self.events = sender;
        self
    }

    #[must_use]
    pub fn repository(&self) -> &Arc<ArtifactRepository> {
        &self.repository
    }

    #[must_use]
    pub fn orchestrator(&self) -> &JobOrchestrator {
        &self.orchestrator
    }

    // ------------------------------------------------------------------
    // workflow lifecycle
    // ------------------------------------------------------------------

    /// Create and persist an empty draft workflow for `owner`.
    #[instrument(skip(self), err)]
    pub async fn create_workflow(&self, owner: &str) -> Result<Workflow, WizardError> {
        let workflow = Workflow::new(owner);
        self.repository.save_workflow(&workflow).await?;
        Ok(workflow)
    }

    /// Load a workflow, cache entries overlaid.
    pub async fn workflow(&self, workflow_id: &str) -> Result<Workflow, WizardError> {
        self.repository
            .load_workflow(workflow_id)
            .await?
            .ok_or_else(|| WizardError::WorkflowNotFound {
                workflow_id: workflow_id.to_string(),
            })
    }

    /// Summaries of every workflow owned by `owner`.
    pub async fn list_workflows(&self, owner: &str) -> Result<Vec<WorkflowSummary>, WizardError> {
        Ok(self.repository.list_by_owner(owner).await?)
    }

    /// Archive a workflow; the wizard treats it as read-only afterwards.
    #[instrument(skip(self), err)]
    pub async fn archive_workflow(&self, workflow_id: &str) -> Result<(), WizardError> {
        let mut workflow = self.workflow(workflow_id).await?;
        workflow.status = WorkflowStatus::Archived;
        self.repository.save_workflow(&workflow).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // invalidation surface
    // ------------------------------------------------------------------

    /// A raw input changed (re-upload, selection edit, query edit).
    ///
    /// Clears the input's transitive downstream artifacts in cache and
    /// store, cancels their in-flight jobs, and persists the workflow —
    /// all before this call returns, so no job can slip in between the
    /// edit and its invalidation. Returns the cleared artifacts in order.
    #[instrument(skip(self), fields(input = %input), err)]
    pub async fn on_input_changed(
        &self,
        workflow_id: &str,
        input: &InputKind,
    ) -> Result<Vec<ArtifactKind>, WizardError> {
        let mut workflow = self.workflow(workflow_id).await?;
        let clear_set = self.engine.input_changed(input);
        let cleared = self
            .apply_clear_set(&mut workflow, &clear_set, None)
            .await;
        if workflow.status == WorkflowStatus::Draft {
            workflow.status = WorkflowStatus::InProgress;
        }
        self.repository.save_workflow(&workflow).await?;
        self.emit_invalidation(workflow_id, &format!("input:{input}"), &cleared);
        Ok(cleared)
    }

    /// The user edited an artifact's selections/comments/custom items.
    ///
    /// The patch is applied to the artifact's inputs (its generated payload
    /// is untouched), then everything strictly downstream is cleared — the
    /// narrowest clear-set for an inputs edit.
    #[instrument(skip(self, patch), fields(artifact = %artifact), err)]
    pub async fn on_artifact_edit_requested(
        &self,
        workflow_id: &str,
        artifact: &ArtifactKind,
        patch: InputsPatch,
    ) -> Result<Vec<ArtifactKind>, WizardError> {
        let mut workflow = self.workflow(workflow_id).await?;
        if !patch.is_empty() {
            let record = workflow.record_mut(artifact);
            patch.apply(&mut record.inputs);
            self.repository
                .put(workflow_id, artifact, record.clone())
                .await;
        }
        let clear_set = self.engine.artifact_regenerating(artifact);
        let cleared = self
            .apply_clear_set(&mut workflow, &clear_set, None)
            .await;
        self.repository.save_workflow(&workflow).await?;
        self.emit_invalidation(workflow_id, &format!("edit:{artifact}"), &cleared);
        Ok(cleared)
    }

    /// Explicitly invalidate an artifact: it is cleared along with
    /// everything downstream of it.
    #[instrument(skip(self), fields(artifact = %artifact), err)]
    pub async fn invalidate_artifact(
        &self,
        workflow_id: &str,
        artifact: &ArtifactKind,
    ) -> Result<Vec<ArtifactKind>, WizardError> {
        let mut workflow = self.workflow(workflow_id).await?;
        let clear_set = self.engine.artifact_invalidated(artifact);
        let cleared = self
            .apply_clear_set(&mut workflow, &clear_set, Some(artifact))
            .await;
        self.repository.save_workflow(&workflow).await?;
        self.emit_invalidation(workflow_id, &format!("invalidate:{artifact}"), &cleared);
        Ok(cleared)
    }

    // ------------------------------------------------------------------
    // generation surface
    // ------------------------------------------------------------------

    /// Launch a generation job for `artifact`.
    ///
    /// Preconditions, both surfaced synchronously: every direct upstream
    /// artifact must be `completed` (`ValidationFailed`) and no job may be
    /// active for the pair (`ConflictingJob`). Downstream artifacts go
    /// stale the moment regeneration starts, so they are cleared before the
    /// job is enqueued.
    #[instrument(skip(self, request), fields(artifact = %artifact), err)]
    pub async fn generate(
        &self,
        workflow_id: &str,
        artifact: &ArtifactKind,
        request: Value,
    ) -> Result<JobHandle, WizardError> {
        self.prepare_launch(workflow_id, artifact).await?;
        let handle = self
            .orchestrator
            .launch(workflow_id, artifact, request)
            .await
            .map_err(WizardError::Launch)?;
        Ok(handle)
    }

    /// Launch a multi-stage generation sequence for a composite artifact.
    #[instrument(skip(self, stages), fields(artifact = %composite), err)]
    pub async fn generate_staged(
        &self,
        workflow_id: &str,
        composite: &ArtifactKind,
        stages: Vec<StageSpec>,
    ) -> Result<JobHandle, WizardError> {
        self.prepare_launch(workflow_id, composite).await?;
        let handle = self
            .orchestrator
            .launch_staged(workflow_id, composite, stages)
            .await
            .map_err(WizardError::Launch)?;
        Ok(handle)
    }

    /// Cancel the active job for an artifact, if any.
    pub fn cancel_generation(&self, workflow_id: &str, artifact: &ArtifactKind) -> bool {
        self.orchestrator.cancel(workflow_id, artifact)
    }

    /// Retry any artifact writes retained in the cache by a store outage.
    pub async fn flush_pending_writes(&self) -> usize {
        self.repository.flush_pending().await
    }

    // ------------------------------------------------------------------
    // step gating surface
    // ------------------------------------------------------------------

    /// Per-step completion booleans plus the active step, computed from a
    /// fresh snapshot.
    pub async fn get_step_completion(
        &self,
        workflow_id: &str,
    ) -> Result<StepCompletion, WizardError> {
        let workflow = self.workflow(workflow_id).await?;
        Ok(step_completion(&workflow.snapshot()))
    }

    /// Whether the active step's predicate holds right now.
    pub async fn can_advance(&self, workflow_id: &str) -> Result<bool, WizardError> {
        let workflow = self.workflow(workflow_id).await?;
        Ok(can_advance(&workflow.snapshot()))
    }

    /// Advance to the next step; permitted only when the active step's
    /// predicate holds on a fresh snapshot.
    #[instrument(skip(self), err)]
    pub async fn advance(&self, workflow_id: &str) -> Result<WizardStep, WizardError> {
        let mut workflow = self.workflow(workflow_id).await?;
        let snapshot = workflow.snapshot();
        if !can_advance(&snapshot) {
            return Err(WizardError::StepIncomplete {
                step: WizardStep::from_index(snapshot.current_step),
            });
        }
        workflow.current_step += 1;
        let entered = WizardStep::from_index(workflow.current_step);
        if matches!(
            workflow.status,
            WorkflowStatus::Draft | WorkflowStatus::InProgress
        ) {
            workflow.status = if entered == WizardStep::Review {
                WorkflowStatus::Review
            } else {
                WorkflowStatus::InProgress
            };
        }
        self.repository.save_workflow(&workflow).await?;
        Ok(entered)
    }

    /// Step back; always permitted, clamped at the first step.
    #[instrument(skip(self), err)]
    pub async fn retreat(&self, workflow_id: &str) -> Result<WizardStep, WizardError> {
        let mut workflow = self.workflow(workflow_id).await?;
        workflow.current_step = workflow.current_step.saturating_sub(1);
        let entered = WizardStep::from_index(workflow.current_step);
        self.repository.save_workflow(&workflow).await?;
        Ok(entered)
    }

    /// Explicit terminal action: mark the workflow completed.
    ///
    /// Only permitted on the final step; completion is never inferred from
    /// artifact states.
    #[instrument(skip(self), err)]
    pub async fn complete_workflow(&self, workflow_id: &str) -> Result<(), WizardError> {
        let mut workflow = self.workflow(workflow_id).await?;
        let active = WizardStep::from_index(workflow.current_step);
        if !active.is_last() {
            return Err(WizardError::StepIncomplete { step: active });
        }
        // The review artifact must still be current; invalidating it after
        // reaching the final step blocks completion until it is regenerated.
        if !WizardStep::Review.is_complete(&workflow.snapshot()) {
            return Err(WizardError::StepIncomplete {
                step: WizardStep::Review,
            });
        }
        workflow.status = WorkflowStatus::Completed;
        self.repository.save_workflow(&workflow).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // internals
    // ------------------------------------------------------------------

    /// Validation plus pre-launch invalidation, in that order.
    async fn prepare_launch(
        &self,
        workflow_id: &str,
        artifact: &ArtifactKind,
    ) -> Result<(), WizardError> {
        let mut workflow = self.workflow(workflow_id).await?;

        let snapshot = workflow.snapshot();
        let missing: Vec<ArtifactKind> = self
            .engine
            .graph()
            .required_upstream(artifact)
            .iter()
            .filter(|upstream| !snapshot.is_completed(upstream))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(WizardError::Launch(LaunchError::ValidationFailed {
                artifact: artifact.clone(),
                missing,
            }));
        }

        // Regeneration makes everything downstream stale; clear it before
        // the new job can be enqueued.
        let clear_set = self.engine.artifact_regenerating(artifact);
        let cleared = self
            .apply_clear_set(&mut workflow, &clear_set, None)
            .await;
        if workflow.status == WorkflowStatus::Draft {
            workflow.status = WorkflowStatus::InProgress;
        }
        self.repository.save_workflow(&workflow).await?;
        if !cleared.is_empty() {
            self.emit_invalidation(workflow_id, &format!("regenerate:{artifact}"), &cleared);
        }
        Ok(())
    }

    /// Apply one clear-set: cancel jobs, clear records, clear the
    /// repository. User-authored artifacts are skipped unless explicitly
    /// forced (an explicit invalidation of that artifact itself).
    async fn apply_clear_set(
        &self,
        workflow: &mut Workflow,
        clear_set: &ClearSet,
        force: Option<&ArtifactKind>,
    ) -> Vec<ArtifactKind> {
        let mut cleared = Vec::with_capacity(clear_set.len());
        for kind in clear_set {
            let user_authored = workflow
                .record(kind)
                .is_some_and(|record| record.is_custom);
            if user_authored && force != Some(kind) {
                continue;
            }
            self.orchestrator.cancel(&workflow.id, kind);
            workflow.record_mut(kind).clear();
            self.repository.clear(&workflow.id, kind).await;
            cleared.push(kind.clone());
        }
        cleared
    }

    fn emit_invalidation(&self, workflow_id: &str, origin: &str, cleared: &[ArtifactKind]) {
        if cleared.is_empty() {
            return;
        }
        let _ = self.events.send(Event::invalidation(
            workflow_id,
            origin,
            cleared.iter().map(ArtifactKind::encode).collect(),
        ));
    }
}

/// The default three-stage plan for the source-analysis step: parse the
/// source, assess its content, then compose the analysis. Only the final
/// stage's payload becomes the analysis artifact.
#[must_use]
pub fn analysis_stages(request: Value) -> Vec<StageSpec> {
    vec![
        StageSpec::new("parse source", json!({"stage": "parse", "request": request.clone()})),
        StageSpec::new("assess content", json!({"stage": "assess", "request": request.clone()})),
        StageSpec::new("compose analysis", json!({"stage": "compose", "request": request})),
    ]
}
