//! # Draftloom: Artifact-Graph Orchestration for Drafting Wizards
//!
//! Draftloom is the core engine of a multi-step content-generation wizard
//! (proposal writer, newsletter generator): each wizard step produces an
//! **artifact** by calling an external generative service, artifacts form a
//! dependency chain, and changing anything upstream must observably clear
//! everything downstream — in the volatile client cache and the durable
//! store alike — while in-flight generation jobs are tracked, polled,
//! cancelled, and never silently lost or duplicated.
//!
//! ## Core Concepts
//!
//! - **Artifacts**: Named units of generated or user-entered content with a
//!   tagged lifecycle state (`absent → pending → processing →
//!   completed | failed`)
//! - **Dependency Graph**: Static declaration of which artifact derives
//!   from which inputs and artifacts; compiled and cycle-checked
//! - **Invalidation Engine**: Turns a change event into the narrowest
//!   ordered clear-set — over-clearing wastes generation cost and is
//!   treated as a defect, same as under-clearing
//! - **Job Orchestrator**: Launches and polls generation jobs with a hard
//!   attempt ceiling, cooperative cancellation, and a per-artifact
//!   generation counter that rejects stale commits
//! - **Step State Machine**: Pure predicates over an artifact snapshot
//!   decide step completion and navigation; no tracked booleans
//!
//! ## Quick Start
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
//! async fn run(service: Arc<dyn GenerationService>) -> miette::Result<()> {
//!     let store = Arc::new(InMemoryArtifactStore::new());
//!     let wizard = Wizard::new(service, store, OrchestratorConfig::default());
//!
//!     // Create a workflow and upload a source document.
//!     let workflow = wizard.create_workflow("user-1").await?;
//!     wizard
//!         .on_input_changed(&workflow.id, &InputKind::SourceDocument)
//!         .await?;
//!
//!     // Generate the analysis and await the committed payload.
//!     let handle = wizard
//!         .generate(&workflow.id, &ArtifactKind::SourceAnalysis, json!({"doc": "…"}))
//!         .await?;
//!     let analysis = handle.outcome().await;
//!     println!("analysis: {analysis:?}");
//!
//!     // Navigation is derived from artifact state, never from flags.
//!     if wizard.can_advance(&workflow.id).await? {
//!         wizard.advance(&workflow.id).await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Invalidation Semantics
//!
//! The domain dependency table is explicit (see
//! [`graph::dependency_graph`]): replacing the source document clears the
//! analysis, evaluation, concept document, structure, and draft feedback;
//! editing evaluation selections clears only the concept document and
//! below; regenerating the structure clears the draft feedback alone.
//! User-authored (`is_custom`) outline items survive regeneration of their
//! parent and are re-attached by stable id.
//!
//! ## Module Guide
//!
//! - [`types`] - Artifact/input identifiers and lifecycle statuses
//! - [`artifact`] - Artifact state, user-editable inputs, outline items
//! - [`workflow`] - Workflow records, snapshots, and summaries
//! - [`graph`] - Dependency graph and the invalidation engine
//! - [`jobs`] - Async job orchestration over the generation service
//! - [`steps`] - Step predicates and navigation gating
//! - [`store`] - Client cache, durable store backends, write-through repository
//! - [`wizard`] - The facade wiring everything together
//! - [`event_bus`] - Progress events and pluggable sinks
//! - [`config`] - Polling/retry configuration
//! - [`telemetry`] - Tracing bootstrap

pub mod artifact;
pub mod config;
pub mod event_bus;
pub mod graph;
pub mod jobs;
pub mod steps;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod wizard;
pub mod workflow;
