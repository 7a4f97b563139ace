//! Asynchronous generation-job orchestration.
//!
//! This module tracks every in-flight generation for a workflow and drives
//! it to a terminal state. The main entry point is [`JobOrchestrator`]:
//!
//! - [`launch`](JobOrchestrator::launch) starts a single generation job and
//!   returns a [`JobHandle`] the caller can await.
//! - [`launch_staged`](JobOrchestrator::launch_staged) runs a strict
//!   sequence of sub-jobs for one composite artifact, surfacing the active
//!   sub-stage and aborting the remainder on the first failure.
//! - [`cancel`](JobOrchestrator::cancel) stops polling cooperatively and
//!   bumps the artifact's generation counter so a late poll reply from the
//!   cancelled job can never overwrite newer state.
//!
//! Launch preconditions (`ConflictingJob`) are checked synchronously and
//! never reach the polling loop; terminal outcomes (`Timeout`,
//! `UpstreamGenerationFailed`) resolve through the handle. The external
//! generation and content-retrieval services both implement
//! [`GenerationService`], so retrieval jobs need no special-casing.

mod orchestrator;
mod service;
mod types;

pub use orchestrator::{JobError, JobHandle, JobOrchestrator, LaunchError};
pub use service::{GenerationService, ServiceError};
pub use types::{JobRef, PollReply, StageSpec, StartAck, StartStatus};

/// Monotonically increasing per-artifact counter guarding stale commits.
pub type Generation = u64;
