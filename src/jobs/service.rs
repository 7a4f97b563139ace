//! The generation-service boundary.
//!
//! Everything that produces artifact content — the generative AI service
//! and the content-retrieval collaborator alike — sits behind
//! [`GenerationService`]. Both expose the same start/poll shape, so the
//! orchestrator treats a retrieval job exactly like a generation job.

use async_trait::async_trait;
use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use super::types::{JobRef, PollReply, StartAck};
use crate::types::ArtifactKind;

/// Errors raised by the service transport itself (as opposed to a job that
/// the service reports as `failed`).
#[derive(Debug, Error, Diagnostic)]
pub enum ServiceError {
    /// The service could not be reached or returned garbage.
    #[error("generation service transport error: {message}")]
    #[diagnostic(
        code(draftloom::jobs::transport),
        help("Transient transport failures during polling are retried until the attempt ceiling.")
    )]
    Transport { message: String },

    /// The service refused the request outright.
    #[error("generation service rejected the request: {message}")]
    #[diagnostic(code(draftloom::jobs::rejected))]
    Rejected { message: String },
}

impl ServiceError {
    pub fn transport(message: impl Into<String>) -> Self {
        ServiceError::Transport {
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        ServiceError::Rejected {
            message: message.into(),
        }
    }
}

/// An external collaborator that produces artifact content asynchronously.
///
/// `start` kicks off (or synchronously completes) one job and returns a
/// [`JobRef`]; `poll` reports `processing | completed | failed` for that
/// reference. Implementations must tolerate polls for already-terminal jobs.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Begin generating `artifact` for `workflow_id` from `request`.
    async fn start(
        &self,
        workflow_id: &str,
        artifact: &ArtifactKind,
        request: Value,
    ) -> Result<StartAck, ServiceError>;

    /// Query the status of a previously started job.
    async fn poll(&self, job_ref: &JobRef) -> Result<PollReply, ServiceError>;
}
