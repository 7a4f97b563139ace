//! Wire-level types shared with the generation service boundary.

use std::fmt;

use serde_json::Value;

use crate::types::ArtifactKind;

/// Opaque reference to a job on the generation service side, handed back by
/// `start` and consumed by `poll`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct JobRef(String);

impl JobRef {
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether `start` kicked off background work or finished synchronously.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartStatus {
    /// The job is running; poll until terminal.
    Started,
    /// The service completed synchronously; one poll fetches the payload.
    Completed,
}

/// Acknowledgment returned by [`GenerationService::start`](super::GenerationService::start).
#[derive(Clone, Debug)]
pub struct StartAck {
    pub status: StartStatus,
    pub job_ref: JobRef,
}

/// One status-poll reply.
#[derive(Clone, Debug)]
pub enum PollReply {
    Processing,
    Completed { payload: Value },
    Failed { error: String },
}

/// One sub-job in a multi-stage generation sequence.
#[derive(Clone, Debug)]
pub struct StageSpec {
    /// Label surfaced as the active sub-stage for progress display.
    pub label: String,
    /// Independent artifact this stage's payload is committed to, if any.
    /// The final stage's payload always becomes the composite artifact.
    pub commit_to: Option<ArtifactKind>,
    /// Request payload handed to the generation service for this stage.
    pub request: Value,
}

impl StageSpec {
    #[must_use]
    pub fn new(label: impl Into<String>, request: Value) -> Self {
        Self {
            label: label.into(),
            commit_to: None,
            request,
        }
    }

    /// Commit this stage's payload to an independent artifact as well.
    #[must_use]
    pub fn committing_to(mut self, artifact: ArtifactKind) -> Self {
        self.commit_to = Some(artifact);
        self
    }
}
