use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A progress event emitted by the wizard runtime.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Event {
    /// Generation-job lifecycle progress.
    Job(JobEvent),
    /// Artifacts cleared by an invalidation pass.
    Invalidation(InvalidationEvent),
    /// Free-form diagnostics.
    Diagnostic(DiagnosticEvent),
}

impl Event {
    /// A job lifecycle event for `(workflow, artifact)` at `generation`.
    pub fn job(
        workflow_id: impl Into<String>,
        artifact: impl Into<String>,
        generation: u64,
        phase: JobPhase,
        detail: impl Into<String>,
    ) -> Self {
        Event::Job(JobEvent {
            workflow_id: workflow_id.into(),
            artifact: artifact.into(),
            generation,
            phase,
            detail: detail.into(),
            when: Utc::now(),
        })
    }

    /// An invalidation event listing the cleared artifacts.
    pub fn invalidation(
        workflow_id: impl Into<String>,
        origin: impl Into<String>,
        cleared: Vec<String>,
    ) -> Self {
        Event::Invalidation(InvalidationEvent {
            workflow_id: workflow_id.into(),
            origin: origin.into(),
            cleared,
            when: Utc::now(),
        })
    }

    pub fn diagnostic(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Event::Diagnostic(DiagnosticEvent {
            scope: scope.into(),
            message: message.into(),
        })
    }

    /// Short label for grouping/filtering in sinks.
    #[must_use]
    pub fn scope_label(&self) -> &str {
        match self {
            Event::Job(job) => &job.artifact,
            Event::Invalidation(inv) => &inv.origin,
            Event::Diagnostic(diag) => &diag.scope,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Job(job) => write!(
                f,
                "[{}/{}#{}] {}: {}",
                job.workflow_id, job.artifact, job.generation, job.phase, job.detail
            ),
            Event::Invalidation(inv) => write!(
                f,
                "[{}] {} cleared {}",
                inv.workflow_id,
                inv.origin,
                inv.cleared.join(", ")
            ),
            Event::Diagnostic(diag) => write!(f, "[{}] {}", diag.scope, diag.message),
        }
    }
}

/// Where a generation job is in its lifecycle.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Launched,
    /// A sub-stage of a multi-stage generation became active.
    StageStarted,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobPhase::Launched => "launched",
            JobPhase::StageStarted => "stage started",
            JobPhase::Completed => "completed",
            JobPhase::Failed => "failed",
            JobPhase::TimedOut => "timed out",
            JobPhase::Cancelled => "cancelled",
        };
        write!(f, "{label}")
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobEvent {
    pub workflow_id: String,
    /// Encoded artifact kind.
    pub artifact: String,
    pub generation: u64,
    pub phase: JobPhase,
    pub detail: String,
    pub when: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvalidationEvent {
    pub workflow_id: String,
    /// Display form of the changed node.
    pub origin: String,
    /// Encoded kinds of the cleared artifacts, in clear order.
    pub cleared: Vec<String>,
    pub when: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiagnosticEvent {
    pub scope: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_workflow_artifact_and_phase() {
        let event = Event::job("wf-1", "Structure", 2, JobPhase::Completed, "8 items");
        let rendered = event.to_string();
        assert!(rendered.contains("wf-1"));
        assert!(rendered.contains("Structure"));
        assert!(rendered.contains("completed"));
    }

    #[test]
    fn events_serialize_to_json() {
        let event = Event::invalidation(
            "wf-1",
            "input:SourceDocument",
            vec!["SourceAnalysis".to_string()],
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("SourceAnalysis"));
    }
}
