//! The wizard step state machine.
//!
//! Every step's completion is a pure predicate over a
//! [`WorkflowSnapshot`] — there is no separately tracked "step done" flag
//! anywhere, so completion can never drift from the real artifact state.
//! Predicates are recomputed from a fresh snapshot on every query.

use std::fmt;

use crate::types::{ArtifactKind, WorkflowStatus};
use crate::workflow::WorkflowSnapshot;

/// The wizard steps, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WizardStep {
    /// Upload the source document and generate its analysis.
    SourceIntake,
    /// Generate and curate the concept evaluation.
    Evaluation,
    /// Assemble the concept document from the selected candidates.
    ConceptDraft,
    /// Retrieve source material and generate the outline.
    Outline,
    /// Generate feedback on the drafted structure.
    Review,
    /// Explicitly complete the workflow.
    Finalize,
}

impl WizardStep {
    pub const ALL: [WizardStep; 6] = [
        WizardStep::SourceIntake,
        WizardStep::Evaluation,
        WizardStep::ConceptDraft,
        WizardStep::Outline,
        WizardStep::Review,
        WizardStep::Finalize,
    ];

    /// Zero-based position of this step.
    #[must_use]
    pub fn index(&self) -> usize {
        Self::ALL
            .iter()
            .position(|step| step == self)
            .unwrap_or_default()
    }

    /// The step at `index`, clamped to the final step.
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self::ALL
            .get(index)
            .copied()
            .unwrap_or(WizardStep::Finalize)
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        matches!(self, WizardStep::Finalize)
    }

    /// The artifact whose completion gates this step, if any.
    #[must_use]
    pub fn required_artifact(&self) -> Option<ArtifactKind> {
        match self {
            WizardStep::SourceIntake => Some(ArtifactKind::SourceAnalysis),
            WizardStep::Evaluation => Some(ArtifactKind::ConceptEvaluation),
            WizardStep::ConceptDraft => Some(ArtifactKind::ConceptDocument),
            WizardStep::Outline => Some(ArtifactKind::Structure),
            WizardStep::Review => Some(ArtifactKind::DraftFeedback),
            WizardStep::Finalize => None,
        }
    }

    /// Completion predicate, pure over the snapshot.
    ///
    /// The final step is complete only once the user has explicitly set the
    /// workflow status to `completed`; it is never inferred.
    #[must_use]
    pub fn is_complete(&self, snapshot: &WorkflowSnapshot) -> bool {
        match self.required_artifact() {
            Some(artifact) => snapshot.is_completed(&artifact),
            None => snapshot.status == WorkflowStatus::Completed,
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WizardStep::SourceIntake => "source intake",
            WizardStep::Evaluation => "evaluation",
            WizardStep::ConceptDraft => "concept draft",
            WizardStep::Outline => "outline",
            WizardStep::Review => "review",
            WizardStep::Finalize => "finalize",
        };
        write!(f, "{label}")
    }
}

/// Per-step completion plus the active step, derived from one snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepCompletion {
    /// One `(step, complete)` entry per wizard step, in order.
    pub steps: Vec<(WizardStep, bool)>,
    /// The step the user is currently on.
    pub active: WizardStep,
}

impl StepCompletion {
    #[must_use]
    pub fn is_complete(&self, step: WizardStep) -> bool {
        self.steps
            .iter()
            .find(|(candidate, _)| *candidate == step)
            .is_some_and(|(_, complete)| *complete)
    }
}

/// Evaluate every step predicate against one consistent snapshot.
#[must_use]
pub fn step_completion(snapshot: &WorkflowSnapshot) -> StepCompletion {
    StepCompletion {
        steps: WizardStep::ALL
            .iter()
            .map(|step| (*step, step.is_complete(snapshot)))
            .collect(),
        active: WizardStep::from_index(snapshot.current_step),
    }
}

/// Whether forward navigation is allowed: the active step's predicate must
/// hold and there must be a step to advance to.
#[must_use]
pub fn can_advance(snapshot: &WorkflowSnapshot) -> bool {
    let active = WizardStep::from_index(snapshot.current_step);
    !active.is_last() && active.is_complete(snapshot)
}
