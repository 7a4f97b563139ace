//! Workflow records and consistent state snapshots.
//!
//! A [`Workflow`] is one end-to-end wizard instance (one proposal or one
//! newsletter) owning a map of artifact records. Step predicates never read
//! the live record: they evaluate over a [`WorkflowSnapshot`], a single
//! consistent projection of every artifact's status taken at one point in
//! time, so that no predicate can observe two artifacts across a mutation.

use chrono::{DateTime, Utc};
use rand::Rng;
use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::artifact::{ArtifactRecord, ArtifactState};
use crate::types::{ArtifactKind, ArtifactStatus, WorkflowStatus};

/// Identifier of a workflow; unique per owner and stable for its lifetime.
pub type WorkflowId = String;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 6;

/// One proposal or newsletter instance.
#[derive(Clone, Debug, PartialEq)]
pub struct Workflow {
    pub id: WorkflowId,
    /// Short human-readable code shown in listings (e.g. `DW-K4T7QZ`).
    pub code: String,
    pub owner: String,
    pub status: WorkflowStatus,
    /// Zero-based index of the wizard step the user is on.
    pub current_step: usize,
    pub created_at: DateTime<Utc>,
    pub artifacts: FxHashMap<ArtifactKind, ArtifactRecord>,
}

impl Workflow {
    /// Create an empty draft workflow for `owner`.
    #[must_use]
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            code: generate_code(),
            owner: owner.into(),
            status: WorkflowStatus::Draft,
            current_step: 0,
            created_at: Utc::now(),
            artifacts: FxHashMap::default(),
        }
    }

    /// The record for `kind`, if one has ever been touched.
    #[must_use]
    pub fn record(&self, kind: &ArtifactKind) -> Option<&ArtifactRecord> {
        self.artifacts.get(kind)
    }

    /// Mutable record for `kind`, created absent on first touch.
    pub fn record_mut(&mut self, kind: &ArtifactKind) -> &mut ArtifactRecord {
        self.artifacts.entry(kind.clone()).or_default()
    }

    /// Coarse status of `kind`; untouched artifacts read as `Absent`.
    #[must_use]
    pub fn status_of(&self, kind: &ArtifactKind) -> ArtifactStatus {
        self.artifacts
            .get(kind)
            .map_or(ArtifactStatus::Absent, ArtifactRecord::status)
    }

    /// Set an artifact's lifecycle state, creating the record if needed.
    pub fn set_state(&mut self, kind: &ArtifactKind, state: ArtifactState) {
        self.record_mut(kind).state = state;
    }

    /// Take a consistent snapshot of every artifact's status plus the
    /// workflow-level fields predicates may read.
    #[must_use]
    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            workflow_id: self.id.clone(),
            status: self.status,
            current_step: self.current_step,
            artifacts: self
                .artifacts
                .iter()
                .map(|(kind, record)| (kind.clone(), record.status()))
                .collect(),
        }
    }

    /// Listing projection for `query_by_owner` results.
    #[must_use]
    pub fn summary(&self) -> WorkflowSummary {
        WorkflowSummary {
            id: self.id.clone(),
            code: self.code.clone(),
            owner: self.owner.clone(),
            status: self.status,
            current_step: self.current_step,
            created_at: self.created_at,
        }
    }
}

/// Immutable projection of a workflow used by step predicates.
///
/// All statuses come from one read of the workflow; predicates evaluated
/// against the same snapshot always agree with each other.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkflowSnapshot {
    pub workflow_id: WorkflowId,
    pub status: WorkflowStatus,
    pub current_step: usize,
    pub artifacts: FxHashMap<ArtifactKind, ArtifactStatus>,
}

impl WorkflowSnapshot {
    /// Status of `kind` at snapshot time; untouched artifacts are `Absent`.
    #[must_use]
    pub fn status_of(&self, kind: &ArtifactKind) -> ArtifactStatus {
        self.artifacts
            .get(kind)
            .copied()
            .unwrap_or(ArtifactStatus::Absent)
    }

    #[must_use]
    pub fn is_completed(&self, kind: &ArtifactKind) -> bool {
        self.status_of(kind) == ArtifactStatus::Completed
    }
}

/// Compact listing row for one workflow.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkflowSummary {
    pub id: WorkflowId,
    pub code: String,
    pub owner: String,
    pub status: WorkflowStatus,
    pub current_step: usize,
    pub created_at: DateTime<Utc>,
}

fn generate_code() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    format!("DW-{suffix}")
}
