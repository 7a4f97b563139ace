//! Core identifier types for the draftloom wizard engine.
//!
//! This module defines the fundamental types used throughout the system for
//! naming artifacts, raw inputs, and workflow lifecycle states. These are the
//! domain concepts that define what a wizard workflow *is*.
//!
//! # Key Types
//!
//! - [`ArtifactKind`]: Identifies a generated (or user-authored) artifact
//! - [`InputKind`]: Identifies a raw user input that artifacts derive from
//! - [`WorkflowStatus`]: Lifecycle status of a whole workflow
//! - [`ArtifactStatus`]: Coarse generation status of a single artifact
//!
//! # Examples
//!
//! ```rust
//! use draftloom::types::{ArtifactKind, WorkflowStatus};
//!
//! let outline = ArtifactKind::Structure;
//! assert_eq!(outline.encode(), "Structure");
//!
//! let custom = ArtifactKind::Custom("PressRelease".to_string());
//! assert_eq!(custom.encode(), "Custom:PressRelease");
//! assert_eq!(ArtifactKind::decode("Custom:PressRelease"), custom);
//!
//! assert_eq!(WorkflowStatus::Draft.encode(), "draft");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies an artifact within a workflow.
///
/// The named variants cover the artifacts of the proposal/newsletter wizard;
/// `Custom` allows applications to attach additional artifacts without
/// forking the enum. The string encoding is stable and used as the key in
/// persisted workflow records.
///
/// # Persistence
///
/// `ArtifactKind` supports serialization through both serde and the
/// [`encode`](Self::encode)/[`decode`](Self::decode) methods; unknown encoded
/// strings round-trip as `Custom`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    /// Structured analysis of the uploaded source document.
    SourceAnalysis,
    /// Evaluated concept candidates derived from the analysis.
    ConceptEvaluation,
    /// The concept document assembled from the selected candidates.
    ConceptDocument,
    /// Source material fetched by the content-retrieval collaborator.
    RetrievedMaterial,
    /// The document outline (structure), including user-authored items.
    Structure,
    /// Feedback on the drafted structure.
    DraftFeedback,
    /// Application-defined artifact identified by a unique string.
    Custom(String),
}

impl ArtifactKind {
    /// All built-in artifact kinds, in upstream-to-downstream order.
    pub const BUILT_IN: [ArtifactKind; 6] = [
        ArtifactKind::SourceAnalysis,
        ArtifactKind::ConceptEvaluation,
        ArtifactKind::ConceptDocument,
        ArtifactKind::RetrievedMaterial,
        ArtifactKind::Structure,
        ArtifactKind::DraftFeedback,
    ];

    /// Encode an ArtifactKind into its persisted string form.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use draftloom::types::ArtifactKind;
    /// assert_eq!(ArtifactKind::SourceAnalysis.encode(), "SourceAnalysis");
    /// assert_eq!(
    ///     ArtifactKind::Custom("X".to_string()).encode(),
    ///     "Custom:X",
    /// );
    /// ```
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            ArtifactKind::SourceAnalysis => "SourceAnalysis".to_string(),
            ArtifactKind::ConceptEvaluation => "ConceptEvaluation".to_string(),
            ArtifactKind::ConceptDocument => "ConceptDocument".to_string(),
            ArtifactKind::RetrievedMaterial => "RetrievedMaterial".to_string(),
            ArtifactKind::Structure => "Structure".to_string(),
            ArtifactKind::DraftFeedback => "DraftFeedback".to_string(),
            ArtifactKind::Custom(s) => format!("Custom:{s}"),
        }
    }

    /// Decode a persisted string form back into an ArtifactKind.
    ///
    /// Unrecognized formats fall back to `Custom(s)` for forward
    /// compatibility with artifacts added by newer versions.
    pub fn decode(s: &str) -> Self {
        match s {
            "SourceAnalysis" => ArtifactKind::SourceAnalysis,
            "ConceptEvaluation" => ArtifactKind::ConceptEvaluation,
            "ConceptDocument" => ArtifactKind::ConceptDocument,
            "RetrievedMaterial" => ArtifactKind::RetrievedMaterial,
            "Structure" => ArtifactKind::Structure,
            "DraftFeedback" => ArtifactKind::DraftFeedback,
            other => match other.strip_prefix("Custom:") {
                Some(rest) => ArtifactKind::Custom(rest.to_string()),
                None => ArtifactKind::Custom(other.to_string()),
            },
        }
    }

    /// Returns `true` if this is an application-defined artifact.
    #[must_use]
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(name) => write!(f, "{name}"),
            other => write!(f, "{}", other.encode()),
        }
    }
}

// Developer experience: allow string literals where an ArtifactKind is expected.
impl From<&str> for ArtifactKind {
    fn from(s: &str) -> Self {
        ArtifactKind::decode(s)
    }
}

/// Identifies a raw user input that artifacts derive from.
///
/// Inputs are graph nodes but never carry generation state themselves:
/// changing one invalidates downstream artifacts, but an input is never a
/// member of a clear-set.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputKind {
    /// The uploaded source document a proposal or newsletter starts from.
    SourceDocument,
    /// Selections and comments the user places on the concept evaluation.
    EvaluationSelection,
    /// The query inputs handed to the content-retrieval collaborator.
    RetrievalQuery,
    /// Application-defined input identified by a unique string.
    Custom(String),
}

impl InputKind {
    /// Encode an InputKind into its persisted string form.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            InputKind::SourceDocument => "SourceDocument".to_string(),
            InputKind::EvaluationSelection => "EvaluationSelection".to_string(),
            InputKind::RetrievalQuery => "RetrievalQuery".to_string(),
            InputKind::Custom(s) => format!("Custom:{s}"),
        }
    }

    /// Decode a persisted string form back into an InputKind.
    pub fn decode(s: &str) -> Self {
        match s {
            "SourceDocument" => InputKind::SourceDocument,
            "EvaluationSelection" => InputKind::EvaluationSelection,
            "RetrievalQuery" => InputKind::RetrievalQuery,
            other => match other.strip_prefix("Custom:") {
                Some(rest) => InputKind::Custom(rest.to_string()),
                None => InputKind::Custom(other.to_string()),
            },
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(name) => write!(f, "{name}"),
            other => write!(f, "{}", other.encode()),
        }
    }
}

impl From<&str> for InputKind {
    fn from(s: &str) -> Self {
        InputKind::decode(s)
    }
}

/// Lifecycle status of a whole workflow.
///
/// `Completed` is only ever set by an explicit user action on the final
/// wizard step; it is never inferred from artifact states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Freshly created, nothing generated yet.
    Draft,
    /// At least one artifact has been generated or is being generated.
    InProgress,
    /// The user has reached the review step.
    Review,
    /// Explicitly completed by the user on the final step.
    Completed,
    /// Archived; read-only from the wizard's point of view.
    Archived,
}

impl WorkflowStatus {
    /// Stable lowercase string form used in persisted records.
    #[must_use]
    pub fn encode(&self) -> &'static str {
        match self {
            WorkflowStatus::Draft => "draft",
            WorkflowStatus::InProgress => "in_progress",
            WorkflowStatus::Review => "review",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Archived => "archived",
        }
    }

    /// Decode a persisted string; unknown values fall back to `Draft`.
    pub fn decode(s: &str) -> Self {
        match s {
            "in_progress" => WorkflowStatus::InProgress,
            "review" => WorkflowStatus::Review,
            "completed" => WorkflowStatus::Completed,
            "archived" => WorkflowStatus::Archived,
            _ => WorkflowStatus::Draft,
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

/// Coarse generation status of a single artifact.
///
/// This is the projection used by step predicates and UI gating; the full
/// state (payload, timestamps, error detail) lives in
/// [`ArtifactState`](crate::artifact::ArtifactState).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    /// No current content; cleared or never generated.
    Absent,
    /// A generation has been requested but not acknowledged yet.
    Pending,
    /// The generation service is working on it.
    Processing,
    /// Content is current and presentable.
    Completed,
    /// The last generation failed; error detail is attached.
    Failed,
}

impl ArtifactStatus {
    /// Stable lowercase string form used in persisted records.
    #[must_use]
    pub fn encode(&self) -> &'static str {
        match self {
            ArtifactStatus::Absent => "absent",
            ArtifactStatus::Pending => "pending",
            ArtifactStatus::Processing => "processing",
            ArtifactStatus::Completed => "completed",
            ArtifactStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ArtifactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_kind_roundtrip() {
        for kind in ArtifactKind::BUILT_IN {
            assert_eq!(ArtifactKind::decode(&kind.encode()), kind);
        }
        let custom = ArtifactKind::Custom("Sidebar".to_string());
        assert_eq!(ArtifactKind::decode(&custom.encode()), custom);
    }

    #[test]
    fn unknown_artifact_encoding_becomes_custom() {
        assert_eq!(
            ArtifactKind::decode("SomethingNew"),
            ArtifactKind::Custom("SomethingNew".to_string())
        );
    }

    #[test]
    fn input_kind_roundtrip() {
        let inputs = [
            InputKind::SourceDocument,
            InputKind::EvaluationSelection,
            InputKind::RetrievalQuery,
            InputKind::Custom("Brief".to_string()),
        ];
        for input in inputs {
            assert_eq!(InputKind::decode(&input.encode()), input);
        }
    }

    #[test]
    fn workflow_status_roundtrip() {
        for status in [
            WorkflowStatus::Draft,
            WorkflowStatus::InProgress,
            WorkflowStatus::Review,
            WorkflowStatus::Completed,
            WorkflowStatus::Archived,
        ] {
            assert_eq!(WorkflowStatus::decode(status.encode()), status);
        }
    }
}
