//! Artifact lifecycle state and user-editable inputs.
//!
//! An artifact is a named unit of generated or user-entered content attached
//! to a workflow. Its generation lifecycle is a tagged-variant state enum
//! ([`ArtifactState`]) so that payloads, timestamps, and error detail can
//! never drift apart from the status that implies them. The user-editable
//! side (selections, comments, custom outline items) lives in
//! [`ArtifactInputs`] and survives invalidation: clearing an artifact resets
//! its state, never its inputs.
//!
//! # Examples
//!
//! ```rust
//! use draftloom::artifact::{ArtifactRecord, ArtifactState};
//! use draftloom::types::ArtifactStatus;
//! use serde_json::json;
//!
//! let mut record = ArtifactRecord::absent();
//! assert_eq!(record.status(), ArtifactStatus::Absent);
//!
//! record.state = ArtifactState::completed(json!({"summary": "ok"}));
//! assert_eq!(record.status(), ArtifactStatus::Completed);
//!
//! // Clearing drops the payload but keeps the user's inputs.
//! record.inputs.selections.push("sec-1".to_string());
//! record.clear();
//! assert_eq!(record.status(), ArtifactStatus::Absent);
//! assert_eq!(record.inputs.selections, vec!["sec-1".to_string()]);
//! ```

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::types::ArtifactStatus;

// ============================================================================
// Lifecycle State
// ============================================================================

/// Generation lifecycle of one artifact.
///
/// The variants carry the data that only exists in that phase: a payload and
/// timestamp exist only once `Completed`, error detail only once `Failed`,
/// and the active sub-stage label only while `Processing`. Projecting to the
/// coarse [`ArtifactStatus`] is lossless in the status direction.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum ArtifactState {
    /// No current content; cleared or never generated.
    #[default]
    Absent,
    /// A generation was requested and is awaiting service acknowledgment.
    Pending,
    /// The generation service is working; `stage` names the active sub-stage
    /// of a multi-stage generation, if any.
    Processing { stage: Option<String> },
    /// Content is current.
    Completed {
        payload: Value,
        generated_at: DateTime<Utc>,
    },
    /// The last generation failed; the artifact is retryable.
    Failed {
        error: String,
        failed_at: DateTime<Utc>,
    },
}

impl ArtifactState {
    /// A freshly completed state stamped with the current time.
    #[must_use]
    pub fn completed(payload: Value) -> Self {
        ArtifactState::Completed {
            payload,
            generated_at: Utc::now(),
        }
    }

    /// A failed state stamped with the current time.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        ArtifactState::Failed {
            error: error.into(),
            failed_at: Utc::now(),
        }
    }

    /// A processing state without a named sub-stage.
    #[must_use]
    pub fn processing() -> Self {
        ArtifactState::Processing { stage: None }
    }

    /// Project to the coarse status used by step predicates and UI gating.
    #[must_use]
    pub fn status(&self) -> ArtifactStatus {
        match self {
            ArtifactState::Absent => ArtifactStatus::Absent,
            ArtifactState::Pending => ArtifactStatus::Pending,
            ArtifactState::Processing { .. } => ArtifactStatus::Processing,
            ArtifactState::Completed { .. } => ArtifactStatus::Completed,
            ArtifactState::Failed { .. } => ArtifactStatus::Failed,
        }
    }

    /// The completed payload, if any.
    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        match self {
            ArtifactState::Completed { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// The error detail of a failed generation, if any.
    #[must_use]
    pub fn error_detail(&self) -> Option<&str> {
        match self {
            ArtifactState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, ArtifactState::Completed { .. })
    }

    #[must_use]
    pub fn is_processing(&self) -> bool {
        matches!(self, ArtifactState::Processing { .. })
    }
}

// ============================================================================
// User-Editable Inputs
// ============================================================================

/// An outline item within the structure artifact.
///
/// The `id` is the stable identity used when re-attaching user-authored
/// items after their parent artifact is regenerated; positional indexes are
/// never used for that.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutlineItem {
    pub id: Uuid,
    pub heading: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub is_custom: bool,
}

impl OutlineItem {
    /// A user-authored item, exempt from automatic clearing.
    #[must_use]
    pub fn custom(heading: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            heading: heading.into(),
            summary: None,
            is_custom: true,
        }
    }

    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

/// Selection and comment inputs attached to an artifact.
///
/// These are part of the artifact's identity for invalidation purposes:
/// editing them invalidates downstream artifacts. They are preserved across
/// clearing so the user never re-enters them after regeneration.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct ArtifactInputs {
    /// Identifiers of the sub-sections the user selected for inclusion.
    #[serde(default)]
    pub selections: Vec<String>,
    /// Free-text notes keyed by the sub-section they annotate.
    #[serde(default)]
    pub comments: FxHashMap<String, String>,
    /// User-authored outline items, re-attached by stable id after the
    /// parent structure is regenerated.
    #[serde(default)]
    pub custom_items: Vec<OutlineItem>,
}

impl ArtifactInputs {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selections.is_empty() && self.comments.is_empty() && self.custom_items.is_empty()
    }
}

/// A partial edit to an artifact's inputs.
///
/// Fields left as `None` are untouched; supplied fields replace the
/// corresponding input wholesale (inputs are overwrite-by-key, mirroring the
/// cache/store write semantics).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputsPatch {
    pub selections: Option<Vec<String>>,
    pub comments: Option<FxHashMap<String, String>>,
    pub custom_items: Option<Vec<OutlineItem>>,
}

impl InputsPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_selections(mut self, selections: Vec<String>) -> Self {
        self.selections = Some(selections);
        self
    }

    #[must_use]
    pub fn with_comment(mut self, key: impl Into<String>, note: impl Into<String>) -> Self {
        self.comments
            .get_or_insert_with(FxHashMap::default)
            .insert(key.into(), note.into());
        self
    }

    #[must_use]
    pub fn with_custom_items(mut self, items: Vec<OutlineItem>) -> Self {
        self.custom_items = Some(items);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selections.is_none() && self.comments.is_none() && self.custom_items.is_none()
    }

    /// Apply this patch to a set of inputs.
    pub fn apply(&self, inputs: &mut ArtifactInputs) {
        if let Some(selections) = &self.selections {
            inputs.selections = selections.clone();
        }
        if let Some(comments) = &self.comments {
            inputs.comments = comments.clone();
        }
        if let Some(items) = &self.custom_items {
            inputs.custom_items = items.clone();
        }
    }
}

// ============================================================================
// Record
// ============================================================================

/// One artifact entry in a workflow: lifecycle state plus user inputs.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ArtifactRecord {
    pub state: ArtifactState,
    pub inputs: ArtifactInputs,
    /// User-authored artifact not derived from upstream; exempt from
    /// automatic clearing.
    pub is_custom: bool,
}

impl ArtifactRecord {
    /// An empty record with no content and no inputs.
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }

    /// Coarse status projection of the lifecycle state.
    #[must_use]
    pub fn status(&self) -> ArtifactStatus {
        self.state.status()
    }

    /// Reset the lifecycle state to `Absent`, keeping inputs intact.
    pub fn clear(&mut self) {
        self.state = ArtifactState::Absent;
    }
}

/// Merge user-authored outline items into a freshly generated structure
/// payload, keyed by stable item id.
///
/// The payload is expected to be an object with an `items` array (each item
/// an object with at least an `id`). Custom items already present in the
/// generated payload keep their generated position; missing ones are
/// appended. A payload without an `items` array gains one.
pub fn reattach_custom_items(payload: &mut Value, custom_items: &[OutlineItem]) {
    if custom_items.is_empty() {
        return;
    }
    let Some(obj) = payload.as_object_mut() else {
        return;
    };
    let items = obj
        .entry("items".to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    let Some(items) = items.as_array_mut() else {
        return;
    };
    for custom in custom_items {
        let id = custom.id.to_string();
        let already_present = items
            .iter()
            .any(|item| item.get("id").and_then(Value::as_str) == Some(id.as_str()));
        if !already_present {
            match serde_json::to_value(custom) {
                Ok(value) => items.push(value),
                Err(error) => {
                    tracing::warn!(%error, item = %custom.heading, "skipping unserializable custom item");
                }
            }
        }
    }
}
