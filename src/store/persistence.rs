/*!
Persistence primitives for serializing/deserializing workflow records
(used by the SQLite store and any future durable backends).

Design Goals:
- Provide explicit serde-friendly structs decoupled from internal
  in-memory representations.
- Keep conversion logic localized (From / TryFrom impls) so backend code
  is lean and declarative.
- Allow forward compatibility (unknown artifact kind encodings round-trip
  as `ArtifactKind::Custom(encoded_string)`, unknown statuses degrade to
  `absent`).

This module intentionally does NOT perform I/O. It is pure data
transformation and (de)serialization glue.

The persisted workflow shape is:

```json
{
  "id": "…",
  "code": "DW-K4T7QZ",
  "owner": "user-1",
  "status": "in_progress",
  "current_step": 2,
  "created_at": "2026-07-01T10:30:00Z",
  "artifacts": {
    "Structure": {
      "status": "completed",
      "payload": {"items": []},
      "inputs": {"selections": [], "comments": {}, "custom_items": []},
      "generated_at": "2026-07-01T10:31:00Z",
      "error": null
    }
  }
}
```
*/

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::artifact::{ArtifactInputs, ArtifactRecord, ArtifactState};
use crate::types::{ArtifactKind, WorkflowStatus};
use crate::workflow::Workflow;

/// Persisted shape of one artifact entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedArtifact {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default)]
    pub inputs: ArtifactInputs,
    /// RFC3339 timestamp of the state transition that produced this entry
    /// (generation time for `completed`, failure time for `failed`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Active sub-stage label while `processing`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default)]
    pub is_custom: bool,
}

/// Complete persisted shape of one workflow record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedWorkflow {
    pub id: String,
    pub code: String,
    pub owner: String,
    pub status: String,
    pub current_step: usize,
    /// RFC3339 string form of creation time.
    pub created_at: String,
    /// Artifact entries keyed by encoded [`ArtifactKind`].
    #[serde(default)]
    pub artifacts: FxHashMap<String, PersistedArtifact>,
}

fn parse_rfc3339(value: Option<&str>) -> DateTime<Utc> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map_or_else(Utc::now, |dt| dt.with_timezone(&Utc))
}

/* ---------- ArtifactRecord <-> PersistedArtifact ---------- */

impl From<&ArtifactRecord> for PersistedArtifact {
    fn from(record: &ArtifactRecord) -> Self {
        let (payload, generated_at, error, stage) = match &record.state {
            ArtifactState::Absent | ArtifactState::Pending => (None, None, None, None),
            ArtifactState::Processing { stage } => (None, None, None, stage.clone()),
            ArtifactState::Completed {
                payload,
                generated_at,
            } => (
                Some(payload.clone()),
                Some(generated_at.to_rfc3339()),
                None,
                None,
            ),
            ArtifactState::Failed { error, failed_at } => (
                None,
                Some(failed_at.to_rfc3339()),
                Some(error.clone()),
                None,
            ),
        };
        PersistedArtifact {
            status: record.state.status().encode().to_string(),
            payload,
            inputs: record.inputs.clone(),
            generated_at,
            error,
            stage,
            is_custom: record.is_custom,
        }
    }
}

impl From<PersistedArtifact> for ArtifactRecord {
    fn from(persisted: PersistedArtifact) -> Self {
        let state = match persisted.status.as_str() {
            "pending" => ArtifactState::Pending,
            "processing" => ArtifactState::Processing {
                stage: persisted.stage,
            },
            "completed" => match persisted.payload {
                Some(payload) => ArtifactState::Completed {
                    payload,
                    generated_at: parse_rfc3339(persisted.generated_at.as_deref()),
                },
                // A completed entry without a payload is not presentable.
                None => ArtifactState::Absent,
            },
            "failed" => ArtifactState::Failed {
                error: persisted.error.unwrap_or_default(),
                failed_at: parse_rfc3339(persisted.generated_at.as_deref()),
            },
            _ => ArtifactState::Absent,
        };
        ArtifactRecord {
            state,
            inputs: persisted.inputs,
            is_custom: persisted.is_custom,
        }
    }
}

/* ---------- Workflow <-> PersistedWorkflow ---------- */

impl From<&Workflow> for PersistedWorkflow {
    fn from(workflow: &Workflow) -> Self {
        PersistedWorkflow {
            id: workflow.id.clone(),
            code: workflow.code.clone(),
            owner: workflow.owner.clone(),
            status: workflow.status.encode().to_string(),
            current_step: workflow.current_step,
            created_at: workflow.created_at.to_rfc3339(),
            artifacts: workflow
                .artifacts
                .iter()
                .map(|(kind, record)| (kind.encode(), PersistedArtifact::from(record)))
                .collect(),
        }
    }
}

impl From<PersistedWorkflow> for Workflow {
    fn from(persisted: PersistedWorkflow) -> Self {
        Workflow {
            id: persisted.id,
            code: persisted.code,
            owner: persisted.owner,
            status: WorkflowStatus::decode(&persisted.status),
            current_step: persisted.current_step,
            created_at: parse_rfc3339(Some(persisted.created_at.as_str())),
            artifacts: persisted
                .artifacts
                .into_iter()
                .map(|(key, artifact)| (ArtifactKind::decode(&key), ArtifactRecord::from(artifact)))
                .collect(),
        }
    }
}
