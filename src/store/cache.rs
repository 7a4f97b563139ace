//! Process-local, non-durable artifact cache.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::artifact::ArtifactRecord;
use crate::types::ArtifactKind;
use crate::workflow::WorkflowId;

/// Volatile key/value cache keyed by workflow id and artifact kind.
///
/// Lets the UI show optimistic state before the durable store responds and
/// retains generated payloads across store outages. Cloning is cheap and
/// shares the underlying map.
#[derive(Clone, Default)]
pub struct ClientCache {
    entries: std::sync::Arc<RwLock<FxHashMap<(WorkflowId, ArtifactKind), ArtifactRecord>>>,
}

impl ClientCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, workflow_id: &str, artifact: &ArtifactKind) -> Option<ArtifactRecord> {
        self.entries
            .read()
            .get(&(workflow_id.to_string(), artifact.clone()))
            .cloned()
    }

    pub fn put(&self, workflow_id: &str, artifact: &ArtifactKind, record: ArtifactRecord) {
        self.entries
            .write()
            .insert((workflow_id.to_string(), artifact.clone()), record);
    }

    /// Remove one entry; returns the removed record, if any.
    pub fn remove(&self, workflow_id: &str, artifact: &ArtifactKind) -> Option<ArtifactRecord> {
        self.entries
            .write()
            .remove(&(workflow_id.to_string(), artifact.clone()))
    }

    /// Drop every entry for one workflow.
    pub fn remove_workflow(&self, workflow_id: &str) {
        self.entries
            .write()
            .retain(|(id, _), _| id != workflow_id);
    }

    /// Every cached entry for one workflow.
    #[must_use]
    pub fn entries_for(&self, workflow_id: &str) -> Vec<(ArtifactKind, ArtifactRecord)> {
        self.entries
            .read()
            .iter()
            .filter(|((id, _), _)| id == workflow_id)
            .map(|((_, kind), record)| (kind.clone(), record.clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
