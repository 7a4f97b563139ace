//! Volatile in-memory store backend for testing and development.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::{ArtifactStore, StoreError};
use crate::artifact::ArtifactRecord;
use crate::types::ArtifactKind;
use crate::workflow::{Workflow, WorkflowSummary};

/// In-memory [`ArtifactStore`] holding full workflow records.
///
/// Cloning shares the underlying map, which makes it convenient to hand the
/// same backend to a repository and assert against it from a test.
#[derive(Clone, Default)]
pub struct InMemoryArtifactStore {
    workflows: Arc<Mutex<FxHashMap<String, Workflow>>>,
}

impl InMemoryArtifactStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored workflows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.workflows.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workflows.lock().is_empty()
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn load(&self, workflow_id: &str) -> Result<Option<Workflow>, StoreError> {
        Ok(self.workflows.lock().get(workflow_id).cloned())
    }

    async fn save(&self, workflow: &Workflow) -> Result<(), StoreError> {
        self.workflows
            .lock()
            .insert(workflow.id.clone(), workflow.clone());
        Ok(())
    }

    async fn get(
        &self,
        workflow_id: &str,
        artifact: &ArtifactKind,
    ) -> Result<Option<ArtifactRecord>, StoreError> {
        Ok(self
            .workflows
            .lock()
            .get(workflow_id)
            .and_then(|workflow| workflow.artifacts.get(artifact).cloned()))
    }

    async fn put(
        &self,
        workflow_id: &str,
        artifact: &ArtifactKind,
        record: &ArtifactRecord,
    ) -> Result<(), StoreError> {
        let mut workflows = self.workflows.lock();
        let workflow = workflows
            .get_mut(workflow_id)
            .ok_or_else(|| StoreError::WorkflowMissing {
                workflow_id: workflow_id.to_string(),
            })?;
        workflow
            .artifacts
            .insert(artifact.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, workflow_id: &str, artifact: &ArtifactKind) -> Result<(), StoreError> {
        if let Some(workflow) = self.workflows.lock().get_mut(workflow_id) {
            workflow.artifacts.remove(artifact);
        }
        Ok(())
    }

    async fn query_by_owner(&self, owner_id: &str) -> Result<Vec<WorkflowSummary>, StoreError> {
        let mut summaries: Vec<WorkflowSummary> = self
            .workflows
            .lock()
            .values()
            .filter(|workflow| workflow.owner == owner_id)
            .map(Workflow::summary)
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }
}
