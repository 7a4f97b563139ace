//! Write-through repository composing the client cache and the durable
//! store.
//!
//! Every artifact write lands in the cache synchronously and is then pushed
//! to the durable store with a bounded, jittered retry. If the store stays
//! unavailable the write is *retained*: the cache keeps serving the current
//! payload and the key joins a pending queue that
//! [`ArtifactRepository::flush_pending`] retries later. A costly generation
//! result is therefore never lost to a store outage.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future;
use parking_lot::Mutex;
use rand::Rng;
use rustc_hash::FxHashSet;
use tracing::{instrument, warn};

use super::{ArtifactStore, ClientCache, StoreError};
use crate::artifact::ArtifactRecord;
use crate::types::ArtifactKind;
use crate::workflow::{Workflow, WorkflowId, WorkflowSummary};

const BASE_BACKOFF_MS: u64 = 50;
const MAX_JITTER_MS: u64 = 25;

/// How an artifact write ended up.
#[derive(Debug)]
pub enum WriteOutcome {
    /// The durable store accepted the write.
    Durable,
    /// The durable write failed; the record is retained in the cache and
    /// queued for a later [`ArtifactRepository::flush_pending`].
    Retained { error: StoreError },
}

impl WriteOutcome {
    #[must_use]
    pub fn is_durable(&self) -> bool {
        matches!(self, WriteOutcome::Durable)
    }
}

/// Single entry point for artifact reads and writes.
///
/// Reads prefer the cache and fall back to the store; writes go through the
/// cache into the store. Whole-workflow saves bypass the cache (the caller
/// keeps its in-memory copy) but share the same retry policy.
pub struct ArtifactRepository {
    cache: ClientCache,
    store: Arc<dyn ArtifactStore>,
    write_retries: u32,
    pending: Mutex<FxHashSet<(WorkflowId, ArtifactKind)>>,
}

impl ArtifactRepository {
    #[must_use]
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            cache: ClientCache::new(),
            store,
            write_retries: 3,
            pending: Mutex::new(FxHashSet::default()),
        }
    }

    #[must_use]
    pub fn with_write_retries(mut self, retries: u32) -> Self {
        self.write_retries = retries.max(1);
        self
    }

    #[must_use]
    pub fn cache(&self) -> &ClientCache {
        &self.cache
    }

    /// Load a workflow from the store and overlay any cached artifact
    /// entries (cache entries are newer: they may include writes the store
    /// has not accepted yet).
    #[instrument(skip(self), err)]
    pub async fn load_workflow(&self, workflow_id: &str) -> Result<Option<Workflow>, StoreError> {
        let Some(mut workflow) = self.store.load(workflow_id).await? else {
            return Ok(None);
        };
        for (kind, record) in self.cache.entries_for(workflow_id) {
            workflow.artifacts.insert(kind, record);
        }
        Ok(Some(workflow))
    }

    /// Save a whole workflow record, retrying transient store failures.
    #[instrument(skip(self, workflow), fields(workflow_id = %workflow.id), err)]
    pub async fn save_workflow(&self, workflow: &Workflow) -> Result<(), StoreError> {
        let mut last_error: Option<StoreError> = None;
        for attempt in 0..self.write_retries {
            match self.store.save(workflow).await {
                Ok(()) => return Ok(()),
                Err(error @ StoreError::Unavailable { .. }) => {
                    last_error = Some(error);
                    tokio::time::sleep(backoff_delay(attempt)).await;
                }
                Err(error) => return Err(error),
            }
        }
        Err(last_error.unwrap_or_else(|| StoreError::unavailable("save retries exhausted")))
    }

    /// Read one artifact, cache first.
    pub async fn get(
        &self,
        workflow_id: &str,
        artifact: &ArtifactKind,
    ) -> Result<Option<ArtifactRecord>, StoreError> {
        if let Some(record) = self.cache.get(workflow_id, artifact) {
            return Ok(Some(record));
        }
        let record = self.store.get(workflow_id, artifact).await?;
        if let Some(record) = &record {
            self.cache.put(workflow_id, artifact, record.clone());
        }
        Ok(record)
    }

    /// Write one artifact through the cache into the store.
    ///
    /// The cache write is unconditional; the durable write is retried with
    /// jittered backoff and, if it keeps failing, retained for
    /// [`flush_pending`](Self::flush_pending).
    #[instrument(skip(self, record), fields(artifact = %artifact))]
    pub async fn put(
        &self,
        workflow_id: &str,
        artifact: &ArtifactKind,
        record: ArtifactRecord,
    ) -> WriteOutcome {
        self.cache.put(workflow_id, artifact, record.clone());

        let mut last_error: Option<StoreError> = None;
        for attempt in 0..self.write_retries {
            match self.store.put(workflow_id, artifact, &record).await {
                Ok(()) => {
                    self.pending
                        .lock()
                        .remove(&(workflow_id.to_string(), artifact.clone()));
                    return WriteOutcome::Durable;
                }
                Err(error @ StoreError::Unavailable { .. }) => {
                    last_error = Some(error);
                    tokio::time::sleep(backoff_delay(attempt)).await;
                }
                Err(error) => {
                    last_error = Some(error);
                    break;
                }
            }
        }

        let error =
            last_error.unwrap_or_else(|| StoreError::unavailable("put retries exhausted"));
        warn!(%workflow_id, %artifact, %error, "durable write failed; retaining in cache");
        self.pending
            .lock()
            .insert((workflow_id.to_string(), artifact.clone()));
        WriteOutcome::Retained { error }
    }

    /// Clear one artifact: remove it from the cache and issue a best-effort
    /// delete against the store. A failed delete is queued so the flush pass
    /// retries it.
    #[instrument(skip(self), fields(artifact = %artifact))]
    pub async fn clear(&self, workflow_id: &str, artifact: &ArtifactKind) {
        self.cache.remove(workflow_id, artifact);
        if let Err(error) = self.store.delete(workflow_id, artifact).await {
            warn!(%workflow_id, %artifact, %error, "store delete failed; queuing for flush");
            self.pending
                .lock()
                .insert((workflow_id.to_string(), artifact.clone()));
        }
    }

    /// Retry every retained write/delete once, concurrently. Returns the
    /// number of keys that reached the store; keys that fail again stay
    /// queued.
    #[instrument(skip(self))]
    pub async fn flush_pending(&self) -> usize {
        let keys: Vec<(WorkflowId, ArtifactKind)> =
            self.pending.lock().iter().cloned().collect();
        let attempts = keys.into_iter().map(|(workflow_id, artifact)| async move {
            let result = match self.cache.get(&workflow_id, &artifact) {
                Some(record) => self.store.put(&workflow_id, &artifact, &record).await,
                // Cleared while queued: the retained operation is a delete.
                None => self.store.delete(&workflow_id, &artifact).await,
            };
            ((workflow_id, artifact), result)
        });
        let mut flushed = 0;
        for (key, result) in future::join_all(attempts).await {
            match result {
                Ok(()) => {
                    self.pending.lock().remove(&key);
                    flushed += 1;
                }
                Err(error) => {
                    warn!(workflow_id = %key.0, artifact = %key.1, %error, "flush attempt failed; keeping queued");
                }
            }
        }
        flushed
    }

    /// Number of keys whose durable write is still outstanding.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Workflow summaries for `owner_id`, straight from the store.
    pub async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<WorkflowSummary>, StoreError> {
        self.store.query_by_owner(owner_id).await
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let jitter = rand::rng().random_range(0..=MAX_JITTER_MS);
    Duration::from_millis(BASE_BACKOFF_MS * 2u64.saturating_pow(attempt) + jitter)
}
