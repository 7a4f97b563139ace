//! Artifact storage: durable store adapter, client cache, and the
//! write-through repository.
//!
//! The durable side is abstracted behind the [`ArtifactStore`] trait (the
//! storage engine itself is an external collaborator; this crate only
//! speaks its item-level get/put/delete interface). Two backends ship:
//!
//! - [`InMemoryArtifactStore`] — volatile, for tests and development
//! - [`SqliteArtifactStore`] — durable SQLite persistence (feature `sqlite`)
//!
//! On top of both sits the [`ArtifactRepository`]: a [`ClientCache`] and a
//! durable store composed via a write-through strategy, so call sites never
//! dual-write by hand. A durable write that keeps failing is *retained* in
//! the cache and queued for [`ArtifactRepository::flush_pending`] — a
//! generated payload is never discarded because the store was down.

mod cache;
mod memory;
pub mod persistence;
mod repository;

#[cfg(feature = "sqlite")]
mod sqlite;

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

pub use cache::ClientCache;
pub use memory::InMemoryArtifactStore;
pub use repository::{ArtifactRepository, WriteOutcome};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteArtifactStore;

use crate::artifact::ArtifactRecord;
use crate::types::ArtifactKind;
use crate::workflow::{Workflow, WorkflowSummary};

/// Errors surfaced by durable store backends.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    /// The backend could not be reached or the operation failed.
    #[error("store unavailable: {message}")]
    #[diagnostic(
        code(draftloom::store::unavailable),
        help("The durable store is unreachable; cached artifact state is retained until a write succeeds.")
    )]
    Unavailable { message: String },

    /// A persisted record could not be (de)serialized.
    #[error("store serialization failed: {source}")]
    #[diagnostic(code(draftloom::store::serde))]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    /// An artifact operation referenced a workflow that does not exist.
    #[error("workflow not found: {workflow_id}")]
    #[diagnostic(
        code(draftloom::store::workflow_missing),
        help("Create and save the workflow before writing artifacts to it.")
    )]
    WorkflowMissing { workflow_id: String },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        StoreError::Unavailable {
            message: message.into(),
        }
    }
}

/// Thin interface over the durable per-workflow record.
///
/// Implementations are item-level: a whole workflow record can be loaded and
/// saved, and single artifact entries read, overwritten, or deleted by name.
/// There are no partial-field merge semantics; the last writer for an
/// artifact name wins.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Load a full workflow record.
    async fn load(&self, workflow_id: &str) -> Result<Option<Workflow>, StoreError>;

    /// Insert or overwrite a full workflow record.
    async fn save(&self, workflow: &Workflow) -> Result<(), StoreError>;

    /// Read one artifact entry.
    async fn get(
        &self,
        workflow_id: &str,
        artifact: &ArtifactKind,
    ) -> Result<Option<ArtifactRecord>, StoreError>;

    /// Insert or overwrite one artifact entry. The workflow must exist.
    async fn put(
        &self,
        workflow_id: &str,
        artifact: &ArtifactKind,
        record: &ArtifactRecord,
    ) -> Result<(), StoreError>;

    /// Remove one artifact entry. Removing a missing entry is not an error.
    async fn delete(&self, workflow_id: &str, artifact: &ArtifactKind) -> Result<(), StoreError>;

    /// Summaries of every workflow owned by `owner_id`.
    async fn query_by_owner(&self, owner_id: &str) -> Result<Vec<WorkflowSummary>, StoreError>;
}
