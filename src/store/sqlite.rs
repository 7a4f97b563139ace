/*!
SQLite Artifact Store

This module provides the `SqliteArtifactStore` async implementation of the
`ArtifactStore` trait defined in `store/mod.rs`.

## Behavior

- Uses serde-based persistence models (see `store::persistence`) for
  encoding workflow records; the artifact map is stored as one JSON
  document per workflow, matching the item-level get/put/delete contract.
- When the `sqlite-migrations` feature is enabled (default), embedded
  migrations (`sqlx::migrate!("./migrations")`) are executed on connect;
  disabling the feature assumes external migration orchestration.

## Design Goals

- Keep this module focused on database I/O; pure serialization lives in
  the persistence module.
- Artifact-level writes are read-modify-write inside a transaction so two
  writers for different artifacts of the same workflow cannot lose each
  other's entries.

## Database Schema

- `workflows.id` ← `workflow.id`
- `workflows.owner` ← `workflow.owner` (indexed for `query_by_owner`)
- `workflows.code` / `status` / `current_step` / `created_at` — listing
  columns, denormalized from the record
- `workflows.record_json` ← serialized `PersistedWorkflow`
*/

use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::instrument;

use super::{ArtifactStore, StoreError};
use crate::artifact::ArtifactRecord;
use crate::store::persistence::{PersistedArtifact, PersistedWorkflow};
use crate::types::{ArtifactKind, WorkflowStatus};
use crate::workflow::{Workflow, WorkflowSummary};

/// SQLite-backed [`ArtifactStore`].
///
/// One row per workflow; the artifact map lives in `record_json` and the
/// columns used by listings are denormalized beside it.
pub struct SqliteArtifactStore {
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteArtifactStore").finish()
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        StoreError::unavailable(error.to_string())
    }
}

impl SqliteArtifactStore {
    /// Connect (or create) a SQLite database at `database_url`.
    /// Example URL: `sqlite://draftloom.db?mode=rwc`
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePool::connect(database_url)
            .await
            .map_err(|e| StoreError::unavailable(format!("connect error: {e}")))?;
        #[cfg(feature = "sqlite-migrations")]
        {
            if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
                return Err(StoreError::unavailable(format!("migration failure: {e}")));
            }
        }
        Ok(Self { pool })
    }

    async fn load_persisted(&self, workflow_id: &str) -> Result<Option<PersistedWorkflow>, StoreError> {
        let row = sqlx::query("SELECT record_json FROM workflows WHERE id = ?1")
            .bind(workflow_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let record_json: String = row.try_get("record_json")?;
        let persisted: PersistedWorkflow = serde_json::from_str(&record_json)?;
        Ok(Some(persisted))
    }

    async fn save_persisted(&self, persisted: &PersistedWorkflow) -> Result<(), StoreError> {
        let record_json = serde_json::to_string(persisted)?;
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO workflows (
                id, owner, code, status, current_step, created_at, record_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&persisted.id)
        .bind(&persisted.owner)
        .bind(&persisted.code)
        .bind(&persisted.status)
        .bind(persisted.current_step as i64)
        .bind(&persisted.created_at)
        .bind(&record_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ArtifactStore for SqliteArtifactStore {
    #[instrument(skip(self), err)]
    async fn load(&self, workflow_id: &str) -> Result<Option<Workflow>, StoreError> {
        Ok(self.load_persisted(workflow_id).await?.map(Workflow::from))
    }

    #[instrument(skip(self, workflow), fields(workflow_id = %workflow.id), err)]
    async fn save(&self, workflow: &Workflow) -> Result<(), StoreError> {
        self.save_persisted(&PersistedWorkflow::from(workflow)).await
    }

    async fn get(
        &self,
        workflow_id: &str,
        artifact: &ArtifactKind,
    ) -> Result<Option<ArtifactRecord>, StoreError> {
        let Some(persisted) = self.load_persisted(workflow_id).await? else {
            return Ok(None);
        };
        Ok(persisted
            .artifacts
            .get(&artifact.encode())
            .cloned()
            .map(ArtifactRecord::from))
    }

    #[instrument(skip(self, record), fields(artifact = %artifact), err)]
    async fn put(
        &self,
        workflow_id: &str,
        artifact: &ArtifactKind,
        record: &ArtifactRecord,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT record_json FROM workflows WHERE id = ?1")
            .bind(workflow_id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Err(StoreError::WorkflowMissing {
                workflow_id: workflow_id.to_string(),
            });
        };
        let record_json: String = row.try_get("record_json")?;
        let mut persisted: PersistedWorkflow = serde_json::from_str(&record_json)?;
        persisted
            .artifacts
            .insert(artifact.encode(), PersistedArtifact::from(record));
        let updated_json = serde_json::to_string(&persisted)?;
        sqlx::query("UPDATE workflows SET record_json = ?2 WHERE id = ?1")
            .bind(workflow_id)
            .bind(&updated_json)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self), fields(artifact = %artifact), err)]
    async fn delete(&self, workflow_id: &str, artifact: &ArtifactKind) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT record_json FROM workflows WHERE id = ?1")
            .bind(workflow_id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            // Nothing to remove.
            return Ok(());
        };
        let record_json: String = row.try_get("record_json")?;
        let mut persisted: PersistedWorkflow = serde_json::from_str(&record_json)?;
        if persisted.artifacts.remove(&artifact.encode()).is_some() {
            let updated_json = serde_json::to_string(&persisted)?;
            sqlx::query("UPDATE workflows SET record_json = ?2 WHERE id = ?1")
                .bind(workflow_id)
                .bind(&updated_json)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn query_by_owner(&self, owner_id: &str) -> Result<Vec<WorkflowSummary>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner, code, status, current_step, created_at
            FROM workflows
            WHERE owner = ?1
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let current_step: i64 = row.try_get("current_step")?;
            let status: String = row.try_get("status")?;
            let created_at: String = row.try_get("created_at")?;
            summaries.push(WorkflowSummary {
                id: row.try_get("id")?,
                owner: row.try_get("owner")?,
                code: row.try_get("code")?,
                status: WorkflowStatus::decode(&status),
                current_step: current_step as usize,
                created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
                    .map(|dt| dt.with_timezone(&chrono::Utc))
                    .unwrap_or_else(|_| chrono::Utc::now()),
            });
        }
        Ok(summaries)
    }
}
