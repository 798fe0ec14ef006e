//! Postgres-backed datastore.
//!
//! Objects are stored one row per training job with spec/status/finalizers
//! as `jsonb`. Every write is guarded by the `resource_version` column:
//! `UPDATE ... WHERE resource_version = $expected` either lands atomically
//! or affects zero rows, which surfaces as [`StoreError::Conflict`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use lodestar_core::{ResourceKey, ResourceUid};

use super::{JobStore, StoreError, StoreResult};
use crate::object::{ObjectMeta, TrainingJob, TrainingJobStatus};

const SELECT_COLUMNS: &str = "namespace, name, uid, generation, resource_version, \
     deletion_timestamp, finalizers, spec, status";

/// Table schema, applied by [`PgJobStore::ensure_schema`].
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS training_jobs (
    namespace           TEXT NOT NULL,
    name                TEXT NOT NULL,
    uid                 UUID NOT NULL,
    generation          BIGINT NOT NULL DEFAULT 1,
    resource_version    BIGINT NOT NULL DEFAULT 1,
    deletion_timestamp  TIMESTAMPTZ,
    finalizers          JSONB NOT NULL DEFAULT '[]'::jsonb,
    spec                JSONB NOT NULL,
    status              JSONB NOT NULL DEFAULT '{}'::jsonb,
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (namespace, name)
)
";

#[derive(sqlx::FromRow)]
struct JobRow {
    namespace: String,
    name: String,
    uid: Uuid,
    generation: i64,
    resource_version: i64,
    deletion_timestamp: Option<DateTime<Utc>>,
    finalizers: serde_json::Value,
    spec: serde_json::Value,
    status: serde_json::Value,
}

impl JobRow {
    fn into_job(self) -> StoreResult<TrainingJob> {
        Ok(TrainingJob {
            metadata: ObjectMeta {
                namespace: self.namespace,
                name: self.name,
                uid: ResourceUid::from_uuid(self.uid),
                generation: self.generation,
                resource_version: self.resource_version,
                deletion_timestamp: self.deletion_timestamp,
                finalizers: serde_json::from_value(self.finalizers)?,
            },
            spec: serde_json::from_value(self.spec)?,
            status: serde_json::from_value(self.status)?,
        })
    }
}

/// Postgres [`JobStore`] implementation.
#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the backing table if it does not exist.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Seed a new object. Used by admission tooling and tests; the engine
    /// itself never inserts.
    pub async fn insert(&self, job: &TrainingJob) -> StoreResult<()> {
        sqlx::query(
            r"
            INSERT INTO training_jobs
                (namespace, name, uid, generation, resource_version,
                 deletion_timestamp, finalizers, spec, status)
            VALUES ($1, $2, $3, $4, GREATEST($5, 1), $6, $7, $8, $9)
            ",
        )
        .bind(&job.metadata.namespace)
        .bind(&job.metadata.name)
        .bind(job.metadata.uid.as_uuid())
        .bind(job.metadata.generation)
        .bind(job.metadata.resource_version)
        .bind(job.metadata.deletion_timestamp)
        .bind(serde_json::to_value(&job.metadata.finalizers)?)
        .bind(serde_json::to_value(&job.spec)?)
        .bind(serde_json::to_value(&job.status)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Distinguish a lost version race from a vanished object after a
    /// zero-row write.
    async fn stale_or_missing(&self, key: &ResourceKey, expected_version: i64) -> StoreError {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM training_jobs WHERE namespace = $1 AND name = $2)",
        )
        .bind(&key.namespace)
        .bind(&key.name)
        .fetch_one(&self.pool)
        .await;

        match exists {
            Ok(true) => StoreError::conflict(
                key.to_string(),
                format!("stale resource version {expected_version}"),
            ),
            Ok(false) => StoreError::not_found(key.to_string()),
            Err(e) => StoreError::Database(e),
        }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &ResourceKey) -> StoreResult<TrainingJob> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM training_jobs WHERE namespace = $1 AND name = $2"
        ))
        .bind(&key.namespace)
        .bind(&key.name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.into_job(),
            None => Err(StoreError::not_found(key.to_string())),
        }
    }

    #[instrument(skip(self, job), fields(job = %job.key()))]
    async fn update(&self, job: &TrainingJob) -> StoreResult<TrainingJob> {
        let key = job.key();
        let expected = job.metadata.resource_version;

        // Deletion completes once the finalizer set empties.
        if job.metadata.is_deleting() && job.metadata.finalizers.is_empty() {
            let result = sqlx::query(
                "DELETE FROM training_jobs \
                 WHERE namespace = $1 AND name = $2 AND resource_version = $3",
            )
            .bind(&key.namespace)
            .bind(&key.name)
            .bind(expected)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(self.stale_or_missing(&key, expected).await);
            }
            let mut removed = job.clone();
            removed.metadata.resource_version = expected + 1;
            return Ok(removed);
        }

        let row = sqlx::query_as::<_, JobRow>(&format!(
            "UPDATE training_jobs \
             SET spec = $3, \
                 finalizers = $4, \
                 deletion_timestamp = $5, \
                 generation = CASE WHEN spec = $3 THEN generation ELSE generation + 1 END, \
                 resource_version = resource_version + 1, \
                 updated_at = NOW() \
             WHERE namespace = $1 AND name = $2 AND resource_version = $6 \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(&key.namespace)
        .bind(&key.name)
        .bind(serde_json::to_value(&job.spec)?)
        .bind(serde_json::to_value(&job.metadata.finalizers)?)
        .bind(job.metadata.deletion_timestamp)
        .bind(expected)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.into_job(),
            None => Err(self.stale_or_missing(&key, expected).await),
        }
    }

    #[instrument(skip(self, job, status), fields(job = %job.key()))]
    async fn update_status(
        &self,
        job: &TrainingJob,
        status: &TrainingJobStatus,
    ) -> StoreResult<()> {
        let key = job.key();
        let expected = job.metadata.resource_version;

        let result = sqlx::query(
            "UPDATE training_jobs \
             SET status = $3, resource_version = resource_version + 1, updated_at = NOW() \
             WHERE namespace = $1 AND name = $2 AND resource_version = $4",
        )
        .bind(&key.namespace)
        .bind(&key.name)
        .bind(serde_json::to_value(status)?)
        .bind(expected)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.stale_or_missing(&key, expected).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{OutputLocation, TrainingJobSpec};

    fn sample_job() -> TrainingJob {
        TrainingJob {
            metadata: ObjectMeta {
                namespace: "team-a".to_string(),
                name: "mnist".to_string(),
                uid: ResourceUid::new(),
                generation: 1,
                resource_version: 1,
                deletion_timestamp: None,
                finalizers: vec![],
            },
            spec: TrainingJobSpec {
                job_name: None,
                region: "us-west-2".to_string(),
                endpoint: None,
                training_image: "registry.example.com/mnist:1".to_string(),
                instance_type: "gpu.xlarge".to_string(),
                instance_count: 1,
                max_runtime_secs: 3600,
                hyperparameters: Default::default(),
                output_location: OutputLocation {
                    base_path: "s3://bucket/prefix/".to_string(),
                },
            },
            status: TrainingJobStatus::default(),
        }
    }

    async fn test_pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        PgPool::connect(&url).await.expect("connect to Postgres")
    }

    // Requires a live Postgres; run with `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn test_round_trip() {
        let store = PgJobStore::new(test_pool().await);
        store.ensure_schema().await.unwrap();

        let job = sample_job();
        store.insert(&job).await.unwrap();

        let stored = store.get(&job.key()).await.unwrap();
        assert_eq!(stored.spec, job.spec);
        assert_eq!(stored.metadata.resource_version, 1);
    }

    #[tokio::test]
    #[ignore]
    async fn test_stale_update_conflicts() {
        let store = PgJobStore::new(test_pool().await);
        store.ensure_schema().await.unwrap();

        let mut job = sample_job();
        job.metadata.name = "mnist-conflict".to_string();
        store.insert(&job).await.unwrap();

        let stale = store.get(&job.key()).await.unwrap();
        let mut first = stale.clone();
        first.metadata.add_finalizer("a/finalizer");
        store.update(&first).await.unwrap();

        let err = store.update(&stale).await.unwrap_err();
        assert!(err.is_conflict());
    }
}
