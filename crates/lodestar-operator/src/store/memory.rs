//! In-memory datastore.
//!
//! Mirrors the Postgres store's semantics (versioning, generation bumps,
//! deletion completion) so engine behavior can be exercised without a
//! database.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use lodestar_core::ResourceKey;

use super::{JobStore, StoreError, StoreResult};
use crate::object::{TrainingJob, TrainingJobStatus};

/// In-memory [`JobStore`] implementation.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    objects: RwLock<HashMap<ResourceKey, TrainingJob>>,
}

impl InMemoryJobStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object, assigning it version 1 if unversioned.
    pub async fn insert(&self, mut job: TrainingJob) {
        if job.metadata.resource_version == 0 {
            job.metadata.resource_version = 1;
        }
        self.objects.write().await.insert(job.key(), job);
    }

    /// Whether an object exists under `key`.
    pub async fn contains(&self, key: &ResourceKey) -> bool {
        self.objects.read().await.contains_key(key)
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn get(&self, key: &ResourceKey) -> StoreResult<TrainingJob> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(key.to_string()))
    }

    async fn update(&self, job: &TrainingJob) -> StoreResult<TrainingJob> {
        let key = job.key();
        let mut objects = self.objects.write().await;
        let current = objects
            .get(&key)
            .ok_or_else(|| StoreError::not_found(key.to_string()))?;

        if current.metadata.resource_version != job.metadata.resource_version {
            return Err(StoreError::conflict(
                key.to_string(),
                format!(
                    "stale resource version {} (current {})",
                    job.metadata.resource_version, current.metadata.resource_version
                ),
            ));
        }

        let mut updated = job.clone();
        if current.spec != updated.spec {
            updated.metadata.generation = current.metadata.generation + 1;
        }
        updated.metadata.resource_version = current.metadata.resource_version + 1;

        // Deletion completes once the finalizer set empties.
        if updated.metadata.is_deleting() && updated.metadata.finalizers.is_empty() {
            objects.remove(&key);
        } else {
            objects.insert(key, updated.clone());
        }

        Ok(updated)
    }

    async fn update_status(
        &self,
        job: &TrainingJob,
        status: &TrainingJobStatus,
    ) -> StoreResult<()> {
        let key = job.key();
        let mut objects = self.objects.write().await;
        let current = objects
            .get_mut(&key)
            .ok_or_else(|| StoreError::not_found(key.to_string()))?;

        if current.metadata.resource_version != job.metadata.resource_version {
            return Err(StoreError::conflict(
                key.to_string(),
                format!(
                    "stale resource version {} (current {})",
                    job.metadata.resource_version, current.metadata.resource_version
                ),
            ));
        }

        current.status = status.clone();
        current.metadata.resource_version += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ObjectMeta, OutputLocation, TrainingJobSpec};
    use chrono::Utc;
    use lodestar_core::ResourceUid;

    fn sample_job() -> TrainingJob {
        TrainingJob {
            metadata: ObjectMeta {
                namespace: "team-a".to_string(),
                name: "mnist".to_string(),
                uid: ResourceUid::new(),
                generation: 1,
                resource_version: 0,
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

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = InMemoryJobStore::new();
        let err = store
            .get(&ResourceKey::new("team-a", "ghost"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_spec_change_bumps_generation() {
        let store = InMemoryJobStore::new();
        store.insert(sample_job()).await;
        let mut job = store.get(&ResourceKey::new("team-a", "mnist")).await.unwrap();

        job.spec.job_name = Some("mnist-abc".to_string());
        let updated = store.update(&job).await.unwrap();
        assert_eq!(updated.metadata.generation, 2);
        assert_eq!(updated.metadata.resource_version, 2);
    }

    #[tokio::test]
    async fn test_metadata_only_change_keeps_generation() {
        let store = InMemoryJobStore::new();
        store.insert(sample_job()).await;
        let mut job = store.get(&ResourceKey::new("team-a", "mnist")).await.unwrap();

        job.metadata.add_finalizer("training-jobs.lodestar.dev/finalizer");
        let updated = store.update(&job).await.unwrap();
        assert_eq!(updated.metadata.generation, 1);
        assert_eq!(updated.metadata.resource_version, 2);
    }

    #[tokio::test]
    async fn test_stale_write_conflicts() {
        let store = InMemoryJobStore::new();
        store.insert(sample_job()).await;
        let key = ResourceKey::new("team-a", "mnist");
        let stale = store.get(&key).await.unwrap();

        let mut first = stale.clone();
        first.metadata.add_finalizer("a/finalizer");
        store.update(&first).await.unwrap();

        let err = store.update(&stale).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_deletion_completes_when_finalizers_empty() {
        let store = InMemoryJobStore::new();
        let mut job = sample_job();
        job.metadata.deletion_timestamp = Some(Utc::now());
        job.metadata.add_finalizer("a/finalizer");
        store.insert(job).await;

        let key = ResourceKey::new("team-a", "mnist");
        let mut current = store.get(&key).await.unwrap();
        current.metadata.remove_finalizer("a/finalizer");
        store.update(&current).await.unwrap();

        assert!(!store.contains(&key).await);
    }

    #[tokio::test]
    async fn test_status_replace_is_wholesale() {
        let store = InMemoryJobStore::new();
        store.insert(sample_job()).await;
        let key = ResourceKey::new("team-a", "mnist");
        let job = store.get(&key).await.unwrap();

        let status = TrainingJobStatus {
            primary_status: "InProgress".to_string(),
            model_path: "old".to_string(),
            ..Default::default()
        };
        store.update_status(&job, &status).await.unwrap();

        let job = store.get(&key).await.unwrap();
        let replacement = TrainingJobStatus {
            primary_status: "Completed".to_string(),
            ..Default::default()
        };
        store.update_status(&job, &replacement).await.unwrap();

        let stored = store.get(&key).await.unwrap();
        assert_eq!(stored.status.primary_status, "Completed");
        // No field merging: the old model_path must be gone.
        assert_eq!(stored.status.model_path, "");
    }
}
