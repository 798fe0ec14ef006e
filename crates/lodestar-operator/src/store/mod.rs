//! Datastore boundary.
//!
//! The engine never talks to the datastore directly; it goes through
//! [`JobStore`], which keeps a reconciliation pass unit-testable without a
//! live database. Writes are protected by optimistic concurrency: every
//! successful write bumps the object's `resource_version`, and a write
//! against a stale version fails with [`StoreError::Conflict`]. Conflicts
//! are a normal, retryable outcome of concurrent writers, not a bug.

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use thiserror::Error;

use lodestar_core::ResourceKey;

use crate::object::{TrainingJob, TrainingJobStatus};

/// Datastore errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The write lost an optimistic-concurrency race. Recovered by
    /// requeueing; never surfaced to the user.
    #[error("write conflict on {key}: {message}")]
    Conflict { key: String, message: String },

    /// No object exists under the key.
    #[error("object not found: {key}")]
    NotFound { key: String },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Create a conflict error.
    pub fn conflict(key: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Conflict {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(key: impl Into<String>) -> Self {
        StoreError::NotFound { key: key.into() }
    }

    /// Check if this error is an optimistic-concurrency conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    /// Check if this error means the object no longer exists.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Access to the datastore's training-job records.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Fetch the current object under `key`.
    async fn get(&self, key: &ResourceKey) -> StoreResult<TrainingJob>;

    /// Persist a spec/metadata write. The datastore bumps `generation`
    /// iff the spec changed, always bumps `resource_version`, and
    /// completes deletion (removes the record) when the object is under
    /// deletion and its finalizer set has emptied. Returns the stored
    /// object so callers can observe the new generation.
    async fn update(&self, job: &TrainingJob) -> StoreResult<TrainingJob>;

    /// Replace the object's status wholesale. Never merges fields.
    async fn update_status(
        &self,
        job: &TrainingJob,
        status: &TrainingJobStatus,
    ) -> StoreResult<()>;
}
