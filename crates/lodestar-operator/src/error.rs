//! Reconciler error types.
//!
//! Failures are classified at the boundary they occur on (datastore or
//! remote API) and converted into `ReconcileError` before any branching,
//! so the engine decides retry policy from variants, never from raw
//! errors.

use thiserror::Error;

use lodestar_remote::config::ResolveError;
use lodestar_remote::error::RemoteError;

use crate::store::StoreError;

/// Errors a reconciliation pass can record in its outcome.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Datastore error.
    #[error("Datastore error: {0}")]
    Store(#[from] StoreError),

    /// Remote API error.
    #[error("Remote API error: {0}")]
    Remote(#[from] RemoteError),

    /// Region/endpoint resolution failed. Terminal for the pass: an
    /// unchanged misconfiguration will not heal by retrying.
    #[error("Remote access misconfiguration: {0}")]
    Misconfiguration(#[from] ResolveError),
}

impl ReconcileError {
    /// Check if this is a recoverable optimistic-concurrency conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, ReconcileError::Store(e) if e.is_conflict())
    }
}

/// Result type for reconciler internals.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_detection() {
        let err = ReconcileError::from(StoreError::conflict("a/b", "stale"));
        assert!(err.is_conflict());

        let err = ReconcileError::from(RemoteError::NotFound);
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_display_nests_source() {
        let err = ReconcileError::from(StoreError::not_found("team-a/mnist"));
        assert!(err.to_string().contains("team-a/mnist"));
    }
}
