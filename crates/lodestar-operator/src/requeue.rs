//! Requeue directives.
//!
//! Every reconciliation pass ends in an [`Outcome`]: a directive telling
//! the dispatcher whether and when to invoke the engine again for the same
//! object, optionally paired with the error that shaped the decision.
//! Nothing escapes a pass as an unhandled fault.

use std::time::Duration;

use crate::error::ReconcileError;

/// Instruction to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// No further action; wait for the next watch event.
    Done,
    /// Invoke again as soon as possible.
    RequeueImmediately,
    /// Invoke again after the given interval.
    RequeueAfter(Duration),
}

/// Result of one reconciliation pass.
#[derive(Debug)]
pub struct Outcome {
    pub directive: Directive,
    pub error: Option<ReconcileError>,
}

impl Outcome {
    /// No further action.
    #[must_use]
    pub fn done() -> Self {
        Self {
            directive: Directive::Done,
            error: None,
        }
    }

    /// Requeue as soon as possible.
    #[must_use]
    pub fn requeue_immediately() -> Self {
        Self {
            directive: Directive::RequeueImmediately,
            error: None,
        }
    }

    /// Requeue after `interval`.
    #[must_use]
    pub fn requeue_after(interval: Duration) -> Self {
        Self {
            directive: Directive::RequeueAfter(interval),
            error: None,
        }
    }

    /// Requeue after `interval`, carrying an error for the dispatcher's
    /// logs.
    #[must_use]
    pub fn requeue_after_with(interval: Duration, error: Option<ReconcileError>) -> Self {
        Self {
            directive: Directive::RequeueAfter(interval),
            error,
        }
    }

    /// Requeue carrying the error.
    #[must_use]
    pub fn fail(error: impl Into<ReconcileError>) -> Self {
        Self {
            directive: Directive::RequeueImmediately,
            error: Some(error.into()),
        }
    }

    /// Done on success, requeue with the error on failure. Used wherever
    /// a failed write must never be silently dropped.
    #[must_use]
    pub fn requeue_if_error<T, E: Into<ReconcileError>>(result: Result<T, E>) -> Self {
        match result {
            Ok(_) => Self::done(),
            Err(e) => Self::fail(e),
        }
    }

    /// Requeue immediately unless the write bumped the generation: a
    /// generation change means another writer touched the spec and the
    /// datastore will deliver its own event, so requeueing too would
    /// double-drive the object.
    #[must_use]
    pub fn requeue_immediately_unless_generation_changed(previous: i64, current: i64) -> Self {
        if previous == current {
            Self::requeue_immediately()
        } else {
            Self::done()
        }
    }

    /// Whether the pass recorded an error.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn test_requeue_if_error_on_success() {
        let outcome = Outcome::requeue_if_error(Ok::<_, StoreError>(()));
        assert_eq!(outcome.directive, Directive::Done);
        assert!(!outcome.has_error());
    }

    #[test]
    fn test_requeue_if_error_on_failure() {
        let outcome = Outcome::requeue_if_error(Err::<(), _>(StoreError::not_found("a/b")));
        assert_eq!(outcome.directive, Directive::RequeueImmediately);
        assert!(outcome.has_error());
    }

    #[test]
    fn test_generation_guard() {
        let unchanged = Outcome::requeue_immediately_unless_generation_changed(3, 3);
        assert_eq!(unchanged.directive, Directive::RequeueImmediately);

        let changed = Outcome::requeue_immediately_unless_generation_changed(3, 4);
        assert_eq!(changed.directive, Directive::Done);
    }

    #[test]
    fn test_requeue_after_carries_interval() {
        let outcome = Outcome::requeue_after(Duration::from_secs(30));
        assert_eq!(
            outcome.directive,
            Directive::RequeueAfter(Duration::from_secs(30))
        );
    }
}
