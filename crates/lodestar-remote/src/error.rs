//! Remote API error taxonomy
//!
//! Error definitions with transient/permanent classification for the
//! reconciler's retry policy.

use thiserror::Error;

/// Error code the remote API returns for request validation failures.
///
/// The API overloads this generic client-error code for "resource not
/// found"; the only way to disambiguate is an exact match on the message
/// as well. This matching is brittle against upstream wording changes,
/// but it is the documented behavior of the API and is preserved as-is.
pub const VALIDATION_ERROR_CODE: &str = "ValidationException";

/// Message accompanying [`VALIDATION_ERROR_CODE`] when the named job does
/// not exist.
pub const NOT_FOUND_MESSAGE: &str = "Requested resource not found.";

/// Error code the remote API returns when throttling. Sent with HTTP 400
/// rather than 429, so it is matched by code and message.
pub const THROTTLING_ERROR_CODE: &str = "ThrottlingException";

/// Message accompanying [`THROTTLING_ERROR_CODE`].
pub const THROTTLING_MESSAGE: &str = "Rate exceeded";

/// A classified failure from the remote training-job API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The named job does not exist on the remote side.
    #[error("remote job not found")]
    NotFound,

    /// The API rejected the call due to rate limiting.
    #[error("remote API throttled: {message}")]
    Throttled { message: String },

    /// Server-side fault (HTTP 5xx) or a transport failure. Expected to
    /// self-heal; callers retry on the poll interval.
    #[error("remote API server fault: {message}")]
    ServerFault { message: String },

    /// Any other failure. Retrying cannot succeed; the raw error text is
    /// surfaced into the object's status.
    #[error("unrecoverable remote API error {code}: {message}")]
    Unrecoverable { code: String, message: String },
}

impl RemoteError {
    /// Create a throttled error.
    pub fn throttled(message: impl Into<String>) -> Self {
        RemoteError::Throttled {
            message: message.into(),
        }
    }

    /// Create a server fault error.
    pub fn server_fault(message: impl Into<String>) -> Self {
        RemoteError::ServerFault {
            message: message.into(),
        }
    }

    /// Create an unrecoverable error.
    pub fn unrecoverable(code: impl Into<String>, message: impl Into<String>) -> Self {
        RemoteError::Unrecoverable {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Check if this error is transient and the call should be retried on
    /// the poll interval without touching the object's status.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RemoteError::Throttled { .. } | RemoteError::ServerFault { .. }
        )
    }

    /// Check if this error is the remote API's "resource not found" signal.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound)
    }
}

/// Map a raw remote API failure into the [`RemoteError`] taxonomy.
///
/// `status` is the HTTP status code of the response, `code` and `message`
/// the error code and message parsed from the response body.
#[must_use]
pub fn classify_api_failure(status: u16, code: &str, message: &str) -> RemoteError {
    if code == VALIDATION_ERROR_CODE && message == NOT_FOUND_MESSAGE {
        return RemoteError::NotFound;
    }
    if code == THROTTLING_ERROR_CODE && message == THROTTLING_MESSAGE {
        return RemoteError::throttled(message);
    }
    if status >= 500 {
        return RemoteError::server_fault(format!("HTTP {status} {code}: {message}"));
    }
    RemoteError::unrecoverable(code, message)
}

/// Result type for remote API operations.
pub type RemoteResult<T> = Result<T, RemoteError>;
