//! Error types used by the retry engine, pollers and credentials.
//!
//! This module defines the two values every failure is expressed with:
//!
//! - [`Status`] a single failed attempt as reported by the transport (code + message).
//! - [`Error`] the terminal outcome of a logical operation.
//!
//! Failures are always carried as values: the synchronous path returns them,
//! the asynchronous path hands them to the completion callback.
//!
//! ## Classification
//! ```text
//! StatusCode::is_transient()
//!   ├─ true  → Unavailable, DeadlineExceeded, ResourceExhausted, Aborted, Internal
//!   └─ false → everything else (retrying cannot help)
//! ```

use std::fmt;

use thiserror::Error;

/// Canonical status codes for a failed attempt.
///
/// HTTP statuses are folded into these codes by [`Status::from_http`]; the
/// original HTTP code stays available through [`Status::http_status`].
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl StatusCode {
    /// Whether another attempt may succeed where this one failed.
    ///
    /// # Example
    /// ```
    /// use cloudretry::StatusCode;
    ///
    /// assert!(StatusCode::Unavailable.is_transient());
    /// assert!(!StatusCode::PermissionDenied.is_transient());
    /// ```
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            StatusCode::Unavailable
                | StatusCode::DeadlineExceeded
                | StatusCode::ResourceExhausted
                | StatusCode::Aborted
                | StatusCode::Internal
        )
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            StatusCode::Cancelled => "cancelled",
            StatusCode::Unknown => "unknown",
            StatusCode::InvalidArgument => "invalid_argument",
            StatusCode::DeadlineExceeded => "deadline_exceeded",
            StatusCode::NotFound => "not_found",
            StatusCode::AlreadyExists => "already_exists",
            StatusCode::PermissionDenied => "permission_denied",
            StatusCode::ResourceExhausted => "resource_exhausted",
            StatusCode::FailedPrecondition => "failed_precondition",
            StatusCode::Aborted => "aborted",
            StatusCode::OutOfRange => "out_of_range",
            StatusCode::Unimplemented => "unimplemented",
            StatusCode::Internal => "internal",
            StatusCode::Unavailable => "unavailable",
            StatusCode::DataLoss => "data_loss",
            StatusCode::Unauthenticated => "unauthenticated",
        }
    }

    /// Maps an HTTP status code onto a canonical code.
    pub fn from_http(code: u16) -> Self {
        match code {
            400 => StatusCode::InvalidArgument,
            401 => StatusCode::Unauthenticated,
            403 => StatusCode::PermissionDenied,
            404 => StatusCode::NotFound,
            408 => StatusCode::DeadlineExceeded,
            409 => StatusCode::AlreadyExists,
            412 => StatusCode::FailedPrecondition,
            416 => StatusCode::OutOfRange,
            429 => StatusCode::ResourceExhausted,
            499 => StatusCode::Cancelled,
            501 => StatusCode::Unimplemented,
            502 | 503 => StatusCode::Unavailable,
            504 => StatusCode::DeadlineExceeded,
            500..=599 => StatusCode::Internal,
            _ => StatusCode::Unknown,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Status of a single failed attempt, as reported by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    code: StatusCode,
    message: String,
    http_status: Option<u16>,
}

impl Status {
    /// Creates a status with the given code and message.
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            http_status: None,
        }
    }

    /// Creates a status from a raw HTTP response code.
    ///
    /// # Example
    /// ```
    /// use cloudretry::{Status, StatusCode};
    ///
    /// let st = Status::from_http(503, "backend unavailable");
    /// assert_eq!(st.code(), StatusCode::Unavailable);
    /// assert_eq!(st.http_status(), Some(503));
    /// ```
    pub fn from_http(http_status: u16, message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::from_http(http_status),
            message: message.into(),
            http_status: Some(http_status),
        }
    }

    /// Shorthand for a network-level failure (connection reset, lost response).
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::Unavailable, message)
    }

    pub fn code(&self) -> StatusCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Original HTTP status, when the status was built from one.
    pub fn http_status(&self) -> Option<u16> {
        self.http_status
    }

    /// Shorthand for `self.code().is_transient()`.
    pub fn is_transient(&self) -> bool {
        self.code.is_transient()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.http_status {
            Some(http) => write!(f, "{} [{}/{}]", self.message, self.code, http),
            None => write!(f, "{} [{}]", self.message, self.code),
        }
    }
}

impl std::error::Error for Status {}

/// # Terminal outcome of a logical operation.
///
/// Each variant carries enough context to tell "server rejected" apart from
/// "gave up" and reports how many transport attempts were made.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The server rejected the request; retrying cannot help.
    #[error("permanent error after {attempts} attempt(s): {status}")]
    Permanent {
        /// Status of the rejected attempt.
        status: Status,
        /// Number of transport attempts made.
        attempts: u32,
    },

    /// A non-idempotent operation failed and was not retried.
    #[error("non-idempotent operation failed, not retried: {status}")]
    NotIdempotent {
        /// Status of the single attempt.
        status: Status,
    },

    /// The retry budget ran out while only transient errors were observed.
    #[error("retry policy exhausted after {attempts} attempt(s), last error: {last}")]
    RetryExhausted {
        /// Last transient status.
        last: Status,
        /// Number of transport attempts made.
        attempts: u32,
    },

    /// A polling loop consumed its budget before the operation completed.
    #[error("polling deadline exceeded after {attempts} check(s)")]
    DeadlineExceeded {
        /// Number of checks sent.
        attempts: u32,
        /// Last failed check, if the final check failed rather than returned "pending".
        last: Option<Status>,
    },

    /// Downloaded or uploaded content does not match the server-reported hash.
    #[error("{context}: hash mismatch, received={received} computed={computed}")]
    HashMismatch {
        /// Hash reported by the service.
        received: String,
        /// Hash computed locally.
        computed: String,
        /// Caller-supplied context (object name, operation).
        context: String,
    },

    /// The asynchronous operation was cancelled before completing.
    #[error("operation cancelled")]
    Cancelled,

    /// Malformed or unsupported credentials, or an unparsable token response.
    #[error("credentials error: {0}")]
    Credentials(String),

    /// Policy configuration rejected at construction time.
    #[error("invalid policy configuration: {0}")]
    InvalidPolicy(String),
}

impl Error {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use cloudretry::{Error, Status};
    ///
    /// let err = Error::RetryExhausted { last: Status::unavailable("reset"), attempts: 3 };
    /// assert_eq!(err.as_label(), "retry_exhausted");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            Error::Permanent { .. } => "permanent",
            Error::NotIdempotent { .. } => "not_idempotent",
            Error::RetryExhausted { .. } => "retry_exhausted",
            Error::DeadlineExceeded { .. } => "deadline_exceeded",
            Error::HashMismatch { .. } => "hash_mismatch",
            Error::Cancelled => "cancelled",
            Error::Credentials(_) => "credentials",
            Error::InvalidPolicy(_) => "invalid_policy",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            Error::Permanent { status, attempts } => {
                format!("rejected: {status} (attempts={attempts})")
            }
            Error::NotIdempotent { status } => format!("failed once: {status}"),
            Error::RetryExhausted { last, attempts } => {
                format!("gave up: {last} (attempts={attempts})")
            }
            Error::DeadlineExceeded { attempts, last } => match last {
                Some(st) => format!("deadline exceeded: {st} (checks={attempts})"),
                None => format!("deadline exceeded (checks={attempts})"),
            },
            Error::HashMismatch {
                received,
                computed,
                context,
            } => format!("{context}: received={received} computed={computed}"),
            Error::Cancelled => "cancelled".to_string(),
            Error::Credentials(msg) => format!("credentials: {msg}"),
            Error::InvalidPolicy(msg) => format!("invalid policy: {msg}"),
        }
    }

    /// Number of transport attempts made before this error was produced.
    pub fn attempts(&self) -> u32 {
        match self {
            Error::Permanent { attempts, .. }
            | Error::RetryExhausted { attempts, .. }
            | Error::DeadlineExceeded { attempts, .. } => *attempts,
            Error::NotIdempotent { .. } => 1,
            _ => 0,
        }
    }

    /// The last underlying transport status, if any.
    pub fn last_status(&self) -> Option<&Status> {
        match self {
            Error::Permanent { status, .. } | Error::NotIdempotent { status } => Some(status),
            Error::RetryExhausted { last, .. } => Some(last),
            Error::DeadlineExceeded { last, .. } => last.as_ref(),
            _ => None,
        }
    }

    /// Converts the error into a status suitable for returning from a transport callable.
    ///
    /// Integrity failures map to [`StatusCode::DataLoss`], which the retry engine
    /// never retries.
    pub fn to_status(&self) -> Status {
        match self {
            Error::HashMismatch { .. } => Status::new(StatusCode::DataLoss, self.to_string()),
            Error::Cancelled => Status::new(StatusCode::Cancelled, "operation cancelled"),
            Error::DeadlineExceeded { .. } => {
                Status::new(StatusCode::DeadlineExceeded, self.to_string())
            }
            Error::Credentials(_) => Status::new(StatusCode::Unauthenticated, self.to_string()),
            Error::InvalidPolicy(_) => Status::new(StatusCode::InvalidArgument, self.to_string()),
            Error::Permanent { status, .. }
            | Error::NotIdempotent { status }
            | Error::RetryExhausted { last: status, .. } => status.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_codes_fold_into_canonical_codes() {
        assert_eq!(StatusCode::from_http(429), StatusCode::ResourceExhausted);
        assert_eq!(StatusCode::from_http(412), StatusCode::FailedPrecondition);
        assert_eq!(StatusCode::from_http(500), StatusCode::Internal);
        assert_eq!(StatusCode::from_http(503), StatusCode::Unavailable);
        assert_eq!(StatusCode::from_http(418), StatusCode::Unknown);
    }

    #[test]
    fn transient_codes() {
        for code in [408u16, 429, 500, 502, 503, 504] {
            assert!(Status::from_http(code, "x").is_transient(), "{code}");
        }
        for code in [400u16, 401, 403, 404, 409, 412] {
            assert!(!Status::from_http(code, "x").is_transient(), "{code}");
        }
    }

    #[test]
    fn exhausted_reports_last_status_and_attempts() {
        let err = Error::RetryExhausted {
            last: Status::unavailable("connection reset"),
            attempts: 4,
        };
        assert_eq!(err.attempts(), 4);
        assert_eq!(err.last_status().map(Status::code), Some(StatusCode::Unavailable));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn hash_mismatch_is_data_loss() {
        let err = Error::HashMismatch {
            received: "a".into(),
            computed: "b".into(),
            context: "read".into(),
        };
        let st = err.to_status();
        assert_eq!(st.code(), StatusCode::DataLoss);
        assert!(!st.is_transient());
    }
}
