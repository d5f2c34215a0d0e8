//! # Logging subscriber backed by `tracing`.
//!
//! [`LogWriter`] turns events into `tracing` records with structured fields, so
//! whatever `tracing` subscriber the application installed decides format and
//! destination.
//!
//! ## Levels
//! ```text
//! debug: attempt_starting, attempt_succeeded, poll_pending, poll_completed, token_refresh_starting
//! info:  backoff_scheduled, token_refreshed, operation_cancelled
//! warn:  attempt_failed, retry_exhausted, poll_deadline_exceeded, token_refresh_failed
//! error: permanent_failure, subscriber_panicked
//! ```

use crate::Subscribe;
use crate::events::{Event, EventKind};

/// Forwards events to `tracing`.
///
/// Enabled via the `logging` feature (on by default).
#[derive(Clone, Copy, Debug, Default)]
pub struct LogWriter;

impl Subscribe for LogWriter {
    fn on_event(&self, e: &Event) {
        let op = e.operation.as_deref().unwrap_or("-");
        let attempt = e.attempt.unwrap_or(0);
        let code = e.code.map(|c| c.as_label()).unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        let delay_ms = e.delay_ms.unwrap_or(0);

        match e.kind {
            EventKind::AttemptStarting => {
                tracing::debug!(seq = e.seq, op, attempt, "attempt starting");
            }
            EventKind::AttemptSucceeded => {
                tracing::debug!(seq = e.seq, op, attempt, "attempt succeeded");
            }
            EventKind::AttemptFailed => {
                tracing::warn!(seq = e.seq, op, attempt, code, reason, "attempt failed");
            }
            EventKind::BackoffScheduled => {
                tracing::info!(seq = e.seq, op, attempt, delay_ms, reason, "backoff scheduled");
            }
            EventKind::RetryExhausted => {
                tracing::warn!(seq = e.seq, op, attempt, code, reason, "retry policy exhausted");
            }
            EventKind::PermanentFailure => {
                tracing::error!(seq = e.seq, op, attempt, code, reason, "permanent failure");
            }
            EventKind::OperationCancelled => {
                tracing::info!(seq = e.seq, op, attempt, "operation cancelled");
            }
            EventKind::PollPending => {
                tracing::debug!(seq = e.seq, op, attempt, delay_ms, "operation pending");
            }
            EventKind::PollCompleted => {
                tracing::debug!(seq = e.seq, op, attempt, "operation completed");
            }
            EventKind::PollDeadlineExceeded => {
                tracing::warn!(seq = e.seq, op, attempt, reason, "polling deadline exceeded");
            }
            EventKind::TokenRefreshStarting => {
                tracing::debug!(seq = e.seq, op, "token refresh starting");
            }
            EventKind::TokenRefreshed => {
                tracing::info!(seq = e.seq, op, valid_for_ms = delay_ms, "token refreshed");
            }
            EventKind::TokenRefreshFailed => {
                tracing::warn!(seq = e.seq, op, reason, "token refresh failed");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(seq = e.seq, subscriber = op, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
