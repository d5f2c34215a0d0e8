//! # Example: custom_subscriber
//!
//! Implements [`Subscribe`] to collect simple retry metrics from [`Event`]s.
//!
//! ## Run
//! ```bash
//! cargo run --example custom_subscriber
//! ```

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use cloudretry::{
    Event, EventKind, ExponentialBackoffPolicy, LimitedTimeRetryPolicy, RetryExecutor, Status,
    Subscribe, SubscriberSet,
};

/// Counts attempts and failures, sums backoff time.
#[derive(Default)]
struct Metrics {
    attempts: AtomicU64,
    failures: AtomicU64,
    backoff_ms: AtomicU64,
}

impl Subscribe for Metrics {
    fn on_event(&self, ev: &Event) {
        match ev.kind {
            EventKind::AttemptStarting => {
                self.attempts.fetch_add(1, Ordering::Relaxed);
            }
            EventKind::AttemptFailed => {
                self.failures.fetch_add(1, Ordering::Relaxed);
            }
            EventKind::BackoffScheduled => {
                self.backoff_ms
                    .fetch_add(u64::from(ev.delay_ms.unwrap_or(0)), Ordering::Relaxed);
            }
            EventKind::RetryExhausted | EventKind::PermanentFailure => {
                println!(
                    "[metrics] {} gave up: {}",
                    ev.operation.as_deref().unwrap_or("<unknown>"),
                    ev.reason.as_deref().unwrap_or("")
                );
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "metrics"
    }
}

fn main() {
    let metrics = Arc::new(Metrics::default());
    let exec = RetryExecutor::new(
        LimitedTimeRetryPolicy::new(Duration::from_millis(300)),
        ExponentialBackoffPolicy::new(Duration::from_millis(20), Duration::from_millis(80), 2.0),
    )
    .with_subscribers(SubscriberSet::new(vec![metrics.clone()]));

    let _ = exec.call("spanner.ExecuteSql", true, |_| -> Result<(), Status> {
        Err(Status::unavailable("session pool drained"))
    });

    println!(
        "[main] attempts={} failures={} backoff_ms={}",
        metrics.attempts.load(Ordering::Relaxed),
        metrics.failures.load(Ordering::Relaxed),
        metrics.backoff_ms.load(Ordering::Relaxed),
    );
}
