//! # Example: retry_with_backoff
//!
//! Shows how [`RetryExecutor`] retries a flaky blocking transport call
//! according to [`LimitedErrorCountRetryPolicy`] and [`ExponentialBackoffPolicy`].
//!
//! ## Flow
//! ```text
//! RetryExecutor::call()
//!   ├─► AttemptStarting(1) → Err(503) → AttemptFailed
//!   ├─► BackoffScheduled{delay=100ms} → sleep
//!   ├─► AttemptStarting(2) → Err(429) → AttemptFailed
//!   ├─► BackoffScheduled{delay≈200ms} → sleep
//!   └─► AttemptStarting(3) → Ok → AttemptSucceeded
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example retry_with_backoff
//! ```

use std::{sync::Arc, time::Duration};

use cloudretry::{
    ExponentialBackoffPolicy, JitterPolicy, LimitedErrorCountRetryPolicy, RetryExecutor, Status,
    StatusCode, Subscribe, SubscriberSet,
};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // 1. Attach the built-in tracing subscriber (feature "logging")
    #[cfg(feature = "logging")]
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(cloudretry::LogWriter::default())];
    #[cfg(not(feature = "logging"))]
    let subs: Vec<Arc<dyn Subscribe>> = Vec::new();

    // 2. Five attempts, exponential backoff with equal jitter
    let exec = RetryExecutor::new(
        LimitedErrorCountRetryPolicy::new(5),
        ExponentialBackoffPolicy::new(Duration::from_millis(100), Duration::from_secs(2), 2.0)
            .with_jitter(JitterPolicy::Equal),
    )
    .with_subscribers(SubscriberSet::new(subs));

    // 3. Transport fails twice with transient statuses, then succeeds
    let object = exec.call("storage.objects.get", true, |attempt| {
        println!("[transport] attempt {attempt}");
        match attempt {
            1 => Err(Status::from_http(503, "backend unavailable")),
            2 => Err(Status::from_http(429, "rate limited")),
            _ => Ok(format!("object bytes (after {attempt} attempts)")),
        }
    })?;
    println!("[main] got: {object}");

    // 4. Permanent errors are never retried
    let err = exec
        .call("storage.objects.get", true, |_| -> Result<(), Status> {
            Err(Status::new(StatusCode::NotFound, "no such object"))
        })
        .unwrap_err();
    println!("[main] permanent: {} ({})", err.as_message(), err.as_label());

    // 5. Non-idempotent mutations get exactly one attempt
    let err = exec
        .call("storage.objects.insert", false, |_| -> Result<(), Status> {
            Err(Status::unavailable("connection reset after send"))
        })
        .unwrap_err();
    println!("[main] not retried: {}", err.as_message());

    Ok(())
}
