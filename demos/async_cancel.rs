//! # Example: async_cancel
//!
//! Starts an [`AsyncRetry`] against a transport that never recovers, then
//! cancels it through its [`OperationHandle`] while a backoff is pending.
//! The completion callback is never invoked after cancellation.
//!
//! A second operation waits on a long-running operation with [`AsyncPoller`].
//!
//! ## Run
//! ```bash
//! cargo run --example async_cancel
//! ```

use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use cloudretry::{
    AsyncPoller, AsyncRetry, ExponentialBackoffPolicy, GenericPollingPolicy,
    LimitedErrorCountRetryPolicy, RpcFn, RpcRef, Status,
};
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // 1. A transport that always reports UNAVAILABLE
    let rpc: RpcRef<String, String> =
        RpcFn::arc("bigtable.GetTable", |table: String, _ctx: CancellationToken| async move {
            println!("[transport] GetTable({table})");
            Err::<String, _>(Status::unavailable("tablet server restarting"))
        });

    // 2. Start it with a generous budget and slow backoff
    let handle = AsyncRetry::new(
        rpc,
        "projects/p/instances/i/tables/t".to_string(),
        true,
        LimitedErrorCountRetryPolicy::new(100),
        ExponentialBackoffPolicy::new(Duration::from_millis(300), Duration::from_secs(5), 2.0),
    )
    .start(|res| println!("[callback] {res:?} (never printed after cancel)"));

    // 3. Cancel during the second backoff
    tokio::time::sleep(Duration::from_millis(500)).await;
    handle.cancel();
    handle.join().await?;
    println!("[main] cancelled");

    // 4. Poll a long-running operation until it reports done
    let checks = Arc::new(AtomicU32::new(0));
    let poller = AsyncPoller::new(
        "bigtable.CreateTable",
        GenericPollingPolicy::new(
            LimitedErrorCountRetryPolicy::new(20),
            ExponentialBackoffPolicy::new(Duration::from_millis(50), Duration::from_millis(400), 2.0),
        ),
    );
    let table = poller
        .poll(CancellationToken::new(), |n| {
            checks.fetch_add(1, Ordering::Relaxed);
            async move {
                println!("[poll] check #{n}");
                Ok((n >= 4).then(|| "tables/t".to_string()))
            }
        })
        .await?;
    println!("[main] operation done: {table} after {} checks", checks.load(Ordering::Relaxed));

    Ok(())
}
