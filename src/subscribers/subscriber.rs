//! # Event subscriber trait.
//!
//! Provides [`Subscribe`], the sink interface for plugging custom event
//! handlers into executors, pollers and credentials.
//!
//! ## Architecture
//! ```text
//! RetryExecutor / AsyncRetry / TokenCache ──► SubscriberSet::emit(&Event)
//!                                                  ├──► sub1.on_event()
//!                                                  ├──► sub2.on_event()
//!                                                  └──► panic caught → EventKind::SubscriberPanicked
//! ```
//!
//! ## Rules
//! - `on_event` runs on the thread that produced the event: keep it short
//!   (hand off to a channel for I/O-heavy sinks).
//! - A panicking subscriber does not affect the operation or other subscribers.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use cloudretry::{Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct RetryCounter(AtomicUsize);
//!
//! impl Subscribe for RetryCounter {
//!     fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::BackoffScheduled) {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "retry-counter" }
//! }
//! ```

use crate::events::Event;

/// Event subscriber for observability.
///
/// Implementations must be thread-safe: the same subscriber receives events
/// from every thread and task that shares the set.
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event.
    fn on_event(&self, event: &Event);

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
