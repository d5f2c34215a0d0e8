//! # SubscriberSet: explicit fan-out over injected sinks
//!
//! [`SubscriberSet`] is handed to every component that reports events. There is
//! no process-wide registry: the entry point builds a set, clones it into the
//! components that need it, and drops it when done.
//!
//! ## What it guarantees
//! - Cloning is cheap (shared `Arc` slice).
//! - Every subscriber sees events in the order they were emitted from one thread.
//! - Panics inside subscribers are caught; the remaining subscribers receive a
//!   `SubscriberPanicked` event describing the failure.
//!
//! ## What it does **not** guarantee
//! - No global ordering across threads (use `Event::seq`).
//!
//! ## Diagram
//! ```text
//!    emit(&Event)
//!        ├──► S1.on_event()
//!        ├──► S2.on_event() ── panic ──► SubscriberPanicked ──► S1, S3
//!        └──► S3.on_event()
//! ```

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::events::Event;

use super::Subscribe;

/// Fan-out over a fixed list of subscribers.
#[derive(Clone, Default)]
pub struct SubscriberSet {
    subs: Arc<[Arc<dyn Subscribe>]>,
}

impl std::fmt::Debug for SubscriberSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.subs.iter().map(|s| s.name()))
            .finish()
    }
}

impl SubscriberSet {
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        Self { subs: subs.into() }
    }

    /// Delivers one event to every subscriber.
    pub fn emit(&self, event: &Event) {
        let mut panicked = Vec::new();
        for (idx, sub) in self.subs.iter().enumerate() {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| sub.on_event(event))) {
                panicked.push((idx, Event::subscriber_panicked(sub.name(), panic_message(&payload))));
            }
        }
        if panicked.is_empty() || event.is_subscriber_panic() {
            return;
        }
        for (bad, report) in &panicked {
            for (idx, sub) in self.subs.iter().enumerate() {
                if idx == *bad {
                    continue;
                }
                let _ = catch_unwind(AssertUnwindSafe(|| sub.on_event(report)));
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subs.len()
    }
}

fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
