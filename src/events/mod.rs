//! Events: the data model for everything the engine reports.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//!
//! ## Quick reference
//! - **Publishers**: `core::RetryExecutor`, `core::AsyncRetry`, the pollers,
//!   `credentials::TokenCache`, and `SubscriberSet` itself (panic reports).
//! - **Consumers**: whatever [`Subscribe`](crate::Subscribe) implementations the
//!   caller injected through a [`SubscriberSet`](crate::SubscriberSet).

mod event;

pub use event::{Event, EventKind};
