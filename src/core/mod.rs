//! Execution core: retry loops and polling loops.
//!
//! Every loop in this module follows the same shape: clone the policy
//! prototypes, run an attempt, ask [`decide`] (or [`decide_poll`]) what to do,
//! then wait. Only the waiting differs between the blocking and tokio-driven
//! variants.
//!
//! Internal modules:
//! - [`decision`]: pure retry decision shared by every loop;
//! - [`runner`]: executes one attempt and publishes its events;
//! - [`executor`]: blocking retry loop ([`RetryExecutor`]);
//! - [`actor`]: tokio-driven retry state object ([`AsyncRetry`]) and its [`OperationHandle`];
//! - [`poll`]: long-running operation waits ([`poll_until`], [`AsyncPoller`]).

mod actor;
mod decision;
mod executor;
mod poll;
mod runner;

pub use actor::{AsyncRetry, OperationHandle};
pub use decision::{RetryDecision, decide, decide_poll};
pub use executor::RetryExecutor;
pub use poll::{AsyncPoller, poll_until, wait_for_consistency};
