//! Transport callables consumed by the asynchronous retry path.
//!
//! ## Contents
//! - [`Rpc`] the trait a transport implements (one call per attempt)
//! - [`RpcFn`] closure-backed implementation
//! - [`RpcRef`] shared handle (`Arc<dyn Rpc<..>>`)
//!
//! The synchronous path takes a plain `FnMut(u32) -> Result<T, Status>` and
//! needs nothing from this module.

#[allow(clippy::module_inception)]
mod rpc;
mod rpc_fn;

pub use rpc::{Rpc, RpcRef};
pub use rpc_fn::RpcFn;
