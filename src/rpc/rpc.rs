//! # Transport callable abstraction.
//!
//! This module defines the [`Rpc`] trait (async, cancelable) that the
//! asynchronous retry path drives. The request and response types are opaque
//! to the engine: the request is cloned for every attempt and the response is
//! passed through untouched.
//!
//! An attempt receives a [`CancellationToken`]; transports that can abort an
//! in-flight call should watch it, but honoring it is best-effort.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Status;

/// Shared handle to a transport callable.
pub type RpcRef<Req, Resp> = Arc<dyn Rpc<Request = Req, Response = Resp>>;

/// # One remote operation, invoked once per attempt.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use cloudretry::{Rpc, Status};
///
/// struct GetTable;
///
/// #[async_trait]
/// impl Rpc for GetTable {
///     type Request = String;
///     type Response = String;
///
///     fn name(&self) -> &str { "GetTable" }
///
///     async fn call(&self, table: String, _ctx: CancellationToken) -> Result<String, Status> {
///         Ok(format!("schema of {table}"))
///     }
/// }
/// ```
#[async_trait]
pub trait Rpc: Send + Sync + 'static {
    type Request: Clone + Send + Sync + 'static;
    type Response: Send + 'static;

    /// Returns a stable, human-readable operation name (used in events).
    fn name(&self) -> &str;

    /// Sends one attempt.
    async fn call(
        &self,
        request: Self::Request,
        ctx: CancellationToken,
    ) -> Result<Self::Response, Status>;
}
