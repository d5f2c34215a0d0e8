//! # Function-backed transport callable (`RpcFn`)
//!
//! [`RpcFn`] wraps a closure `F: Fn(Req, CancellationToken) -> Fut`, producing a
//! fresh future per attempt. Shared state between attempts must be explicit
//! (`Arc<...>` captured by the closure).
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use cloudretry::{RpcFn, RpcRef, Status};
//!
//! let rpc: RpcRef<u32, u32> = RpcFn::arc("double", |n: u32, _ctx: CancellationToken| async move {
//!     Ok::<_, Status>(n * 2)
//! });
//!
//! assert_eq!(rpc.name(), "double");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Status;
use crate::rpc::rpc::Rpc;

/// Function-backed transport callable.
pub struct RpcFn<F, Req, Resp> {
    name: Cow<'static, str>,
    f: F,
    _types: PhantomData<fn(Req) -> Resp>,
}

impl<F, Fut, Req, Resp> RpcFn<F, Req, Resp>
where
    F: Fn(Req, CancellationToken) -> Fut,
    Fut: Future<Output = Result<Resp, Status>>,
{
    /// Creates a new function-backed callable.
    ///
    /// Prefer [`RpcFn::arc`] when you immediately need an [`RpcRef`](crate::RpcRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            _types: PhantomData,
        }
    }

    /// Creates the callable and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, Req, Resp> std::fmt::Debug for RpcFn<F, Req, Resp> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcFn").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F, Fut, Req, Resp> Rpc for RpcFn<F, Req, Resp>
where
    F: Fn(Req, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Resp, Status>> + Send + 'static,
    Req: Clone + Send + Sync + 'static,
    Resp: Send + 'static,
{
    type Request = Req;
    type Response = Resp;

    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, request: Req, ctx: CancellationToken) -> Result<Resp, Status> {
        (self.f)(request, ctx).await
    }
}
