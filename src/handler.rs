//! Handler trait and type erasure.
//!
//! # Two kinds of handler
//!
//! The router stores one handler type per route, so both shapes a route can
//! take are hidden behind the same trait object (`dyn ErasedHandler`):
//!
//! ```text
//! async fn ping(req: Request) -> Response { … }      ← raw handler, sees the Request
//!        ↓ Handler blanket impl
//! Arc::new(FnHandler(ping))
//!
//! Endpoint::builder()…build()                         ← validated pipeline
//!        ↓ Handler impl for Endpoint
//! Arc::new(endpoint)
//!
//!        ↓  both stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(req) at request time                   ← one vtable dispatch
//! ```
//!
//! The per-request cost is one `Arc` clone and one virtual call.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::endpoint::Endpoint;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `Send + 'static` let tokio move the future across worker threads.
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// You never implement this yourself. It is satisfied by:
///
/// - any `async fn name(req: Request) -> impl IntoResponse`
/// - an [`Endpoint`], which binds, validates and resolves dependencies before
///   calling its own handler
///
/// The trait is sealed: only the impls in this module can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

// ── Raw functions ─────────────────────────────────────────────────────────────

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Holds a concrete handler `F` and implements [`ErasedHandler`] for it.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

// ── Endpoints ─────────────────────────────────────────────────────────────────

impl private::Sealed for Endpoint {}

impl Handler for Endpoint {
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(self)
    }
}

impl ErasedHandler for Endpoint {
    fn call(&self, req: Request) -> BoxFuture {
        Endpoint::call(self, req)
    }
}
