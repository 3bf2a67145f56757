//! Handler trait, stage outcome, and type erasure.
//!
//! # The next-stage contract
//!
//! Every stage of the pipeline — the application handler at the bottom and
//! each middleware wrapped around it — satisfies one contract: take a
//! [`Request`], asynchronously produce an [`Outcome`]. Middlewares hold the
//! next stage as a [`BoxedHandler`] and decorate its behavior; there is no
//! base-middleware type and no inheritance, only values wrapping values.
//!
//! # How async handlers are stored
//!
//! A middleware must hold next stages of *different* concrete types behind a
//! single field type, so we use **trait objects** (`dyn ErasedHandler`) to
//! hide the concrete handler type behind a common interface.
//!
//! The chain from user code to vtable call is:
//!
//! ```text
//! async fn hello(req: Request) -> Response { … }   ← user writes this
//!        ↓ Pipeline::new(hello)
//! hello.into_boxed_handler()                       ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))                       ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(req)  at request time               ← one vtable dispatch
//!        ↓
//! Box::pin(async { hello(req).await.into_outcome() })  ← BoxFuture
//! ```
//!
//! The only runtime cost per request is **one Arc clone** (atomic inc) +
//! **one virtual call** per stage — negligible compared to network I/O.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Failure;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Outcome ───────────────────────────────────────────────────────────────────

/// What a stage produces: a response, or a failure travelling up the chain.
pub type Outcome = Result<Response, Failure>;

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to an [`Outcome`].
///
/// `Pin<Box<…>>` is required because the async runtime must be able to poll
/// the future in-place — it cannot move it in memory after the first poll.
/// `Send + 'static` let tokio move the future across threads safely.
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Outcome> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
/// External crates cannot usefully interact with this trait.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A heap-allocated, type-erased stage shared across concurrent requests.
///
/// `#[doc(hidden)] pub` for the same reason as `ErasedHandler`.
/// `Arc` gives us cheap, thread-safe shared ownership (one atomic reference
/// count increment per request) without copying the handler.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid pipeline stage.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` with the signature:
///
/// ```text
/// async fn name(req: Request) -> impl IntoOutcome
/// ```
///
/// The trait is **sealed** (via the private `Sealed` supertrait): only the
/// blanket impl below can satisfy it. This prevents accidental misuse and
/// keeps the API surface stable across versions.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

/// The sealing module. Because `Sealed` is not exported, external crates
/// cannot name it and therefore cannot implement `Handler` on their own
/// types. `pub(crate)` so the built-in middlewares can join the sealed set.
pub(crate) mod private {
    pub trait Sealed {}
}

// ── IntoOutcome ───────────────────────────────────────────────────────────────

/// Conversion into a stage [`Outcome`].
///
/// Lets handlers return plain responses, bare statuses, strings, or explicit
/// `Result`s — infallible returns are wrapped in `Ok` automatically.
pub trait IntoOutcome {
    fn into_outcome(self) -> Outcome;
}

impl IntoOutcome for Response {
    fn into_outcome(self) -> Outcome { Ok(self) }
}

impl IntoOutcome for &'static str {
    fn into_outcome(self) -> Outcome { Ok(self.into_response()) }
}

impl IntoOutcome for String {
    fn into_outcome(self) -> Outcome { Ok(self.into_response()) }
}

impl IntoOutcome for crate::Status {
    fn into_outcome(self) -> Outcome { Ok(self.into_response()) }
}

/// Fallible handlers: `async fn h(req: Request) -> Result<Response, Failure>`.
impl<T: IntoResponse> IntoOutcome for Result<T, Failure> {
    fn into_outcome(self) -> Outcome {
        self.map(IntoResponse::into_response)
    }
}

// ── Blanket implementations ───────────────────────────────────────────────────

/// Implement the sealing trait for any function with the right signature.
///
/// `Fn(Request) -> Fut` covers:
///   - named `async fn` items
///   - `async` closures
///   - any struct that implements `Fn`
impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
}

/// Implement `Handler` for any function with the right signature.
impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Newtype wrapper that holds a concrete handler `F` and implements
/// [`ErasedHandler`], bridging the typed world to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoOutcome + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        // Call the wrapped function — this returns the concrete `Fut`.
        // We then map it to `Outcome` via `IntoOutcome` and box the whole
        // thing so the return type matches the trait signature.
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_outcome() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Method, Status};

    fn request() -> Request {
        Request::new(Method::Get, "/", Vec::new(), Vec::new())
    }

    #[tokio::test]
    async fn infallible_handlers_wrap_in_ok() {
        async fn hello(_req: Request) -> &'static str { "hi" }
        let h = hello.into_boxed_handler();
        let outcome = h.call(request()).await;
        assert_eq!(outcome.unwrap().status_code(), 200);
    }

    #[tokio::test]
    async fn fallible_handlers_pass_failures_through() {
        async fn boom(_req: Request) -> Result<Response, Failure> {
            Err(Failure::internal("boom"))
        }
        let h = boom.into_boxed_handler();
        let outcome = h.call(request()).await;
        assert_eq!(outcome.unwrap_err().status(), 500);
    }

    #[tokio::test]
    async fn status_returns_convert() {
        async fn gone(_req: Request) -> Status { Status::Gone }
        let h = gone.into_boxed_handler();
        assert_eq!(h.call(request()).await.unwrap().status_code(), 410);
    }
}
