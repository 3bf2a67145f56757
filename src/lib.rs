//! # pylon
//!
//! A composable HTTP middleware pipeline for Rust API services.
//! Correlation, failure mapping, request tracking. Nothing more.
//!
//! ## The contract
//!
//! Your server (hyper, a framework, anything async) parses wire bytes and
//! routes requests. Your handlers implement business logic. pylon owns the
//! layer in between — the cross-cutting concerns every service in a fleet
//! needs to do *identically*:
//!
//! - **Correlation** — every request gets an operation id and a transaction
//!   id; caller-supplied ids propagate, missing ones are generated, both are
//!   echoed on the response so independent logs reassemble into one story.
//! - **Failure mapping** — a failure anywhere downstream becomes a clean
//!   HTTP response: transport-classified failures keep their status code,
//!   everything else is a bare 500. Internals are logged, never leaked.
//! - **Request tracking** — one structured telemetry record per request:
//!   method, path, status, duration, operation id. Health-check noise and
//!   sensitive headers are excludable.
//! - **Version tracking** — stamp the deployed version on responses of
//!   non-public endpoints.
//!
//! What pylon intentionally ignores — routing, payload validation,
//! authentication, TLS, timeouts — belongs to the server and proxy in front
//! of it.
//!
//! ## Quick start
//!
//! ```rust
//! use pylon::{Category, CorrelationOptions, Method, Pipeline, Request,
//!             RequestTrackingOptions, Response};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! async fn handler(req: Request) -> Response {
//!     // correlation is already attached for downstream use:
//!     let op = req.correlation().map(|c| c.operation_id().to_owned());
//!     Response::text(op.unwrap_or_default())
//! }
//!
//! let pipeline = Pipeline::new(handler)
//!     .with_request_tracking(RequestTrackingOptions::default().exclude_path("/healthz"))
//!     .with_correlation(CorrelationOptions::default())
//!     .with_error_handling(Category::fixed("my-api"));
//!
//! // per request, from your server's dispatch:
//! let req = Request::new(Method::Get, "/orders/42", Vec::new(), Vec::new());
//! let response = pipeline.handle(req).await.expect("error handling is composed");
//! assert!(response.header("X-Operation-ID").is_some());
//! # }
//! ```
//!
//! Failures are plain values, not panics: fallible handlers return
//! `Result<Response, Failure>` and the error-handling stage does the
//! status-code mapping. See [`Failure`] for the taxonomy.

mod correlation;
mod error;
mod handler;
mod method;
mod pipeline;
mod request;
mod response;
mod status;

pub mod middleware;

pub use correlation::{
    CorrelationInfo, CorrelationOptions, IdGenerator, UpstreamServiceOptions,
    OPERATION_ID_HEADER, TRANSACTION_ID_HEADER, UPSTREAM_SERVICE_HEADER,
};
pub use error::{Failure, FailureKind};
pub use handler::{Handler, IntoOutcome, Outcome};
pub use method::Method;
pub use middleware::{
    Category, Recorder, RequestRecord, RequestTrackingOptions, TraceRecorder,
    VersionTrackingOptions, VERSION_HEADER,
};
pub use pipeline::Pipeline;
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use status::Status;
