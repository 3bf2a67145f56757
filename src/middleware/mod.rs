//! Middleware layer.
//!
//! Middleware intercepts requests and outcomes and is the place for
//! cross-cutting concerns. Four stages ship built in:
//!
//! - [`Correlation`] — establishes the request's correlation identity and
//!   echoes it on the response headers.
//! - [`ErrorHandling`] — the failure boundary: maps [`Failure`] values to
//!   HTTP responses and logs them; nothing leaks past it.
//! - [`RequestTracking`] — one structured telemetry record per request:
//!   method, path, status, duration, operation id.
//! - [`VersionTracking`] — stamps the running version onto responses.
//!
//! Every stage wraps a next stage and is itself a stage, so they compose by
//! plain nesting — no base type, no registration magic. [`Pipeline`] wires
//! the canonical order for you.
//!
//! [`Failure`]: crate::Failure
//! [`Pipeline`]: crate::Pipeline

mod correlation;
mod error_handling;
mod tracking;
mod version;

pub use correlation::Correlation;
pub use error_handling::{Category, ErrorHandling};
pub use tracking::{
    Recorder, RequestRecord, RequestTracking, RequestTrackingOptions, TraceRecorder,
};
pub use version::{VersionTracking, VersionTrackingOptions, VERSION_HEADER};
