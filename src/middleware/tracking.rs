//! Request-tracking middleware: one telemetry record per request.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use crate::correlation::validated_header_name;
use crate::handler::{private, BoxFuture, BoxedHandler, ErasedHandler, Handler};
use crate::method::Method;
use crate::request::Request;

// ── Options ───────────────────────────────────────────────────────────────────

/// Configuration for request tracking.
///
/// ```rust
/// use pylon::RequestTrackingOptions;
///
/// let options = RequestTrackingOptions::default()
///     .exclude_path("/healthz")
///     .exclude_header("authorization");
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestTrackingOptions {
    excluded_paths: Vec<String>,
    excluded_headers: Vec<String>,
}

impl RequestTrackingOptions {
    /// Skips tracking for any request whose path starts with `prefix`.
    /// The request itself still runs; only telemetry is suppressed.
    pub fn exclude_path(mut self, prefix: impl Into<String>) -> Self {
        self.excluded_paths.push(prefix.into());
        self
    }

    /// Keeps the named header out of tracked metadata (case-insensitive).
    /// Use for credentials and anything else that must not reach telemetry.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not a valid header name.
    pub fn exclude_header(mut self, name: &str) -> Self {
        self.excluded_headers.push(validated_header_name(name, "excluded header"));
        self
    }

    fn path_is_excluded(&self, path: &str) -> bool {
        self.excluded_paths.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    fn header_is_excluded(&self, name: &str) -> bool {
        self.excluded_headers.iter().any(|h| h.eq_ignore_ascii_case(name))
    }
}

// ── Record & Recorder ─────────────────────────────────────────────────────────

/// One tracked request, assembled after the downstream chain finished.
///
/// `status` is what the client ends up seeing: for failed requests it is the
/// code the failure maps to, not a placeholder.
#[derive(Clone, Debug)]
pub struct RequestRecord {
    pub method: Method,
    pub path: String,
    pub status: u16,
    pub duration: Duration,
    pub operation_id: Option<String>,
    /// Request headers minus the excluded ones.
    pub metadata: Vec<(String, String)>,
}

/// Consumes finished [`RequestRecord`]s.
///
/// The default [`TraceRecorder`] emits a structured `tracing` event; plug in
/// your own to ship records elsewhere or to enrich them — the middleware owns
/// the start/stop timing either way, so a custom recorder only decides what
/// to do with the finished record.
pub trait Recorder: Send + Sync + 'static {
    fn record(&self, record: RequestRecord);
}

/// Emits each record as a `tracing` info event.
#[derive(Clone, Copy, Debug, Default)]
pub struct TraceRecorder;

impl Recorder for TraceRecorder {
    fn record(&self, record: RequestRecord) {
        info!(
            method = %record.method,
            path = %record.path,
            status = record.status,
            duration_ms = record.duration.as_millis() as u64,
            operation_id = record.operation_id.as_deref().unwrap_or(""),
            "request tracked",
        );
    }
}

// ── RequestTracking ───────────────────────────────────────────────────────────

/// Emits one [`RequestRecord`] per request that passes through.
///
/// Baseline metadata (method, path, headers minus exclusions) and the start
/// instant are captured before the downstream chain runs; the record is
/// finished and handed to the recorder after it returns, whatever the
/// outcome. Failed requests are recorded with the status code their failure
/// maps to — the same code the error-handling stage will put on the wire.
///
/// Requests matching an excluded path prefix produce no record at all.
///
/// Compose this stage inside correlation so records carry the operation id.
pub struct RequestTracking<R: Recorder = TraceRecorder> {
    next: BoxedHandler,
    options: RequestTrackingOptions,
    recorder: Arc<R>,
}

impl RequestTracking<TraceRecorder> {
    /// Wraps `next` with tracking that logs through `tracing`.
    pub fn wrap(next: impl Handler, options: RequestTrackingOptions) -> Self {
        Self::around(next.into_boxed_handler(), options, TraceRecorder)
    }
}

impl<R: Recorder> RequestTracking<R> {
    /// Wraps `next` with tracking that hands records to `recorder`.
    pub fn wrap_with(next: impl Handler, options: RequestTrackingOptions, recorder: R) -> Self {
        Self::around(next.into_boxed_handler(), options, recorder)
    }

    pub(crate) fn around(next: BoxedHandler, options: RequestTrackingOptions, recorder: R) -> Self {
        Self { next, options, recorder: Arc::new(recorder) }
    }
}

impl<R: Recorder> ErasedHandler for RequestTracking<R> {
    fn call(&self, req: Request) -> BoxFuture {
        let next = Arc::clone(&self.next);

        if self.options.path_is_excluded(req.path()) {
            return Box::pin(async move { next.call(req).await });
        }

        let recorder = Arc::clone(&self.recorder);

        // Baseline: everything the record needs that the request owns, taken
        // before ownership moves downstream.
        let method = req.method();
        let path = req.path().to_owned();
        let operation_id = req
            .correlation()
            .map(|info| info.operation_id().to_owned());
        let metadata: Vec<(String, String)> = req
            .headers()
            .iter()
            .filter(|(name, _)| !self.options.header_is_excluded(name))
            .cloned()
            .collect();

        Box::pin(async move {
            let start = Instant::now();
            let outcome = next.call(req).await;
            let duration = start.elapsed();

            let status = match &outcome {
                Ok(res) => res.status_code(),
                Err(failure) => failure.status(),
            };

            recorder.record(RequestRecord {
                method,
                path,
                status,
                duration,
                operation_id,
                metadata,
            });

            outcome
        })
    }
}

impl<R: Recorder> private::Sealed for RequestTracking<R> {}

impl<R: Recorder> Handler for RequestTracking<R> {
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(self)
    }
}
