//! Pipeline composition: wiring the middlewares around the application handler.

use crate::correlation::CorrelationOptions;
use crate::handler::{BoxedHandler, Handler, Outcome};
use crate::middleware::{
    Category, Correlation, ErrorHandling, Recorder, RequestTracking, RequestTrackingOptions,
    TraceRecorder, VersionTracking, VersionTrackingOptions,
};
use crate::request::Request;

/// The composed middleware chain for one service.
///
/// Each `with_*` call takes the in-progress chain and returns it extended by
/// one stage wrapped *around* everything added so far. Compose inside-out:
/// the application handler first, error handling last, so that a failure
/// anywhere — in correlation, in tracking, in the handler — is still caught
/// and mapped:
///
/// ```rust
/// use pylon::{Category, CorrelationOptions, Pipeline, Request, Response,
///             RequestTrackingOptions, VersionTrackingOptions};
///
/// async fn handler(_req: Request) -> Response {
///     Response::text("hello")
/// }
///
/// let pipeline = Pipeline::new(handler)
///     .with_version_tracking(VersionTrackingOptions::new(env!("CARGO_PKG_VERSION")))
///     .with_request_tracking(RequestTrackingOptions::default().exclude_path("/healthz"))
///     .with_correlation(CorrelationOptions::default())
///     .with_error_handling(Category::fixed("orders-api"));
/// ```
///
/// Requests enter through [`Pipeline::handle`]. Configuration is validated
/// by the options types at construction; a pipeline that builds is a
/// pipeline that runs.
pub struct Pipeline {
    chain: BoxedHandler,
}

impl Pipeline {
    /// Starts a pipeline from the application's request handler.
    pub fn new(handler: impl Handler) -> Self {
        Self { chain: handler.into_boxed_handler() }
    }

    /// Adds correlation handling around the current chain.
    pub fn with_correlation(mut self, options: CorrelationOptions) -> Self {
        self.chain = Correlation::around(self.chain, options).into_boxed_handler();
        self
    }

    /// Adds failure mapping around the current chain. Add this last.
    pub fn with_error_handling(mut self, category: Category) -> Self {
        self.chain = ErrorHandling::around(self.chain, category).into_boxed_handler();
        self
    }

    /// Adds request tracking (via `tracing`) around the current chain.
    pub fn with_request_tracking(self, options: RequestTrackingOptions) -> Self {
        self.with_request_tracking_recorder(options, TraceRecorder)
    }

    /// Adds request tracking with a custom [`Recorder`].
    pub fn with_request_tracking_recorder(
        mut self,
        options: RequestTrackingOptions,
        recorder: impl Recorder,
    ) -> Self {
        self.chain = RequestTracking::around(self.chain, options, recorder).into_boxed_handler();
        self
    }

    /// Adds version stamping around the current chain. Non-public routes only.
    pub fn with_version_tracking(mut self, options: VersionTrackingOptions) -> Self {
        self.chain = VersionTracking::around(self.chain, options).into_boxed_handler();
        self
    }

    /// Runs one request through the chain.
    ///
    /// With error handling composed outermost this never returns `Err`; the
    /// `Outcome` shape is kept so partial pipelines (tests, nested reuse)
    /// still surface failures to their caller.
    pub async fn handle(&self, req: Request) -> Outcome {
        self.chain.call(req).await
    }
}
