//! Error-handling middleware: the boundary where failures become responses.

use std::fmt;
use std::sync::Arc;

use tracing::error;

use crate::error::{Failure, FailureKind};
use crate::handler::{private, BoxFuture, BoxedHandler, ErasedHandler, Handler, Outcome};
use crate::request::Request;
use crate::response::Response;

// ── Category ──────────────────────────────────────────────────────────────────

/// Names the logging category attached to mapped failures.
///
/// Either a fixed string, or a function resolved once per failure — the
/// deferred form supports categories that depend on runtime context (tenant,
/// deployment slot, …). The default is the empty string.
#[derive(Clone, Default)]
pub enum Category {
    #[default]
    Unnamed,
    Fixed(String),
    Deferred(Arc<dyn Fn() -> String + Send + Sync>),
}

impl Category {
    pub fn fixed(name: impl Into<String>) -> Self {
        Self::Fixed(name.into())
    }

    pub fn deferred(resolve: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self::Deferred(Arc::new(resolve))
    }

    fn resolve(&self) -> String {
        match self {
            Self::Unnamed => String::new(),
            Self::Fixed(name) => name.clone(),
            Self::Deferred(resolve) => resolve(),
        }
    }
}

impl From<&str> for Category {
    fn from(name: &str) -> Self {
        Self::Fixed(name.to_owned())
    }
}

impl fmt::Debug for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unnamed => f.write_str("Category::Unnamed"),
            Self::Fixed(name) => f.debug_tuple("Category::Fixed").field(name).finish(),
            Self::Deferred(_) => f.write_str("Category::Deferred(..)"),
        }
    }
}

// ── ErrorHandling ─────────────────────────────────────────────────────────────

/// Catches every [`Failure`] surfacing from the downstream chain and maps it
/// to a well-formed HTTP response.
///
/// A request is either passed through untouched (the downstream chain
/// produced a response) or faulted exactly once: the failure value is
/// consumed here, the remaining chain is never re-entered, and the client
/// sees only a status code — transport-classified failures keep the code the
/// transport assigned, everything else becomes a 500. The original error is
/// logged at the highest severity, tagged with the configured category,
/// before the replacement response is built. Its message never reaches the
/// response body.
///
/// Compose this stage outermost: failures in correlation or tracking must
/// still be caught and mapped.
///
/// Both the next stage and the category are taken by value at construction —
/// there is no half-built middleware to misconfigure at request time.
pub struct ErrorHandling {
    next: BoxedHandler,
    category: Category,
}

impl ErrorHandling {
    /// Wraps `next` with failure mapping, using `category` for log tagging.
    pub fn wrap(next: impl Handler, category: Category) -> Self {
        Self::around(next.into_boxed_handler(), category)
    }

    pub(crate) fn around(next: BoxedHandler, category: Category) -> Self {
        Self { next, category }
    }
}

/// Logs the failure under `category`, then builds the replacement response.
fn fault(category: &Category, mut failure: Failure) -> Outcome {
    let category = category.resolve();
    let status = failure.status();
    match failure.kind() {
        FailureKind::Transport { reason, .. } => {
            error!(%category, status, reason = %reason, "transport-classified request failure");
        }
        FailureKind::Internal(err) => {
            error!(%category, status, error = %err, "unhandled failure in request chain");
        }
    }

    // Body stays empty; only the status and the headers accumulated on the
    // unwind path go out.
    let mut res = Response { body: Vec::new(), headers: Vec::new(), status };
    for (name, value) in failure.take_headers() {
        res.set_header(&name, value);
    }
    Ok(res)
}

impl ErasedHandler for ErrorHandling {
    fn call(&self, req: Request) -> BoxFuture {
        let next = Arc::clone(&self.next);
        let category = self.category.clone();

        Box::pin(async move {
            match next.call(req).await {
                Ok(res) => Ok(res),
                Err(failure) => fault(&category, failure),
            }
        })
    }
}

impl private::Sealed for ErrorHandling {}

impl Handler for ErrorHandling {
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(self)
    }
}
