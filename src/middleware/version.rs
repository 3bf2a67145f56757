//! Version-tracking middleware: stamp the running version onto responses.

use std::fmt;
use std::sync::Arc;

use crate::correlation::validated_header_name;
use crate::handler::{private, BoxFuture, BoxedHandler, ErasedHandler, Handler};
use crate::request::Request;

/// Default response header carrying the version value.
pub const VERSION_HEADER: &str = "X-Version";

#[derive(Clone)]
enum VersionValue {
    Fixed(String),
    Provider(Arc<dyn Fn() -> String + Send + Sync>),
}

/// Configuration for version tracking.
///
/// The version is either a fixed string (typically
/// `env!("CARGO_PKG_VERSION")`) or a provider function resolved per response.
#[derive(Clone)]
pub struct VersionTrackingOptions {
    header_name: String,
    version: VersionValue,
}

impl VersionTrackingOptions {
    /// Stamps `version` under the default [`VERSION_HEADER`].
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            header_name: VERSION_HEADER.to_owned(),
            version: VersionValue::Fixed(version.into()),
        }
    }

    /// Resolves the version per response instead of fixing it up front.
    pub fn with_provider(provider: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self {
            header_name: VERSION_HEADER.to_owned(),
            version: VersionValue::Provider(Arc::new(provider)),
        }
    }

    /// Changes the response header the version is written to.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not a valid header name.
    pub fn header_name(mut self, name: &str) -> Self {
        self.header_name = validated_header_name(name, "version header");
        self
    }

    fn resolve(&self) -> String {
        match &self.version {
            VersionValue::Fixed(v) => v.clone(),
            VersionValue::Provider(f) => f(),
        }
    }
}

impl fmt::Debug for VersionTrackingOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionTrackingOptions")
            .field("header_name", &self.header_name)
            .finish_non_exhaustive()
    }
}

/// Sets the configured version header on every outgoing response — including
/// mapped error responses, via the failure's header list.
///
/// **Only attach this to non-public routes.** The version of a deployment is
/// reconnaissance gold; nothing here checks route visibility for you.
pub struct VersionTracking {
    next: BoxedHandler,
    options: VersionTrackingOptions,
}

impl VersionTracking {
    /// Wraps `next` with version stamping.
    pub fn wrap(next: impl Handler, options: VersionTrackingOptions) -> Self {
        Self::around(next.into_boxed_handler(), options)
    }

    pub(crate) fn around(next: BoxedHandler, options: VersionTrackingOptions) -> Self {
        Self { next, options }
    }
}

impl ErasedHandler for VersionTracking {
    fn call(&self, req: Request) -> BoxFuture {
        let next = Arc::clone(&self.next);
        let options = self.options.clone();

        Box::pin(async move {
            match next.call(req).await {
                Ok(mut res) => {
                    res.set_header(&options.header_name, options.resolve());
                    Ok(res)
                }
                Err(mut failure) => {
                    failure.push_header(&options.header_name, options.resolve());
                    Err(failure)
                }
            }
        })
    }
}

impl private::Sealed for VersionTracking {}

impl Handler for VersionTracking {
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(self)
    }
}
