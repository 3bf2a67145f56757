//! Correlation identity: who is this request, and which logical operation
//! does it belong to.
//!
//! Two identifiers let independent log lines be reassembled afterwards:
//!
//! - **operation id** — unique to this single request instance, always
//!   freshly generated.
//! - **transaction id** — identifies a logical multi-request operation;
//!   propagated from the inbound header when a caller supplies one, else
//!   generated here and handed back so the caller can start propagating it.
//!
//! A third, optional **upstream service id** names the calling service, read
//! from a configurable header only when extraction is switched on.
//!
//! The identity is created once by the correlation middleware, rides inside
//! the [`Request`](crate::Request) for the rest of the chain, and is dropped
//! with it. There is no process-wide "current correlation" accessor on
//! purpose: ambient state is how one request's identity leaks into another.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

/// Default inbound/outbound header carrying the operation id.
pub const OPERATION_ID_HEADER: &str = "X-Operation-ID";
/// Default inbound/outbound header carrying the transaction id.
pub const TRANSACTION_ID_HEADER: &str = "X-Transaction-ID";
/// Default inbound header naming the calling service.
pub const UPSTREAM_SERVICE_HEADER: &str = "X-Upstream-Service";

/// Generates new correlation identifiers. Defaults to UUID v4.
pub type IdGenerator = Arc<dyn Fn() -> String + Send + Sync>;

// ── CorrelationInfo ───────────────────────────────────────────────────────────

/// The correlation identity of one in-flight request.
///
/// Immutable after creation; cloning is cheap (three small strings) and every
/// clone still describes the same request.
#[derive(Clone, Debug)]
pub struct CorrelationInfo {
    operation_id: String,
    transaction_id: String,
    upstream_service_id: Option<String>,
}

impl CorrelationInfo {
    pub(crate) fn new(
        operation_id: String,
        transaction_id: String,
        upstream_service_id: Option<String>,
    ) -> Self {
        Self { operation_id, transaction_id, upstream_service_id }
    }

    /// Identifies this single request instance.
    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    /// Identifies the logical multi-request operation this request is part of.
    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    /// The calling service, when upstream extraction is enabled and the
    /// caller identified itself.
    pub fn upstream_service_id(&self) -> Option<&str> {
        self.upstream_service_id.as_deref()
    }
}

// ── Options ───────────────────────────────────────────────────────────────────

/// Configuration for the upstream-service part of correlation.
#[derive(Clone, Debug)]
pub struct UpstreamServiceOptions {
    pub(crate) extract_from_request: bool,
    pub(crate) header_name: String,
}

impl Default for UpstreamServiceOptions {
    fn default() -> Self {
        Self {
            extract_from_request: false,
            header_name: UPSTREAM_SERVICE_HEADER.to_owned(),
        }
    }
}

/// Configuration for the correlation middleware.
///
/// Immutable once the pipeline is built. Header names are validated here, at
/// construction — a bad name is a deployment mistake and must abort startup,
/// not surface per request.
///
/// ```rust
/// use pylon::CorrelationOptions;
///
/// let options = CorrelationOptions::default()
///     .transaction_header("X-Txn-ID")
///     .extract_upstream_service(true);
/// ```
#[derive(Clone)]
pub struct CorrelationOptions {
    pub(crate) operation_header: String,
    pub(crate) transaction_header: String,
    pub(crate) upstream_service: UpstreamServiceOptions,
    pub(crate) generator: IdGenerator,
}

impl Default for CorrelationOptions {
    fn default() -> Self {
        Self {
            operation_header: OPERATION_ID_HEADER.to_owned(),
            transaction_header: TRANSACTION_ID_HEADER.to_owned(),
            upstream_service: UpstreamServiceOptions::default(),
            generator: Arc::new(|| Uuid::new_v4().to_string()),
        }
    }
}

impl CorrelationOptions {
    /// Sets the header carrying the operation id.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not a valid header name.
    pub fn operation_header(mut self, name: &str) -> Self {
        self.operation_header = validated_header_name(name, "operation id header");
        self
    }

    /// Sets the header carrying the transaction id.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not a valid header name.
    pub fn transaction_header(mut self, name: &str) -> Self {
        self.transaction_header = validated_header_name(name, "transaction id header");
        self
    }

    /// Enables or disables reading the upstream-service header.
    pub fn extract_upstream_service(mut self, enabled: bool) -> Self {
        self.upstream_service.extract_from_request = enabled;
        self
    }

    /// Sets the header naming the calling service.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not a valid header name.
    pub fn upstream_service_header(mut self, name: &str) -> Self {
        self.upstream_service.header_name =
            validated_header_name(name, "upstream service header");
        self
    }

    /// Replaces the id generator. The default generates UUID v4 strings.
    pub fn id_generator(mut self, generator: impl Fn() -> String + Send + Sync + 'static) -> Self {
        self.generator = Arc::new(generator);
        self
    }
}

impl fmt::Debug for CorrelationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorrelationOptions")
            .field("operation_header", &self.operation_header)
            .field("transaction_header", &self.transaction_header)
            .field("upstream_service", &self.upstream_service)
            .finish_non_exhaustive()
    }
}

/// Validates a configured header name, panicking on startup mistakes.
pub(crate) fn validated_header_name(name: &str, what: &str) -> String {
    let is_token = !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        });
    if !is_token {
        panic!("invalid {what} `{name}`: header names must be non-empty HTTP tokens");
    }
    name.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_generator_produces_unique_non_empty_ids() {
        let options = CorrelationOptions::default();
        let a = (options.generator)();
        let b = (options.generator)();
        assert!(!a.is_empty());
        assert_ne!(a, b);
    }

    #[test]
    fn custom_generator_is_used() {
        let options = CorrelationOptions::default().id_generator(|| "fixed".to_owned());
        assert_eq!((options.generator)(), "fixed");
    }

    #[test]
    #[should_panic(expected = "invalid transaction id header")]
    fn empty_header_name_fails_at_construction() {
        let _ = CorrelationOptions::default().transaction_header("");
    }

    #[test]
    #[should_panic(expected = "invalid operation id header")]
    fn header_name_with_spaces_fails_at_construction() {
        let _ = CorrelationOptions::default().operation_header("X Operation");
    }
}
