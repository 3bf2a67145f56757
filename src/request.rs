//! Incoming HTTP request type.

use crate::correlation::CorrelationInfo;
use crate::method::Method;

/// An incoming HTTP request, built by the integrating server.
///
/// pylon does not parse wire bytes — whatever server drives the pipeline
/// (hyper, a framework, a test) constructs one `Request` per inbound request
/// and hands it to the outermost stage.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Vec<u8>,
    pub(crate) correlation: Option<CorrelationInfo>,
}

impl Request {
    pub fn new(
        method: Method,
        path: impl Into<String>,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Self {
        Self { method, path: path.into(), headers, body, correlation: None }
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The correlation identity of this request.
    ///
    /// `Some` for every stage downstream of the correlation middleware;
    /// `None` if the pipeline was composed without it. The value rides inside
    /// the request itself — there is no ambient current-request global, so
    /// concurrent requests can never observe each other's identity.
    pub fn correlation(&self) -> Option<&CorrelationInfo> {
        self.correlation.as_ref()
    }

    pub(crate) fn set_correlation(&mut self, info: CorrelationInfo) {
        self.correlation = Some(info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let req = Request::new(
            Method::Get,
            "/orders",
            vec![("X-Transaction-ID".to_owned(), "abc".to_owned())],
            Vec::new(),
        );
        assert_eq!(req.header("x-transaction-id"), Some("abc"));
        assert_eq!(req.header("X-TRANSACTION-ID"), Some("abc"));
        assert_eq!(req.header("x-operation-id"), None);
    }
}
