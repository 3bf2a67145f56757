//! The failure value that replaces exception-based control flow.
//!
//! A stage that cannot produce a [`Response`](crate::Response) returns
//! `Err(Failure)` instead of panicking or throwing. Failures travel back up
//! the chain as ordinary values until the error-handling stage maps them to
//! an HTTP response. Nothing escapes that boundary.

use std::error::Error as StdError;
use std::fmt;

use crate::status::Status;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Classification of a failed request.
#[derive(Debug)]
pub enum FailureKind {
    /// A failure the transport layer already classified — it carries the
    /// status code the client must see (413 for an oversized body, 400 for a
    /// malformed request line, and so on).
    Transport { status: u16, reason: String },
    /// Anything else surfacing from downstream processing. Maps to 500; the
    /// inner error is logged server-side and never reaches the client.
    Internal(BoxError),
}

/// A failed request outcome.
///
/// Besides its [`FailureKind`], a failure accumulates response headers on the
/// unwind path: middlewares that would have stamped a successful response
/// (correlation ids, version header) append here instead, and the
/// error-handling stage copies them onto the replacement response. That is
/// how a 500 still carries the request's correlation identity.
#[derive(Debug)]
pub struct Failure {
    kind: FailureKind,
    headers: Vec<(String, String)>,
}

impl Failure {
    /// A transport-classified failure with an explicit status code.
    pub fn transport(status: u16, reason: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transport { status, reason: reason.into() },
            headers: Vec::new(),
        }
    }

    /// An unclassified failure. Accepts anything convertible to a boxed
    /// error, including plain strings: `Failure::internal("boom")`.
    pub fn internal(err: impl Into<BoxError>) -> Self {
        Self { kind: FailureKind::Internal(err.into()), headers: Vec::new() }
    }

    pub fn kind(&self) -> &FailureKind {
        &self.kind
    }

    /// The HTTP status code this failure maps to: the transport-supplied
    /// code, or 500 for anything unclassified. Pure — request tracking uses
    /// it to record the same status the client will eventually see.
    pub fn status(&self) -> u16 {
        match &self.kind {
            FailureKind::Transport { status, .. } => *status,
            FailureKind::Internal(_) => Status::InternalServerError.into(),
        }
    }

    /// Appends a header destined for the eventual error response.
    pub fn push_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub(crate) fn take_headers(&mut self) -> Vec<(String, String)> {
        std::mem::take(&mut self.headers)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FailureKind::Transport { status, reason } => {
                write!(f, "transport failure ({status}): {reason}")
            }
            FailureKind::Internal(err) => write!(f, "{err}"),
        }
    }
}

impl StdError for Failure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            FailureKind::Transport { .. } => None,
            FailureKind::Internal(err) => Some(err.as_ref()),
        }
    }
}

impl From<std::io::Error> for Failure {
    fn from(e: std::io::Error) -> Self {
        Self::internal(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_keep_their_status() {
        assert_eq!(Failure::transport(413, "body too large").status(), 413);
        assert_eq!(Failure::transport(400, "bad request line").status(), 400);
    }

    #[test]
    fn unclassified_failures_map_to_500() {
        assert_eq!(Failure::internal("boom").status(), 500);
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        assert_eq!(Failure::from(io).status(), 500);
    }

    #[test]
    fn headers_accumulate_in_order() {
        let mut failure = Failure::internal("boom");
        failure.push_header("x-operation-id", "op-1");
        failure.push_header("x-transaction-id", "tx-1");
        assert_eq!(failure.headers().len(), 2);
        assert_eq!(failure.headers()[0].1, "op-1");
    }
}
