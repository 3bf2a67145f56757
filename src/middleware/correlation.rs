//! Correlation middleware: establish identity in, echo identity out.

use std::sync::Arc;

use crate::correlation::{CorrelationInfo, CorrelationOptions};
use crate::handler::{private, BoxFuture, BoxedHandler, ErasedHandler, Handler};
use crate::request::Request;

/// Establishes the [`CorrelationInfo`] for each request.
///
/// On the way in: reads the transaction id from the configured inbound header
/// (a caller propagating an id keeps its logical operation intact), reads a
/// caller-supplied operation id the same way, generates whatever is missing,
/// and optionally extracts the upstream service id. The finished identity is
/// attached to the request for every downstream stage to read.
///
/// On the way out: writes the operation and transaction ids onto the response
/// headers — or, when the downstream chain failed, onto the failure's header
/// list so the mapped error response still carries them.
///
/// This stage never fails a request. A missing, empty, or garbled header
/// degrades to a locally generated id (or, for the upstream service, to
/// nothing at all).
pub struct Correlation {
    next: BoxedHandler,
    options: CorrelationOptions,
}

impl Correlation {
    /// Wraps `next` with correlation handling.
    pub fn wrap(next: impl Handler, options: CorrelationOptions) -> Self {
        Self::around(next.into_boxed_handler(), options)
    }

    pub(crate) fn around(next: BoxedHandler, options: CorrelationOptions) -> Self {
        Self { next, options }
    }
}

impl ErasedHandler for Correlation {
    fn call(&self, mut req: Request) -> BoxFuture {
        let next = Arc::clone(&self.next);
        let options = self.options.clone();

        Box::pin(async move {
            let operation_id = inbound_or_generated(&req, &options.operation_header, &options);
            let transaction_id = inbound_or_generated(&req, &options.transaction_header, &options);

            let upstream_service_id = if options.upstream_service.extract_from_request {
                non_empty_header(&req, &options.upstream_service.header_name)
            } else {
                None
            };

            req.set_correlation(CorrelationInfo::new(
                operation_id.clone(),
                transaction_id.clone(),
                upstream_service_id,
            ));

            match next.call(req).await {
                Ok(mut res) => {
                    res.set_header(&options.operation_header, operation_id);
                    res.set_header(&options.transaction_header, transaction_id);
                    Ok(res)
                }
                Err(mut failure) => {
                    failure.push_header(&options.operation_header, operation_id);
                    failure.push_header(&options.transaction_header, transaction_id);
                    Err(failure)
                }
            }
        })
    }
}

impl private::Sealed for Correlation {}

impl Handler for Correlation {
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(self)
    }
}

fn non_empty_header(req: &Request, name: &str) -> Option<String> {
    req.header(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

fn inbound_or_generated(req: &Request, header: &str, options: &CorrelationOptions) -> String {
    non_empty_header(req, header).unwrap_or_else(|| (options.generator)())
}
