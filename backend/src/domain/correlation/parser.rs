//! Derives the correlation identity of an inbound request.
//!
//! Sources are tried in order, first match wins:
//! 1. a trace context supplied by the hosting runtime;
//! 2. W3C `traceparent` / `tracestate` headers;
//! 3. a legacy `request-id` header;
//! 4. legacy `x-ms-request-root-id` / `x-ms-request-id` headers, or a fresh
//!    root when none are present.

use tracing::debug;

use super::headers::InboundCorrelationHeaders;
use super::request_id::{RequestIdGenerator, root_id};
use super::traceparent::TraceParent;

/// Trace context handed over by a hosting runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostTraceContext {
    /// Host-supplied `traceparent` value.
    pub traceparent: String,
    /// Host-supplied `tracestate` value.
    pub tracestate: Option<String>,
}

/// The request facts the parser needs.
#[derive(Debug, Clone, Copy)]
pub struct InboundRequest<'a> {
    /// HTTP method, e.g. `GET`.
    pub method: &'a str,
    /// Request path without the query string.
    pub path: &'a str,
    /// Correlation headers read from the request.
    pub headers: &'a InboundCorrelationHeaders,
}

/// Correlation identity derived for one inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCorrelation {
    /// Id shared by every telemetry item of the logical operation.
    pub operation_id: String,
    /// Id of the caller's span.
    pub parent_id: String,
    /// Id of this request's span.
    pub request_id: String,
    /// `"<METHOD> <path>"` unless overridden.
    pub operation_name: String,
    /// Current W3C trace position.
    pub trace_parent: TraceParent,
    /// Vendor trace state, forwarded untouched.
    pub trace_state: Option<String>,
    /// Raw `correlation-context` header, if any.
    pub correlation_context: Option<String>,
}

impl ParsedCorrelation {
    /// Replace the derived operation name.
    #[must_use]
    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = name.into();
        self
    }
}

/// Parses inbound correlation using a shared request id generator.
#[derive(Debug, Clone, Copy)]
pub struct RequestCorrelationParser<'a> {
    ids: &'a RequestIdGenerator,
}

impl<'a> RequestCorrelationParser<'a> {
    /// Create a parser drawing legacy ids from `ids`.
    #[must_use]
    pub fn new(ids: &'a RequestIdGenerator) -> Self {
        Self { ids }
    }

    /// Derive the correlation identity for `request`.
    #[must_use]
    pub fn parse(
        &self,
        request: InboundRequest<'_>,
        host: Option<&HostTraceContext>,
    ) -> ParsedCorrelation {
        let operation_name = format!("{} {}", request.method, request.path);
        let correlation_context = request.headers.correlation_context.clone();

        if let Some(host) = host {
            match TraceParent::parse(&host.traceparent) {
                Some(incoming) => {
                    return from_trace_parent(
                        incoming,
                        host.tracestate.clone(),
                        operation_name,
                        correlation_context,
                    );
                }
                None => debug!(
                    traceparent = %host.traceparent,
                    "ignoring malformed host trace context"
                ),
            }
        }

        if let Some(header) = request.headers.traceparent.as_deref() {
            match TraceParent::parse(header) {
                Some(incoming) => {
                    return from_trace_parent(
                        incoming,
                        request.headers.tracestate.clone(),
                        operation_name,
                        correlation_context,
                    );
                }
                None => debug!(traceparent = %header, "ignoring malformed traceparent header"),
            }
        }

        if let Some(header) = request.headers.request_id.as_deref() {
            let request_id = self.ids.generate_request_id(header);
            let operation_id = root_id(&request_id).to_owned();
            return ParsedCorrelation {
                trace_parent: TraceParent::from_legacy_root(&operation_id),
                operation_id,
                parent_id: header.to_owned(),
                request_id,
                operation_name,
                trace_state: None,
                correlation_context,
            };
        }

        self.legacy_fallback(request.headers, operation_name, correlation_context)
    }

    fn legacy_fallback(
        &self,
        headers: &InboundCorrelationHeaders,
        operation_name: String,
        correlation_context: Option<String>,
    ) -> ParsedCorrelation {
        let seed = headers
            .legacy_root_id
            .as_deref()
            .or(headers.legacy_parent_id.as_deref())
            .unwrap_or_default();
        let request_id = self.ids.generate_request_id(seed);
        let operation_id = root_id(&request_id).to_owned();
        let parent_id = headers
            .legacy_parent_id
            .clone()
            .unwrap_or_else(|| operation_id.clone());
        ParsedCorrelation {
            trace_parent: TraceParent::from_legacy_root(&operation_id),
            operation_id,
            parent_id,
            request_id,
            operation_name,
            trace_state: None,
            correlation_context,
        }
    }
}

fn from_trace_parent(
    incoming: TraceParent,
    trace_state: Option<String>,
    operation_name: String,
    correlation_context: Option<String>,
) -> ParsedCorrelation {
    let own = incoming.with_new_span();
    ParsedCorrelation {
        operation_id: incoming.trace_id().to_string(),
        parent_id: incoming.legacy_request_id(),
        request_id: own.legacy_request_id(),
        operation_name,
        trace_parent: own,
        trace_state,
        correlation_context,
    }
}
