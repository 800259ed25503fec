//! Request correlation: W3C trace context, legacy hierarchical ids and the
//! per-request service that propagates them to dependencies.

mod context;
mod headers;
mod parser;
mod properties;
mod request_id;
mod service;
mod traceparent;

pub use context::CorrelationContext;
pub use headers::{
    CORRELATION_CONTEXT_HEADER, CorrelationHeaders, InboundCorrelationHeaders, PARENT_ID_HEADER,
    REQUEST_ID_HEADER, ROOT_ID_HEADER, TRACEPARENT_HEADER, TRACESTATE_HEADER,
};
pub use parser::{HostTraceContext, InboundRequest, ParsedCorrelation, RequestCorrelationParser};
pub use properties::{CorrelationProperties, CorrelationPropertyError};
pub use request_id::{REQUEST_ID_MAX_LENGTH, RequestIdGenerator, generate_root_id, root_id};
pub use service::CorrelationService;
pub use traceparent::{SpanId, TraceId, TraceParent, is_valid_span_id, is_valid_trace_id};
