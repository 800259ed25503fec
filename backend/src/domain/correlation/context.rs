//! Per-request correlation context.

use super::parser::ParsedCorrelation;
use super::properties::CorrelationProperties;
use super::traceparent::TraceParent;

/// Correlation identity of one inbound request.
///
/// The parent id recorded here is this request's own span id, so
/// dependency calls made while serving the request hang beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationContext {
    /// Operation id.
    pub operation_id: String,
    /// Span id dependency calls are parented to.
    pub operation_parent_id: String,
    /// Operation name.
    pub operation_name: String,
    /// W3C trace position at creation.
    pub trace_parent: TraceParent,
    /// Vendor trace state.
    pub trace_state: Option<String>,
    /// Custom correlation properties.
    pub properties: CorrelationProperties,
}

impl From<ParsedCorrelation> for CorrelationContext {
    fn from(parsed: ParsedCorrelation) -> Self {
        let operation_parent_id = if parsed.request_id.is_empty() {
            parsed.operation_id.clone()
        } else {
            parsed.request_id
        };
        let properties = parsed
            .correlation_context
            .as_deref()
            .map(CorrelationProperties::from_header)
            .unwrap_or_default();
        Self {
            operation_id: parsed.operation_id,
            operation_parent_id,
            operation_name: parsed.operation_name,
            trace_parent: parsed.trace_parent,
            trace_state: parsed.trace_state,
            properties,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;

    use super::*;

    fn parsed(request_id: &str) -> ParsedCorrelation {
        ParsedCorrelation {
            operation_id: "op".to_owned(),
            parent_id: "|op.caller.".to_owned(),
            request_id: request_id.to_owned(),
            operation_name: "GET /".to_owned(),
            trace_parent: TraceParent::generate(),
            trace_state: None,
            correlation_context: Some("tenant=a".to_owned()),
        }
    }

    #[rstest]
    #[case("|op.1_", "|op.1_")]
    #[case("", "op")]
    fn parent_is_the_request_span(#[case] request_id: &str, #[case] expected: &str) {
        let context = CorrelationContext::from(parsed(request_id));
        assert_eq!(context.operation_parent_id, expected);
    }

    #[rstest]
    fn properties_come_from_the_header() {
        let context = CorrelationContext::from(parsed("|op.1_"));
        assert_eq!(context.properties.get("tenant"), Some("a"));
    }
}
