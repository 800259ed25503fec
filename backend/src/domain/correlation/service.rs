//! Per-request correlation service.
//!
//! One service is created for each inbound request and shared (behind an
//! `Arc`) by every dependency call the request makes. It mints outbound
//! correlation headers and tags dependency telemetry with the operation.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::domain::ports::TelemetrySink;
use crate::domain::{DependencyTelemetry, OperationTags, TaggedDependency};

use super::context::CorrelationContext;
use super::headers::CorrelationHeaders;
use super::parser::ParsedCorrelation;
use super::traceparent::TraceParent;

/// Correlation for one request.
///
/// Without a telemetry sink the service is disabled: it emits no headers and
/// drops dependency records.
pub struct CorrelationService {
    context: CorrelationContext,
    trace_parent: Mutex<TraceParent>,
    sink: Option<Arc<dyn TelemetrySink>>,
}

impl std::fmt::Debug for CorrelationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationService")
            .field("context", &self.context)
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

impl CorrelationService {
    /// Build the service for a parsed request.
    #[must_use]
    pub fn new(parsed: ParsedCorrelation, sink: Option<Arc<dyn TelemetrySink>>) -> Self {
        let context = CorrelationContext::from(parsed);
        Self {
            trace_parent: Mutex::new(context.trace_parent),
            context,
            sink,
        }
    }

    /// Whether telemetry is wired up for this request.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Operation id.
    #[must_use]
    pub fn operation_id(&self) -> &str {
        &self.context.operation_id
    }

    /// Operation name.
    #[must_use]
    pub fn operation_name(&self) -> &str {
        &self.context.operation_name
    }

    /// Span id dependency calls are parented to.
    #[must_use]
    pub fn operation_parent_id(&self) -> &str {
        &self.context.operation_parent_id
    }

    /// Latest trace position; advances with every outbound header set.
    #[must_use]
    pub fn current_trace_parent(&self) -> TraceParent {
        *self.lock_trace_parent()
    }

    /// Headers for one outbound call.
    ///
    /// Each call takes a fresh span and stores it, so consecutive calls chain
    /// from one another.
    pub fn outgoing_headers(&self) -> CorrelationHeaders {
        if !self.is_enabled() {
            return CorrelationHeaders::default();
        }
        let trace_parent = {
            let mut current = self.lock_trace_parent();
            *current = current.with_new_span();
            *current
        };
        let request_id = trace_parent.legacy_request_id();
        CorrelationHeaders::new(
            request_id.clone(),
            self.context.operation_id.clone(),
            request_id,
            trace_parent.to_header_string(),
        )
        .with_tracestate(self.context.trace_state.clone())
        .with_correlation_context(self.context.properties.to_header())
    }

    /// Tag `dependency` with this operation and hand it to the sink.
    ///
    /// Sink failures are logged and swallowed.
    pub fn track_dependency(&self, dependency: DependencyTelemetry) {
        let Some(sink) = &self.sink else {
            return;
        };
        let tagged = TaggedDependency {
            dependency,
            tags: OperationTags {
                operation_id: self.context.operation_id.clone(),
                operation_name: self.context.operation_name.clone(),
                operation_parent_id: self.context.operation_parent_id.clone(),
            },
        };
        if let Err(error) = sink.submit(tagged) {
            debug!(
                %error,
                operation_id = %self.context.operation_id,
                "dropping dependency telemetry"
            );
        }
    }

    fn lock_trace_parent(&self) -> std::sync::MutexGuard<'_, TraceParent> {
        self.trace_parent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
