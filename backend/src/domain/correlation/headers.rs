//! Correlation header names and the typed header sets read from inbound
//! requests and attached to outbound calls.

/// Legacy hierarchical request id.
pub const REQUEST_ID_HEADER: &str = "request-id";
/// Legacy parent id.
pub const PARENT_ID_HEADER: &str = "x-ms-request-id";
/// Legacy root id.
pub const ROOT_ID_HEADER: &str = "x-ms-request-root-id";
/// W3C trace parent.
pub const TRACEPARENT_HEADER: &str = "traceparent";
/// W3C vendor trace state.
pub const TRACESTATE_HEADER: &str = "tracestate";
/// Custom correlation properties.
pub const CORRELATION_CONTEXT_HEADER: &str = "correlation-context";

/// Correlation headers as received on an inbound request.
///
/// Empty header values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundCorrelationHeaders {
    /// `request-id`.
    pub request_id: Option<String>,
    /// `x-ms-request-id`.
    pub legacy_parent_id: Option<String>,
    /// `x-ms-request-root-id`.
    pub legacy_root_id: Option<String>,
    /// `traceparent`.
    pub traceparent: Option<String>,
    /// `tracestate`.
    pub tracestate: Option<String>,
    /// `correlation-context`.
    pub correlation_context: Option<String>,
}

impl InboundCorrelationHeaders {
    /// Collect the correlation headers through a name lookup.
    ///
    /// # Examples
    /// ```
    /// use std::collections::HashMap;
    ///
    /// use backend::domain::correlation::InboundCorrelationHeaders;
    ///
    /// let raw = HashMap::from([("request-id", "|abc.1_"), ("tracestate", "")]);
    /// let headers = InboundCorrelationHeaders::from_lookup(|name| raw.get(name).copied());
    /// assert_eq!(headers.request_id.as_deref(), Some("|abc.1_"));
    /// assert!(headers.tracestate.is_none());
    /// ```
    pub fn from_lookup<'a, F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_owned)
        };
        Self {
            request_id: read(REQUEST_ID_HEADER),
            legacy_parent_id: read(PARENT_ID_HEADER),
            legacy_root_id: read(ROOT_ID_HEADER),
            traceparent: read(TRACEPARENT_HEADER),
            tracestate: read(TRACESTATE_HEADER),
            correlation_context: read(CORRELATION_CONTEXT_HEADER),
        }
    }
}

/// Correlation headers attached to one outbound call.
///
/// The default value is the empty set sent when correlation is disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrelationHeaders {
    request_id: Option<String>,
    parent_id: Option<String>,
    root_id: Option<String>,
    traceparent: Option<String>,
    tracestate: Option<String>,
    correlation_context: Option<String>,
}

impl CorrelationHeaders {
    /// Build the mandatory part of an outbound header set.
    #[must_use]
    pub fn new(
        request_id: impl Into<String>,
        parent_id: impl Into<String>,
        root_id: impl Into<String>,
        traceparent: impl Into<String>,
    ) -> Self {
        Self {
            request_id: Some(request_id.into()),
            parent_id: Some(parent_id.into()),
            root_id: Some(root_id.into()),
            traceparent: Some(traceparent.into()),
            tracestate: None,
            correlation_context: None,
        }
    }

    /// Attach the vendor trace state, if any.
    #[must_use]
    pub fn with_tracestate(mut self, tracestate: Option<String>) -> Self {
        self.tracestate = tracestate;
        self
    }

    /// Attach serialised correlation properties, if any.
    #[must_use]
    pub fn with_correlation_context(mut self, context: Option<String>) -> Self {
        self.correlation_context = context;
        self
    }

    /// `request-id` value.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// `x-ms-request-id` value.
    #[must_use]
    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    /// `x-ms-request-root-id` value.
    #[must_use]
    pub fn root_id(&self) -> Option<&str> {
        self.root_id.as_deref()
    }

    /// `traceparent` value.
    #[must_use]
    pub fn traceparent(&self) -> Option<&str> {
        self.traceparent.as_deref()
    }

    /// `tracestate` value.
    #[must_use]
    pub fn tracestate(&self) -> Option<&str> {
        self.tracestate.as_deref()
    }

    /// `correlation-context` value.
    #[must_use]
    pub fn correlation_context(&self) -> Option<&str> {
        self.correlation_context.as_deref()
    }

    /// Whether no header is populated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Populated `(name, value)` pairs in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        [
            (REQUEST_ID_HEADER, self.request_id()),
            (PARENT_ID_HEADER, self.parent_id()),
            (ROOT_ID_HEADER, self.root_id()),
            (TRACEPARENT_HEADER, self.traceparent()),
            (TRACESTATE_HEADER, self.tracestate()),
            (CORRELATION_CONTEXT_HEADER, self.correlation_context()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|value| (name, value)))
    }
}
