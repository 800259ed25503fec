//! Correlation middleware attaching a request-scoped correlation service.
//!
//! Each incoming request is parsed for W3C and legacy correlation headers.
//! The resulting [`CorrelationService`] is stored in the request extensions
//! for handlers, and its operation id is scoped in task-local storage so
//! errors pick it up. Every response echoes the operation id in a
//! `trace-id` header.
//!
//! Tokio task-local variables are not inherited across spawned tasks. Use
//! [`OperationId::scope`] when spawning new tasks to keep the id visible.

use std::sync::Arc;
use std::task::{Context, Poll};

use actix_web::dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{FromRequest, HttpMessage, HttpRequest};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::{debug, error};

use crate::domain::correlation::{
    CorrelationService, InboundCorrelationHeaders, InboundRequest, RequestCorrelationParser,
    RequestIdGenerator,
};
use crate::domain::ports::TelemetrySink;
use crate::domain::{Error, OperationId, TRACE_ID_HEADER};

/// Middleware deriving the correlation identity of every request.
///
/// # Examples
/// ```
/// use std::sync::Arc;
///
/// use actix_web::App;
/// use backend::domain::correlation::RequestIdGenerator;
/// use backend::inbound::http::correlation::RequestCorrelation;
///
/// let app = App::new().wrap(RequestCorrelation::new(Arc::new(RequestIdGenerator::new()), None));
/// ```
#[derive(Clone)]
pub struct RequestCorrelation {
    ids: Arc<RequestIdGenerator>,
    sink: Option<Arc<dyn TelemetrySink>>,
}

impl RequestCorrelation {
    /// Correlate requests with ids from `ids`, reporting to `sink`.
    ///
    /// Without a sink, dependency telemetry and outgoing correlation headers
    /// are disabled.
    pub fn new(ids: Arc<RequestIdGenerator>, sink: Option<Arc<dyn TelemetrySink>>) -> Self {
        Self { ids, sink }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestCorrelation
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = RequestCorrelationMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestCorrelationMiddleware {
            service,
            ids: Arc::clone(&self.ids),
            sink: self.sink.clone(),
        }))
    }
}

/// Service wrapper produced by [`RequestCorrelation`].
pub struct RequestCorrelationMiddleware<S> {
    service: S,
    ids: Arc<RequestIdGenerator>,
    sink: Option<Arc<dyn TelemetrySink>>,
}

impl<S> RequestCorrelationMiddleware<S> {
    fn correlate(&self, req: &ServiceRequest) -> Arc<CorrelationService> {
        let headers = InboundCorrelationHeaders::from_lookup(|name| {
            req.headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
        });
        let parsed = RequestCorrelationParser::new(&self.ids).parse(
            InboundRequest {
                method: req.method().as_str(),
                path: req.path(),
                headers: &headers,
            },
            None,
        );
        Arc::new(CorrelationService::new(parsed, self.sink.clone()))
    }
}

impl<S, B> Service<ServiceRequest> for RequestCorrelationMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let correlation = self.correlate(&req);
        let operation_id = OperationId::new(correlation.operation_id());
        debug!(
            operation_id = %operation_id,
            operation_name = %correlation.operation_name(),
            parent_id = %correlation.operation_parent_id(),
            "request correlated"
        );
        req.extensions_mut().insert(Correlation(correlation));
        let header_value = operation_id.to_string();
        let fut = OperationId::scope(operation_id.clone(), self.service.call(req));
        Box::pin(async move {
            let mut res = fut.await?;
            match HeaderValue::from_str(&header_value) {
                Ok(value) => {
                    res.response_mut()
                        .headers_mut()
                        .insert(HeaderName::from_static(TRACE_ID_HEADER), value);
                }
                Err(error) => {
                    error!(
                        %error,
                        operation_id = %operation_id,
                        "failed to encode operation id header"
                    );
                }
            }
            Ok(res)
        })
    }
}

/// Extractor yielding the request's correlation service.
///
/// Requires the [`RequestCorrelation`] middleware.
#[derive(Clone)]
pub struct Correlation(pub Arc<CorrelationService>);

impl FromRequest for Correlation {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Self>()
                .cloned()
                .ok_or_else(|| Error::internal("request correlation middleware is not installed")),
        )
    }
}

#[cfg(test)]
#[path = "correlation_tests.rs"]
mod tests;
