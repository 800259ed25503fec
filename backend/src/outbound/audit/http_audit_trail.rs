//! Reqwest-backed audit trail adapter.
//!
//! This adapter owns transport details only: the static key header, the
//! correlation headers, the JSON body and status mapping.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use crate::domain::correlation::CorrelationHeaders;
use crate::domain::ports::{AuditReceipt, AuditTrail, AuditTrailError};
use crate::domain::{AuditRecordRequest, DependencyKind, DependencyTarget};

/// Header carrying the static audit service credential.
pub const AUDIT_KEY_HEADER: &str = "x-functions-key";

/// Audit trail that POSTs records to an HTTP endpoint.
pub struct HttpAuditTrail {
    client: Client,
    endpoint: Url,
    key: String,
}

impl HttpAuditTrail {
    /// Build an adapter with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        endpoint: Url,
        key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            key: key.into(),
        })
    }
}

#[async_trait]
impl AuditTrail for HttpAuditTrail {
    fn dependency_target(&self) -> DependencyTarget {
        DependencyTarget {
            kind: DependencyKind::Http,
            data: format!("POST {}", self.endpoint),
            name: format!("POST {}", self.endpoint.path()),
            target: self.endpoint.host_str().unwrap_or_default().to_owned(),
        }
    }

    async fn record(
        &self,
        request: &AuditRecordRequest,
        headers: &CorrelationHeaders,
    ) -> Result<AuditReceipt, AuditTrailError> {
        let mut outgoing = self
            .client
            .post(self.endpoint.clone())
            .header(AUDIT_KEY_HEADER, self.key.as_str())
            .json(request);
        for (name, value) in headers.iter() {
            outgoing = outgoing.header(name, value);
        }
        let response = outgoing.send().await.map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "audit service accepted record");
            return Ok(AuditReceipt {
                status: status.as_u16(),
            });
        }
        let body = response.text().await.unwrap_or_default();
        Err(map_status_error(status, &body))
    }
}

fn map_transport_error(error: reqwest::Error) -> AuditTrailError {
    if error.is_timeout() {
        AuditTrailError::timeout(error.to_string())
    } else {
        AuditTrailError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &str) -> AuditTrailError {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let preview = body
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(PREVIEW_CHAR_LIMIT)
        .collect::<String>();
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        preview
    };
    if status == StatusCode::TOO_MANY_REQUESTS {
        AuditTrailError::throttled(message)
    } else {
        AuditTrailError::rejected(status.as_u16(), message)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for the audit HTTP adapter.

    use std::sync::{Arc, Mutex};

    use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
    use rstest::rstest;
    use serde_json::Value;

    use super::*;
    use crate::domain::{AuditOperation, AuditResource, ResourceType};

    #[derive(Default)]
    struct Seen {
        key: Option<String>,
        traceparent: Option<String>,
        body: Option<Value>,
    }

    async fn capture(
        request: HttpRequest,
        body: web::Json<Value>,
        seen: web::Data<Arc<Mutex<Seen>>>,
        status: web::Data<u16>,
    ) -> HttpResponse {
        let header = |name: &str| {
            request
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
        };
        let mut seen = seen.lock().expect("seen lock");
        seen.key = header(AUDIT_KEY_HEADER);
        seen.traceparent = header("traceparent");
        seen.body = Some(body.into_inner());
        let status = actix_web::http::StatusCode::from_u16(*status.get_ref())
            .expect("valid status");
        HttpResponse::build(status).body("audit store says no")
    }

    fn serve(status: u16) -> (Url, Arc<Mutex<Seen>>) {
        let seen = Arc::new(Mutex::new(Seen::default()));
        let shared = seen.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(shared.clone()))
                .app_data(web::Data::new(status))
                .route("/api/audit", web::post().to(capture))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("bind audit stub");
        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());
        let url = Url::parse(&format!("http://{addr}/api/audit")).expect("stub url");
        (url, seen)
    }

    fn request() -> AuditRecordRequest {
        AuditRecordRequest::new(AuditResource::new(
            ResourceType::Patient,
            "p-1",
            AuditOperation::Read,
        ))
    }

    fn headers() -> CorrelationHeaders {
        CorrelationHeaders::new(
            "|0af7651916cd43dd8448eb211c80319c.b7ad6b7169203331.",
            "0af7651916cd43dd8448eb211c80319c",
            "|0af7651916cd43dd8448eb211c80319c.b7ad6b7169203331.",
            "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01",
        )
    }

    #[actix_web::test]
    async fn posts_the_record_with_key_and_correlation_headers() {
        let (url, seen) = serve(201);
        let trail = HttpAuditTrail::new(url, "secret", Duration::from_secs(5)).expect("client");

        let receipt = trail
            .record(&request(), &headers())
            .await
            .expect("audit accepted");

        assert_eq!(receipt.status, 201);
        let seen = seen.lock().expect("seen lock");
        assert_eq!(seen.key.as_deref(), Some("secret"));
        assert_eq!(
            seen.traceparent.as_deref(),
            Some("00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01")
        );
        let body = seen.body.as_ref().expect("body captured");
        assert_eq!(body["sourceSystemName"], "PatientTestApi");
        assert_eq!(body["resource"]["type"], "patient");
        assert_eq!(body["resource"]["operation"], "read");
    }

    #[actix_web::test]
    async fn throttling_is_reported_as_throttled() {
        let (url, _) = serve(429);
        let trail = HttpAuditTrail::new(url, "secret", Duration::from_secs(5)).expect("client");

        let error = trail
            .record(&request(), &headers())
            .await
            .expect_err("throttled");

        assert!(matches!(error, AuditTrailError::Throttled { .. }));
    }

    #[actix_web::test]
    async fn other_failures_carry_the_status() {
        let (url, _) = serve(503);
        let trail = HttpAuditTrail::new(url, "secret", Duration::from_secs(5)).expect("client");

        let error = trail
            .record(&request(), &headers())
            .await
            .expect_err("rejected");

        assert_eq!(error.status(), Some(503));
    }

    #[rstest]
    #[case::empty_body("", "status 500")]
    #[case::compacts_whitespace("  down\n for   maintenance ", "down for maintenance")]
    fn rejection_messages_preview_the_body(#[case] body: &str, #[case] expected: &str) {
        let error = map_status_error(StatusCode::INTERNAL_SERVER_ERROR, body);
        assert_eq!(error, AuditTrailError::rejected(500_u16, expected));
    }

    #[rstest]
    fn dependency_target_names_the_endpoint() {
        let url = Url::parse("https://audit.example.net/api/audit").expect("url");
        let trail = HttpAuditTrail::new(url, "k", Duration::from_secs(1)).expect("client");
        let target = trail.dependency_target();
        assert_eq!(target.kind, DependencyKind::Http);
        assert_eq!(target.name, "POST /api/audit");
        assert_eq!(target.target, "audit.example.net");
    }
}
