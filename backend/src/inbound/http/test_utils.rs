//! Test helpers for inbound HTTP components.

use std::sync::{Arc, Mutex, PoisonError};

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, web};
use async_trait::async_trait;

use crate::domain::correlation::{
    CorrelationHeaders, CorrelationService, InboundCorrelationHeaders, InboundRequest,
    RequestCorrelationParser, RequestIdGenerator,
};
use crate::domain::ports::{AuditReceipt, AuditTrail, AuditTrailError};
use crate::domain::{
    AuditRecordRequest, AuditResource, DependencyKind, DependencyTarget, Gender, Patient,
    PatientDetails, RecordServices, TestDetails, TestRecord,
};
use crate::inbound::http::configure_api;
use crate::inbound::http::correlation::RequestCorrelation;
use crate::inbound::http::state::HttpState;
use crate::outbound::document_store::InMemoryDocumentStore;

/// Audit trail that remembers what it was asked to record.
pub struct RecordingAuditTrail {
    fail: bool,
    records: Mutex<Vec<AuditResource>>,
}

impl RecordingAuditTrail {
    /// A trail accepting every record.
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            records: Mutex::new(Vec::new()),
        })
    }

    /// A trail rejecting every record with a server error.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            records: Mutex::new(Vec::new()),
        })
    }

    /// Resources recorded so far, oldest first.
    pub fn recorded(&self) -> Vec<AuditResource> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl AuditTrail for RecordingAuditTrail {
    fn dependency_target(&self) -> DependencyTarget {
        DependencyTarget {
            kind: DependencyKind::Http,
            data: "POST http://audit.test/api/audit".to_owned(),
            name: "POST /api/audit".to_owned(),
            target: "audit.test".to_owned(),
        }
    }

    async fn record(
        &self,
        request: &AuditRecordRequest,
        _headers: &CorrelationHeaders,
    ) -> Result<AuditReceipt, AuditTrailError> {
        if self.fail {
            return Err(AuditTrailError::rejected(500_u16, "audit store down"));
        }
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.resource.clone());
        Ok(AuditReceipt { status: 201 })
    }
}

/// An in-memory store and a recording trail behind the HTTP surface.
pub struct TestContext {
    pub store: Arc<InMemoryDocumentStore>,
    pub trail: Arc<RecordingAuditTrail>,
    pub state: HttpState,
}

impl TestContext {
    pub fn new(trail: Arc<RecordingAuditTrail>) -> Self {
        let store = Arc::new(InMemoryDocumentStore::new("patient-tests"));
        let services = RecordServices::new(store.clone(), trail.clone());
        Self {
            store,
            trail,
            state: HttpState::new(services),
        }
    }

    /// Store a patient directly through the services.
    pub async fn seed_patient(&self) -> Patient {
        self.state
            .services
            .patients(&correlation())
            .create(patient_details())
            .await
            .expect("seed patient")
    }

    /// Store a test for `patient` directly through the services.
    pub async fn seed_test(&self, patient: &Patient) -> TestRecord {
        self.state
            .services
            .tests(&correlation())
            .create(
                patient.id,
                TestDetails {
                    performer: "Dr Who".to_owned(),
                    order_reference: "ORD-1".to_owned(),
                    observations: Vec::new(),
                },
            )
            .await
            .expect("seed test")
    }
}

/// The API mounted under `/api/v1` over `state`, with correlation enabled.
pub fn api_app(
    state: HttpState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .wrap(RequestCorrelation::new(
            Arc::new(RequestIdGenerator::new()),
            None,
        ))
        .service(web::scope("/api/v1").configure(configure_api))
}

/// A correlation for calls made outside a request.
pub fn correlation() -> Arc<CorrelationService> {
    let ids = RequestIdGenerator::new();
    let headers = InboundCorrelationHeaders::default();
    let parsed = RequestCorrelationParser::new(&ids).parse(
        InboundRequest {
            method: "POST",
            path: "/seed",
            headers: &headers,
        },
        None,
    );
    Arc::new(CorrelationService::new(parsed, None))
}

/// Valid patient fields.
pub fn patient_details() -> PatientDetails {
    PatientDetails {
        first_name: "Ada".to_owned(),
        last_name: Some("Lovelace".to_owned()),
        full_name: None,
        gender: Gender::Female,
        date_of_birth: "1815-12-10".to_owned(),
        post_code: "NW10".to_owned(),
        insurance_number: None,
        preferred_contact_number: None,
    }
}
