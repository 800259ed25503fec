//! OpenAPI documentation configuration.
//!
//! This module defines the [`ApiDoc`] struct which generates the OpenAPI
//! specification for the REST API. It registers:
//!
//! - **Paths**: the patient, test, audit record and health endpoints
//! - **Schemas**: domain type wrappers from
//!   [`crate::inbound::http::schemas`] that provide OpenAPI definitions
//!   without coupling domain types to the utoipa framework
//!
//! The generated specification is used by Swagger UI (debug builds) and
//! exported via `cargo run --bin openapi-dump` for external tooling.

use crate::inbound::http::audit_records::{AuditRecordRequest, AuditedResourceRequest};
use crate::inbound::http::patient_tests::{ObservationRequest, TestRequest};
use crate::inbound::http::patients::PatientRequest;
use crate::inbound::http::schemas::{
    AuditRecordSchema, AuditedResourceSchema, ErrorCodeSchema, ErrorSchema, GenderSchema,
    ObservationSchema, PatientSchema, TestRecordSchema,
};
use utoipa::OpenApi;

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Patient tests API",
        description = "Audited access to patients and their test results."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::patients::create_patient,
        crate::inbound::http::patients::get_patient,
        crate::inbound::http::patients::update_patient,
        crate::inbound::http::patient_tests::create_test,
        crate::inbound::http::patient_tests::list_tests,
        crate::inbound::http::patient_tests::get_test,
        crate::inbound::http::audit_records::create_audit_record,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        GenderSchema,
        PatientSchema,
        ObservationSchema,
        TestRecordSchema,
        AuditedResourceSchema,
        AuditRecordSchema,
        PatientRequest,
        TestRequest,
        ObservationRequest,
        AuditRecordRequest,
        AuditedResourceRequest,
    )),
    tags(
        (name = "patients", description = "Patient records"),
        (name = "tests", description = "Tests performed for a patient"),
        (name = "audit", description = "Audit record intake"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
