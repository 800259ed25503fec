//! Patient test API handlers.
//!
//! ```text
//! POST /api/v1/patients/{patientId}/tests
//! GET /api/v1/patients/{patientId}/tests
//! GET /api/v1/patients/{patientId}/tests/{testId}
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{Error, ObservationDraft, TestDetails, TestDraft, TestRecord};
use crate::inbound::http::ApiResult;
use crate::inbound::http::correlation::Correlation;
use crate::inbound::http::schemas::{ErrorSchema, TestRecordSchema};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, id_mismatch_error, parse_optional_rfc3339_timestamp, parse_uuid, reject_read_only,
};

/// One observation in a test body.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ObservationRequest {
    pub id: Option<String>,
    #[schema(example = "GLU")]
    pub code: Option<String>,
    #[schema(example = "5.4 mmol/L")]
    pub measurement: Option<String>,
    #[schema(example = "normal")]
    pub interpretation: Option<String>,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub issued: Option<String>,
    #[schema(example = "final")]
    pub status: Option<String>,
}

/// Test body for `POST /api/v1/patients/{patientId}/tests`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TestRequest {
    /// Must be absent; assigned by the server.
    pub id: Option<String>,
    /// Optional; must match the path when present.
    pub patient_id: Option<String>,
    pub performer: Option<String>,
    pub order_reference: Option<String>,
    pub observations: Option<Vec<ObservationRequest>>,
    /// Must be absent; assigned by the server.
    #[schema(value_type = Option<String>, format = DateTime)]
    pub last_updated: Option<String>,
}

fn observation_draft(index: usize, value: ObservationRequest) -> Result<ObservationDraft, Error> {
    let issued = parse_optional_rfc3339_timestamp(
        value.issued,
        &FieldName::new(format!("observations[{index}].issued")),
    )?;
    Ok(ObservationDraft {
        id: value.id,
        code: value.code,
        measurement: value.measurement,
        interpretation: value.interpretation,
        issued,
        status: value.status,
    })
}

impl TryFrom<TestRequest> for TestDraft {
    type Error = Error;

    fn try_from(value: TestRequest) -> Result<Self, Self::Error> {
        let observations = value
            .observations
            .map(|items| {
                items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| observation_draft(index, item))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;
        Ok(Self {
            performer: value.performer,
            order_reference: value.order_reference,
            observations,
        })
    }
}

fn patient_id(raw: &str) -> Result<Uuid, Error> {
    parse_uuid(raw, &FieldName::new("patientId"))
}

/// Record a test for a patient.
#[utoipa::path(
    post,
    path = "/api/v1/patients/{patientId}/tests",
    params(("patientId" = String, Path, description = "Patient id")),
    request_body = TestRequest,
    responses(
        (status = 201, description = "Test created", body = TestRecordSchema),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 500, description = "Auditing failed or internal error", body = ErrorSchema),
        (status = 503, description = "Data store unavailable", body = ErrorSchema)
    ),
    tags = ["tests"],
    operation_id = "createTest"
)]
#[post("/patients/{patientId}/tests")]
pub async fn create_test(
    state: web::Data<HttpState>,
    Correlation(correlation): Correlation,
    path: web::Path<String>,
    payload: web::Json<TestRequest>,
) -> ApiResult<HttpResponse> {
    let patient = patient_id(&path)?;
    let payload = payload.into_inner();
    reject_read_only(payload.id.as_ref(), &FieldName::new("id"))?;
    reject_read_only(payload.last_updated.as_ref(), &FieldName::new("lastUpdated"))?;
    let body_patient = payload.patient_id.as_deref().map(patient_id).transpose()?;
    if body_patient.is_some_and(|body_patient| body_patient != patient) {
        return Err(id_mismatch_error("patientId"));
    }
    let details = TestDetails::try_from(TestDraft::try_from(payload)?)?;
    let test = state
        .services
        .tests(&correlation)
        .create(patient, details)
        .await?;
    Ok(HttpResponse::Created().json(test))
}

/// List the tests of a patient.
#[utoipa::path(
    get,
    path = "/api/v1/patients/{patientId}/tests",
    params(("patientId" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Tests of the patient", body = [TestRecordSchema]),
        (status = 400, description = "Invalid patient id", body = ErrorSchema),
        (status = 500, description = "Auditing failed or internal error", body = ErrorSchema)
    ),
    tags = ["tests"],
    operation_id = "listTests"
)]
#[get("/patients/{patientId}/tests")]
pub async fn list_tests(
    state: web::Data<HttpState>,
    Correlation(correlation): Correlation,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<TestRecord>>> {
    let patient = patient_id(&path)?;
    let tests = state.services.tests(&correlation).list(patient).await?;
    Ok(web::Json(tests))
}

/// Fetch one test of a patient.
#[utoipa::path(
    get,
    path = "/api/v1/patients/{patientId}/tests/{testId}",
    params(
        ("patientId" = String, Path, description = "Patient id"),
        ("testId" = String, Path, description = "Test id")
    ),
    responses(
        (status = 200, description = "Test", body = TestRecordSchema),
        (status = 400, description = "Invalid id", body = ErrorSchema),
        (status = 404, description = "Unknown test", body = ErrorSchema),
        (status = 500, description = "Auditing failed or internal error", body = ErrorSchema)
    ),
    tags = ["tests"],
    operation_id = "getTest"
)]
#[get("/patients/{patientId}/tests/{testId}")]
pub async fn get_test(
    state: web::Data<HttpState>,
    Correlation(correlation): Correlation,
    path: web::Path<(String, String)>,
) -> ApiResult<web::Json<TestRecord>> {
    let (raw_patient, raw_test) = path.into_inner();
    let patient = patient_id(&raw_patient)?;
    let test = parse_uuid(&raw_test, &FieldName::new("testId"))?;
    let record = state.services.tests(&correlation).get(patient, test).await?;
    Ok(web::Json(record))
}

#[cfg(test)]
#[path = "patient_tests_tests.rs"]
mod tests;
