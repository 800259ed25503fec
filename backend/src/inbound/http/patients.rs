//! Patient API handlers.
//!
//! ```text
//! POST /api/v1/patients {"firstName":"Ada","gender":"female","dateOfBirth":"1815-12","postCode":"NW10"}
//! GET /api/v1/patients/{id}
//! PUT /api/v1/patients/{id}
//! ```

use actix_web::{HttpResponse, get, post, put, web};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::domain::{Error, Patient, PatientDetails, PatientDraft};
use crate::inbound::http::ApiResult;
use crate::inbound::http::correlation::Correlation;
use crate::inbound::http::schemas::{ErrorSchema, PatientSchema};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, id_mismatch_error, parse_uuid, reject_read_only,
};

/// Patient body for `POST /api/v1/patients` and `PUT /api/v1/patients/{id}`.
///
/// `id` and `lastUpdated` are assigned by the server.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PatientRequest {
    /// Must be absent on create; must match the path on update.
    pub id: Option<String>,
    /// Must be absent on create; ignored on update.
    #[schema(value_type = Option<String>, format = DateTime)]
    pub last_updated: Option<String>,
    #[schema(example = "Ada")]
    pub first_name: Option<String>,
    #[schema(example = "Lovelace")]
    pub last_name: Option<String>,
    pub full_name: Option<String>,
    #[schema(example = "female")]
    pub gender: Option<String>,
    #[schema(example = "1815-12-10")]
    pub date_of_birth: Option<String>,
    #[schema(example = "NW10")]
    pub post_code: Option<String>,
    pub insurance_number: Option<String>,
    pub preferred_contact_number: Option<String>,
}

impl From<PatientRequest> for PatientDraft {
    fn from(value: PatientRequest) -> Self {
        Self {
            first_name: value.first_name,
            last_name: value.last_name,
            full_name: value.full_name,
            gender: value.gender,
            date_of_birth: value.date_of_birth,
            post_code: value.post_code,
            insurance_number: value.insurance_number,
            preferred_contact_number: value.preferred_contact_number,
        }
    }
}

fn patient_id(raw: &str) -> Result<uuid::Uuid, Error> {
    parse_uuid(raw, &FieldName::new("id"))
}

/// Register a new patient.
///
/// The creation is audited before the patient is stored; when the audit
/// service refuses, nothing is written.
#[utoipa::path(
    post,
    path = "/api/v1/patients",
    request_body = PatientRequest,
    responses(
        (status = 201, description = "Patient created", body = PatientSchema),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 500, description = "Auditing failed or internal error", body = ErrorSchema),
        (status = 503, description = "Data store unavailable", body = ErrorSchema)
    ),
    tags = ["patients"],
    operation_id = "createPatient"
)]
#[post("/patients")]
pub async fn create_patient(
    state: web::Data<HttpState>,
    Correlation(correlation): Correlation,
    payload: web::Json<PatientRequest>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    reject_read_only(payload.id.as_ref(), &FieldName::new("id"))?;
    reject_read_only(payload.last_updated.as_ref(), &FieldName::new("lastUpdated"))?;
    let details = PatientDetails::try_from(PatientDraft::from(payload))?;
    let patient = state.services.patients(&correlation).create(details).await?;
    Ok(HttpResponse::Created().json(patient))
}

/// Fetch one patient.
#[utoipa::path(
    get,
    path = "/api/v1/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient", body = PatientSchema),
        (status = 400, description = "Invalid patient id", body = ErrorSchema),
        (status = 404, description = "Unknown patient", body = ErrorSchema),
        (status = 500, description = "Auditing failed or internal error", body = ErrorSchema)
    ),
    tags = ["patients"],
    operation_id = "getPatient"
)]
#[get("/patients/{id}")]
pub async fn get_patient(
    state: web::Data<HttpState>,
    Correlation(correlation): Correlation,
    path: web::Path<String>,
) -> ApiResult<web::Json<Patient>> {
    let id = patient_id(&path)?;
    let patient = state.services.patients(&correlation).get(id).await?;
    Ok(web::Json(patient))
}

/// Replace the fields of an existing patient.
#[utoipa::path(
    put,
    path = "/api/v1/patients/{id}",
    params(("id" = String, Path, description = "Patient id")),
    request_body = PatientRequest,
    responses(
        (status = 200, description = "Patient updated", body = PatientSchema),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Unknown patient", body = ErrorSchema),
        (status = 500, description = "Auditing failed or internal error", body = ErrorSchema)
    ),
    tags = ["patients"],
    operation_id = "updatePatient"
)]
#[put("/patients/{id}")]
pub async fn update_patient(
    state: web::Data<HttpState>,
    Correlation(correlation): Correlation,
    path: web::Path<String>,
    payload: web::Json<PatientRequest>,
) -> ApiResult<web::Json<Patient>> {
    let id = patient_id(&path)?;
    let payload = payload.into_inner();
    let body_id = payload.id.as_deref().map(patient_id).transpose()?;
    if body_id.is_some_and(|body_id| body_id != id) {
        return Err(id_mismatch_error("id"));
    }
    let details = PatientDetails::try_from(PatientDraft::from(payload))?;
    let patient = state
        .services
        .patients(&correlation)
        .update(id, details)
        .await?;
    Ok(web::Json(patient))
}

#[cfg(test)]
#[path = "patients_tests.rs"]
mod tests;
