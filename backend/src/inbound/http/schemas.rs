//! OpenAPI schema definitions for domain types.
//!
//! Domain types remain framework-agnostic by not deriving `ToSchema`. This
//! module provides the schema definitions required for OpenAPI documentation
//! using utoipa's external schema registration.
//!
//! The schema wrappers mirror the JSON shape of their corresponding domain
//! types but live in the inbound adapter layer where framework concerns belong.

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
///
/// Stable machine-readable error codes returned in API error responses.
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    /// The request is malformed or fails validation.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// The requested resource does not exist.
    #[schema(rename = "not_found")]
    NotFound,
    /// The audit record could not be written so the operation was refused.
    #[schema(rename = "auditing_failed")]
    AuditingFailed,
    /// The data store is unreachable or throttling.
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    /// An unexpected error occurred on the server.
    #[schema(rename = "internal_error")]
    InternalError,
}

/// OpenAPI schema for [`crate::domain::Error`].
///
/// API error response payload with machine-readable code and human-readable
/// message.
#[derive(ToSchema)]
#[schema(as = crate::domain::Error, rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ErrorSchema {
    /// Stable machine-readable error code.
    #[schema(example = "auditing_failed")]
    code: ErrorCodeSchema,
    /// Human-readable message returned to clients.
    #[schema(example = "Error creating audit log")]
    message: String,
    /// Operation id of the failed request.
    #[schema(example = "0af7651916cd43dd8448eb211c80319c")]
    trace_id: Option<String>,
    /// Supplementary error details for clients.
    details: Option<serde_json::Value>,
}

/// OpenAPI schema for [`crate::domain::Gender`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Gender)]
pub enum GenderSchema {
    /// Male.
    #[schema(rename = "male")]
    Male,
    /// Female.
    #[schema(rename = "female")]
    Female,
    /// Other.
    #[schema(rename = "other")]
    Other,
    /// Not known.
    #[schema(rename = "unknown")]
    Unknown,
}

/// OpenAPI schema for [`crate::domain::Patient`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Patient, rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct PatientSchema {
    /// Patient id assigned on creation.
    #[schema(value_type = String, example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    id: String,
    /// Given name.
    #[schema(example = "Ada")]
    first_name: String,
    /// Family name.
    last_name: Option<String>,
    /// Display name.
    full_name: Option<String>,
    /// Gender.
    gender: GenderSchema,
    /// Partial or full ISO date of birth.
    #[schema(example = "1815-12")]
    date_of_birth: String,
    /// Four-character post code.
    #[schema(example = "NW10")]
    post_code: String,
    /// Insurance number.
    insurance_number: Option<String>,
    /// Contact number.
    preferred_contact_number: Option<String>,
    /// Last write time.
    #[schema(value_type = String, format = DateTime)]
    last_updated: String,
}

/// OpenAPI schema for [`crate::domain::Observation`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Observation)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ObservationSchema {
    /// Observation id.
    id: String,
    /// Coded observation kind.
    code: String,
    /// Measured value.
    measurement: String,
    /// Clinical interpretation.
    interpretation: String,
    /// When the result was issued.
    #[schema(value_type = String, format = DateTime)]
    issued: String,
    /// Result status.
    status: String,
}

/// OpenAPI schema for [`crate::domain::TestRecord`].
#[derive(ToSchema)]
#[schema(as = crate::domain::TestRecord, rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct TestRecordSchema {
    /// Test id assigned on creation.
    #[schema(value_type = String)]
    id: String,
    /// Owning patient.
    #[schema(value_type = String)]
    patient_id: String,
    /// Clinician or lab that performed the test.
    performer: String,
    /// Order the test fulfils.
    order_reference: String,
    /// Results.
    observations: Vec<ObservationSchema>,
    /// Last write time.
    #[schema(value_type = String, format = DateTime)]
    last_updated: String,
}

/// OpenAPI schema for [`crate::domain::AuditedResource`].
#[derive(ToSchema)]
#[schema(as = crate::domain::AuditedResource)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct AuditedResourceSchema {
    /// Resource kind.
    #[schema(rename = "type", example = "patient")]
    resource_type: String,
    /// Resource id, when the operation targets one.
    id: Option<String>,
    /// Access kind.
    #[schema(example = "read")]
    operation: String,
}

/// OpenAPI schema for [`crate::domain::AuditRecord`].
#[derive(ToSchema)]
#[schema(as = crate::domain::AuditRecord, rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct AuditRecordSchema {
    /// Sixteen-character record id.
    id: String,
    /// When the record was accepted.
    #[schema(value_type = String, format = DateTime)]
    created_date: String,
    /// System that raised the record.
    #[schema(example = "PatientTestApi")]
    source_system_name: String,
    /// The accessed resource.
    resource: AuditedResourceSchema,
}
