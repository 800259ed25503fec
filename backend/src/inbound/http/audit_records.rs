//! Audit record intake handler.
//!
//! ```text
//! POST /api/v1/audit-records {"sourceSystemName":"PatientTestApi","resource":{"type":"patient","id":"...","operation":"read"}}
//! ```
//!
//! Accepted records are stored without being audited themselves.

use actix_web::{HttpResponse, post, web};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::domain::{AuditedResource, Error};
use crate::inbound::http::ApiResult;
use crate::inbound::http::correlation::Correlation;
use crate::inbound::http::schemas::{AuditRecordSchema, ErrorSchema};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, missing_field_error, reject_read_only};

/// Resource part of an audit record body.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AuditedResourceRequest {
    #[serde(rename = "type")]
    #[schema(example = "patient")]
    pub resource_type: Option<String>,
    pub id: Option<String>,
    #[schema(example = "read")]
    pub operation: Option<String>,
}

/// Body for `POST /api/v1/audit-records`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AuditRecordRequest {
    /// Must be absent; assigned by the server.
    pub id: Option<String>,
    /// Must be absent; assigned by the server.
    #[schema(value_type = Option<String>, format = DateTime)]
    pub created_date: Option<String>,
    #[schema(example = "PatientTestApi")]
    pub source_system_name: Option<String>,
    pub resource: Option<AuditedResourceRequest>,
}

fn required(value: Option<String>, field: &str) -> Result<String, Error> {
    value
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| missing_field_error(&FieldName::new(field)))
}

impl TryFrom<AuditedResourceRequest> for AuditedResource {
    type Error = Error;

    fn try_from(value: AuditedResourceRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            resource_type: required(value.resource_type, "resource.type")?,
            id: value.id,
            operation: required(value.operation, "resource.operation")?,
        })
    }
}

/// Store an audit record raised by another system.
#[utoipa::path(
    post,
    path = "/api/v1/audit-records",
    request_body = AuditRecordRequest,
    responses(
        (status = 201, description = "Audit record stored", body = AuditRecordSchema),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 503, description = "Data store unavailable", body = ErrorSchema)
    ),
    tags = ["audit"],
    operation_id = "createAuditRecord"
)]
#[post("/audit-records")]
pub async fn create_audit_record(
    state: web::Data<HttpState>,
    Correlation(correlation): Correlation,
    payload: web::Json<AuditRecordRequest>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    reject_read_only(payload.id.as_ref(), &FieldName::new("id"))?;
    reject_read_only(payload.created_date.as_ref(), &FieldName::new("createdDate"))?;
    let source_system_name = required(payload.source_system_name, "sourceSystemName")?;
    let resource = payload
        .resource
        .ok_or_else(|| missing_field_error(&FieldName::new("resource")))
        .and_then(AuditedResource::try_from)?;
    let record = state
        .services
        .audit_records(&correlation)
        .accept(source_system_name, resource)
        .await?;
    Ok(HttpResponse::Created().json(record))
}
