//! Audit records describing access to clinical resources.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Source system name stamped on every audit record this service sends.
pub const SOURCE_SYSTEM_NAME: &str = "PatientTestApi";

/// Length of the identifiers assigned to stored audit records.
pub const AUDIT_RECORD_ID_LEN: usize = 16;

/// Kind of resource being accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// A patient.
    Patient,
    /// A test performed for a patient.
    Test,
}

/// Kind of access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOperation {
    /// A new resource is written.
    Create,
    /// A resource is read.
    Read,
    /// An existing resource is changed.
    Update,
}

/// The resource an operation touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditResource {
    /// Resource kind.
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    /// Resource id.
    pub id: String,
    /// Access kind.
    pub operation: AuditOperation,
}

impl AuditResource {
    /// Describe an access to `id`.
    #[must_use]
    pub fn new(
        resource_type: ResourceType,
        id: impl fmt::Display,
        operation: AuditOperation,
    ) -> Self {
        Self {
            resource_type,
            id: id.to_string(),
            operation,
        }
    }
}

/// Body sent to the audit service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecordRequest {
    /// Always [`SOURCE_SYSTEM_NAME`] for records raised by this service.
    pub source_system_name: String,
    /// The accessed resource.
    pub resource: AuditResource,
}

impl AuditRecordRequest {
    /// Audit record for `resource` raised by this service.
    #[must_use]
    pub fn new(resource: AuditResource) -> Self {
        Self {
            source_system_name: SOURCE_SYSTEM_NAME.to_owned(),
            resource,
        }
    }
}

/// Resource description as accepted by the audit records endpoint.
///
/// Other systems post free-form resource kinds, so the fields are strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditedResource {
    /// Resource kind.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Resource id, when the operation targets one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Access kind.
    pub operation: String,
}

/// A stored audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    /// Short record id.
    pub id: String,
    /// When the record was accepted.
    pub created_date: DateTime<Utc>,
    /// System that raised the record.
    pub source_system_name: String,
    /// The accessed resource.
    pub resource: AuditedResource,
}

impl AuditRecord {
    /// Stamp a new record with a fresh id and the acceptance time.
    #[must_use]
    pub fn accept(
        source_system_name: String,
        resource: AuditedResource,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_audit_record_id(),
            created_date: now,
            source_system_name,
            resource,
        }
    }
}

fn new_audit_record_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(AUDIT_RECORD_ID_LEN);
    id
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    fn request_serialises_to_the_audit_wire_shape() {
        let request = AuditRecordRequest::new(AuditResource::new(
            ResourceType::Test,
            "t-1",
            AuditOperation::Create,
        ));
        assert_eq!(
            serde_json::to_value(&request).expect("serialise request"),
            json!({
                "sourceSystemName": "PatientTestApi",
                "resource": { "type": "test", "id": "t-1", "operation": "create" }
            })
        );
    }

    #[rstest]
    fn accepted_records_get_short_unique_ids() {
        let resource = AuditedResource {
            resource_type: "patient".to_owned(),
            id: Some("p-1".to_owned()),
            operation: "read".to_owned(),
        };
        let now = Utc::now();
        let first = AuditRecord::accept("Ward".to_owned(), resource.clone(), now);
        let second = AuditRecord::accept("Ward".to_owned(), resource, now);

        assert_eq!(first.id.len(), AUDIT_RECORD_ID_LEN);
        assert!(first.id.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_ne!(first.id, second.id);
        assert_eq!(first.created_date, now);
    }
}
