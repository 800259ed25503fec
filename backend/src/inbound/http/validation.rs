//! Shared validation helpers for inbound HTTP adapters.

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::domain::{Error, PatientValidationError, TestValidationError};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    TooLong,
    InvalidValue,
    ReadOnlyField,
    IdMismatch,
    InvalidUuid,
    InvalidTimestamp,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingField => "missing_field",
            ErrorCode::TooLong => "too_long",
            ErrorCode::InvalidValue => "invalid_value",
            ErrorCode::ReadOnlyField => "read_only_field",
            ErrorCode::IdMismatch => "id_mismatch",
            ErrorCode::InvalidUuid => "invalid_uuid",
            ErrorCode::InvalidTimestamp => "invalid_timestamp",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FieldName(String);

impl FieldName {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    fn as_str(&self) -> &str {
        &self.0
    }
}

/// Builder for validation errors with field context.
struct ValidationError {
    field: String,
    message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    fn with_code(self, code: ErrorCode) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "code": code.as_str(),
        }))
    }

    fn with_value(self, code: ErrorCode, value: impl Into<String>) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "value": value.into(),
            "code": code.as_str(),
        }))
    }
}

pub(crate) fn missing_field_error(field: &FieldName) -> Error {
    let field = field.as_str();
    ValidationError::new(field, format!("\"{field}\" is required"))
        .with_code(ErrorCode::MissingField)
}

pub(crate) fn read_only_field_error(field: &FieldName) -> Error {
    let field = field.as_str();
    ValidationError::new(field, format!("{field} unexpected."))
        .with_code(ErrorCode::ReadOnlyField)
}

pub(crate) fn id_mismatch_error(field: &str) -> Error {
    ValidationError::new(field, format!("{field} does not match the path."))
        .with_code(ErrorCode::IdMismatch)
}

pub(crate) fn invalid_uuid_error(field: &FieldName, value: &str) -> Error {
    let field = field.as_str();
    ValidationError::new(field, format!("{field} must be a valid UUID"))
        .with_value(ErrorCode::InvalidUuid, value)
}

pub(crate) fn parse_uuid(value: &str, field: &FieldName) -> Result<Uuid, Error> {
    Uuid::parse_str(value).map_err(|_| invalid_uuid_error(field, value))
}

pub(crate) fn invalid_timestamp_error(field: &FieldName, value: &str) -> Error {
    let field = field.as_str();
    ValidationError::new(field, format!("{field} must be an RFC 3339 timestamp"))
        .with_value(ErrorCode::InvalidTimestamp, value)
}

pub(crate) fn parse_optional_rfc3339_timestamp(
    value: Option<String>,
    field: &FieldName,
) -> Result<Option<DateTime<Utc>>, Error> {
    value
        .map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|timestamp| timestamp.with_timezone(&Utc))
                .map_err(|_| invalid_timestamp_error(field, &raw))
        })
        .transpose()
}

/// Reject fields the server owns when a client supplies them.
pub(crate) fn reject_read_only<T>(value: Option<&T>, field: &FieldName) -> Result<(), Error> {
    match value {
        Some(_) => Err(read_only_field_error(field)),
        None => Ok(()),
    }
}

impl From<PatientValidationError> for Error {
    fn from(error: PatientValidationError) -> Self {
        let message = error.to_string();
        let (field, code) = match &error {
            PatientValidationError::Missing(field) => (*field, ErrorCode::MissingField),
            PatientValidationError::TooLong { field, .. } => (*field, ErrorCode::TooLong),
            PatientValidationError::InvalidGender(_) => ("gender", ErrorCode::InvalidValue),
            PatientValidationError::InvalidDateOfBirth => ("dateOfBirth", ErrorCode::InvalidValue),
            PatientValidationError::InvalidPostCode => ("postCode", ErrorCode::InvalidValue),
        };
        ValidationError::new(field, message).with_code(code)
    }
}

impl From<TestValidationError> for Error {
    fn from(error: TestValidationError) -> Self {
        let message = error.to_string();
        let field = match &error {
            TestValidationError::Missing(field) => (*field).to_owned(),
            TestValidationError::MissingObservationField { index, field } => {
                format!("observations[{index}].{field}")
            }
        };
        ValidationError::new(field, message).with_code(ErrorCode::MissingField)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::domain::ErrorCode as DomainCode;

    #[rstest]
    fn missing_fields_name_the_field() {
        let error = missing_field_error(&FieldName::new("sourceSystemName"));
        assert_eq!(error.code, DomainCode::InvalidRequest);
        assert_eq!(
            error.details,
            Some(json!({ "field": "sourceSystemName", "code": "missing_field" }))
        );
    }

    #[rstest]
    fn uuids_are_parsed_or_reported() {
        let field = FieldName::new("patientId");
        assert!(parse_uuid("3fa85f64-5717-4562-b3fc-2c963f66afa6", &field).is_ok());
        let error = parse_uuid("nope", &field).expect_err("invalid uuid");
        assert_eq!(
            error.details,
            Some(json!({ "field": "patientId", "value": "nope", "code": "invalid_uuid" }))
        );
    }

    #[rstest]
    #[case(None, true)]
    #[case(Some("2024-05-01T10:00:00Z".to_owned()), true)]
    #[case(Some("yesterday".to_owned()), false)]
    fn timestamps_are_optional_rfc3339(#[case] value: Option<String>, #[case] ok: bool) {
        let result = parse_optional_rfc3339_timestamp(value, &FieldName::new("issued"));
        assert_eq!(result.is_ok(), ok);
    }

    #[rstest]
    fn read_only_fields_are_rejected_when_present() {
        let field = FieldName::new("lastUpdated");
        assert!(reject_read_only::<String>(None, &field).is_ok());
        let error = reject_read_only(Some(&"2024".to_owned()), &field).expect_err("read only");
        assert_eq!(error.message, "lastUpdated unexpected.");
    }

    #[rstest]
    #[case(PatientValidationError::Missing("firstName"), "firstName", "missing_field")]
    #[case(
        PatientValidationError::TooLong { field: "lastName", max: 64 },
        "lastName",
        "too_long"
    )]
    #[case(PatientValidationError::InvalidPostCode, "postCode", "invalid_value")]
    fn patient_failures_map_to_field_details(
        #[case] failure: PatientValidationError,
        #[case] field: &str,
        #[case] code: &str,
    ) {
        let message = failure.to_string();
        let error = Error::from(failure);
        assert_eq!(error.code, DomainCode::InvalidRequest);
        assert_eq!(error.message, message);
        assert_eq!(error.details, Some(json!({ "field": field, "code": code })));
    }

    #[rstest]
    fn observation_failures_name_the_index() {
        let error = Error::from(TestValidationError::MissingObservationField {
            index: 2,
            field: "code",
        });
        assert_eq!(
            error.details,
            Some(json!({ "field": "observations[2].code", "code": "missing_field" }))
        );
    }
}
