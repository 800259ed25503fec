//! Tests performed for a patient, with their observations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Validation failures for test input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TestValidationError {
    /// A required field is absent or blank.
    #[error("\"{0}\" is required")]
    Missing(&'static str),
    /// An observation lacks a required field.
    #[error("\"observations[{index}].{field}\" is required")]
    MissingObservationField {
        /// Position in the observation list.
        index: usize,
        /// Field name.
        field: &'static str,
    },
}

/// One measured result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    /// Observation id.
    pub id: String,
    /// Coded observation kind.
    pub code: String,
    /// Measured value.
    pub measurement: String,
    /// Clinical interpretation.
    pub interpretation: String,
    /// When the result was issued.
    pub issued: DateTime<Utc>,
    /// Result status.
    pub status: String,
}

/// Unvalidated observation input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservationDraft {
    /// Observation id.
    pub id: Option<String>,
    /// Coded observation kind.
    pub code: Option<String>,
    /// Measured value.
    pub measurement: Option<String>,
    /// Clinical interpretation.
    pub interpretation: Option<String>,
    /// When the result was issued.
    pub issued: Option<DateTime<Utc>>,
    /// Result status.
    pub status: Option<String>,
}

/// Unvalidated test input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestDraft {
    /// Clinician or lab that performed the test.
    pub performer: Option<String>,
    /// Order the test fulfils.
    pub order_reference: Option<String>,
    /// Results; the list itself is required but may be empty.
    pub observations: Option<Vec<ObservationDraft>>,
}

/// Validated test fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDetails {
    /// Clinician or lab that performed the test.
    pub performer: String,
    /// Order the test fulfils.
    pub order_reference: String,
    /// Results.
    pub observations: Vec<Observation>,
}

impl TryFrom<TestDraft> for TestDetails {
    type Error = TestValidationError;

    fn try_from(draft: TestDraft) -> Result<Self, Self::Error> {
        let performer = required("performer", draft.performer)?;
        let order_reference = required("orderReference", draft.order_reference)?;
        let observations = draft
            .observations
            .ok_or(TestValidationError::Missing("observations"))?
            .into_iter()
            .enumerate()
            .map(|(index, observation)| validate_observation(index, observation))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            performer,
            order_reference,
            observations,
        })
    }
}

/// A stored test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
    /// Test id.
    pub id: Uuid,
    /// Owning patient.
    pub patient_id: Uuid,
    /// Test fields.
    #[serde(flatten)]
    pub details: TestDetails,
    /// Last write time.
    pub last_updated: DateTime<Utc>,
}

impl TestRecord {
    /// Assemble a test for `patient_id` written at `now`.
    #[must_use]
    pub fn new(id: Uuid, patient_id: Uuid, details: TestDetails, now: DateTime<Utc>) -> Self {
        Self {
            id,
            patient_id,
            details,
            last_updated: now,
        }
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String, TestValidationError> {
    value
        .filter(|text| !text.trim().is_empty())
        .ok_or(TestValidationError::Missing(field))
}

fn validate_observation(
    index: usize,
    draft: ObservationDraft,
) -> Result<Observation, TestValidationError> {
    let field = |name: &'static str, value: Option<String>| {
        value
            .filter(|text| !text.trim().is_empty())
            .ok_or(TestValidationError::MissingObservationField { index, field: name })
    };
    Ok(Observation {
        id: field("id", draft.id)?,
        code: field("code", draft.code)?,
        measurement: field("measurement", draft.measurement)?,
        interpretation: field("interpretation", draft.interpretation)?,
        issued: draft
            .issued
            .ok_or(TestValidationError::MissingObservationField {
                index,
                field: "issued",
            })?,
        status: field("status", draft.status)?,
    })
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::{fixture, rstest};

    use super::*;

    fn observation() -> ObservationDraft {
        ObservationDraft {
            id: Some("obs-1".to_owned()),
            code: Some("GLU".to_owned()),
            measurement: Some("5.4 mmol/L".to_owned()),
            interpretation: Some("normal".to_owned()),
            issued: Some(Utc::now()),
            status: Some("final".to_owned()),
        }
    }

    #[fixture]
    fn draft() -> TestDraft {
        TestDraft {
            performer: Some("Lab 4".to_owned()),
            order_reference: Some("ORD-7".to_owned()),
            observations: Some(vec![observation()]),
        }
    }

    #[rstest]
    fn valid_draft_produces_details(draft: TestDraft) {
        let details = TestDetails::try_from(draft).expect("valid draft");
        assert_eq!(details.observations.len(), 1);
        assert_eq!(details.observations[0].code, "GLU");
    }

    #[rstest]
    fn empty_observation_list_is_allowed(mut draft: TestDraft) {
        draft.observations = Some(Vec::new());
        assert!(TestDetails::try_from(draft).is_ok());
    }

    #[rstest]
    #[case::performer(TestDraft { performer: None, ..draft() }, TestValidationError::Missing("performer"))]
    #[case::order(TestDraft { order_reference: Some(" ".to_owned()), ..draft() }, TestValidationError::Missing("orderReference"))]
    #[case::observations(TestDraft { observations: None, ..draft() }, TestValidationError::Missing("observations"))]
    fn required_fields_are_enforced(#[case] input: TestDraft, #[case] expected: TestValidationError) {
        assert_eq!(TestDetails::try_from(input), Err(expected));
    }

    #[rstest]
    fn observation_fields_are_enforced(mut draft: TestDraft) {
        let mut incomplete = observation();
        incomplete.issued = None;
        draft.observations = Some(vec![observation(), incomplete]);
        assert_eq!(
            TestDetails::try_from(draft),
            Err(TestValidationError::MissingObservationField {
                index: 1,
                field: "issued"
            })
        );
    }

    #[rstest]
    fn record_serialises_flat(draft: TestDraft) {
        let details = TestDetails::try_from(draft).expect("valid draft");
        let record = TestRecord::new(Uuid::new_v4(), Uuid::nil(), details, Utc::now());
        let value = serde_json::to_value(&record).expect("serialise test");
        assert_eq!(value["patientId"], Uuid::nil().to_string());
        assert_eq!(value["performer"], "Lab 4");
        assert!(value.get("details").is_none());
    }
}
