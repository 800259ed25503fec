//! Patient aggregate and its validation rules.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Maximum length of `firstName` and `lastName`.
pub const MAX_NAME_LEN: usize = 64;
/// Maximum length of `fullName`.
pub const MAX_FULL_NAME_LEN: usize = 128;
/// Exact length of `postCode`.
pub const POST_CODE_LEN: usize = 4;

/// Administrative gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// Male.
    Male,
    /// Female.
    Female,
    /// Other.
    Other,
    /// Not known.
    Unknown,
}

impl FromStr for Gender {
    type Err = PatientValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            "unknown" => Ok(Self::Unknown),
            other => Err(PatientValidationError::InvalidGender(other.to_owned())),
        }
    }
}

/// Validation failures for patient input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatientValidationError {
    /// A required field is absent or blank.
    #[error("\"{0}\" is required")]
    Missing(&'static str),
    /// A field exceeds its maximum length.
    #[error("\"{field}\" length must be less than or equal to {max} characters long")]
    TooLong {
        /// Field name.
        field: &'static str,
        /// Maximum length.
        max: usize,
    },
    /// `gender` is not one of the accepted values.
    #[error("\"gender\" must be one of [male, female, other, unknown], got {0:?}")]
    InvalidGender(String),
    /// `dateOfBirth` is not `YYYY`, `YYYY-MM` or `YYYY-MM-DD`.
    #[error("\"dateOfBirth\" must be a date of the form YYYY[-MM[-DD]]")]
    InvalidDateOfBirth,
    /// `postCode` has the wrong length.
    #[error("\"postCode\" length must be 4 characters long")]
    InvalidPostCode,
}

/// Unvalidated patient input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientDraft {
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Display name.
    pub full_name: Option<String>,
    /// Gender as text.
    pub gender: Option<String>,
    /// Date of birth as text.
    pub date_of_birth: Option<String>,
    /// Post code.
    pub post_code: Option<String>,
    /// Insurance number.
    pub insurance_number: Option<String>,
    /// Contact number.
    pub preferred_contact_number: Option<String>,
}

/// Validated patient fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDetails {
    /// Given name.
    pub first_name: String,
    /// Family name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Gender.
    pub gender: Gender,
    /// Partial or full ISO date of birth.
    pub date_of_birth: String,
    /// Post code.
    pub post_code: String,
    /// Insurance number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_number: Option<String>,
    /// Contact number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_contact_number: Option<String>,
}

impl TryFrom<PatientDraft> for PatientDetails {
    type Error = PatientValidationError;

    fn try_from(draft: PatientDraft) -> Result<Self, Self::Error> {
        let first_name = required("firstName", draft.first_name)?;
        check_len("firstName", &first_name, MAX_NAME_LEN)?;
        if let Some(last_name) = &draft.last_name {
            check_len("lastName", last_name, MAX_NAME_LEN)?;
        }
        if let Some(full_name) = &draft.full_name {
            check_len("fullName", full_name, MAX_FULL_NAME_LEN)?;
        }
        let gender = required("gender", draft.gender)?.parse()?;
        let date_of_birth = required("dateOfBirth", draft.date_of_birth)?;
        if !is_valid_date_of_birth(&date_of_birth) {
            return Err(PatientValidationError::InvalidDateOfBirth);
        }
        let post_code = required("postCode", draft.post_code)?;
        if post_code.chars().count() != POST_CODE_LEN {
            return Err(PatientValidationError::InvalidPostCode);
        }
        Ok(Self {
            first_name,
            last_name: draft.last_name,
            full_name: draft.full_name,
            gender,
            date_of_birth,
            post_code,
            insurance_number: draft.insurance_number,
            preferred_contact_number: draft.preferred_contact_number,
        })
    }
}

/// A stored patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Patient id.
    pub id: Uuid,
    /// Patient fields.
    #[serde(flatten)]
    pub details: PatientDetails,
    /// Last write time.
    pub last_updated: DateTime<Utc>,
}

impl Patient {
    /// Assemble a patient written at `now`.
    #[must_use]
    pub fn new(id: Uuid, details: PatientDetails, now: DateTime<Utc>) -> Self {
        Self {
            id,
            details,
            last_updated: now,
        }
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String, PatientValidationError> {
    value
        .filter(|text| !text.trim().is_empty())
        .ok_or(PatientValidationError::Missing(field))
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), PatientValidationError> {
    if value.chars().count() > max {
        return Err(PatientValidationError::TooLong { field, max });
    }
    Ok(())
}

/// `YYYY`, `YYYY-MM` or `YYYY-MM-DD` with year 0001-9999, month 01-12 and
/// day 01-31.
fn is_valid_date_of_birth(value: &str) -> bool {
    let mut parts = value.split('-');
    let Some(year) = parts.next() else {
        return false;
    };
    if !in_range(year, 4, 1, 9999) {
        return false;
    }
    match (parts.next(), parts.next(), parts.next()) {
        (None, None, None) => true,
        (Some(month), None, None) => in_range(month, 2, 1, 12),
        (Some(month), Some(day), None) => in_range(month, 2, 1, 12) && in_range(day, 2, 1, 31),
        _ => false,
    }
}

fn in_range(digits: &str, len: usize, min: u32, max: u32) -> bool {
    digits.len() == len
        && digits.bytes().all(|b| b.is_ascii_digit())
        && digits
            .parse::<u32>()
            .is_ok_and(|value| (min..=max).contains(&value))
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn draft() -> PatientDraft {
        PatientDraft {
            first_name: Some("Ada".to_owned()),
            last_name: Some("Lovelace".to_owned()),
            full_name: None,
            gender: Some("female".to_owned()),
            date_of_birth: Some("1815-12-10".to_owned()),
            post_code: Some("NW10".to_owned()),
            insurance_number: None,
            preferred_contact_number: Some("0123".to_owned()),
        }
    }

    #[rstest]
    fn valid_draft_produces_details(draft: PatientDraft) {
        let details = PatientDetails::try_from(draft).expect("valid draft");
        assert_eq!(details.gender, Gender::Female);
        assert_eq!(details.date_of_birth, "1815-12-10");
    }

    #[rstest]
    #[case("1815")]
    #[case("1815-12")]
    #[case("0001-01-01")]
    #[case("2024-02-31")]
    fn accepts_partial_dates(mut draft: PatientDraft, #[case] date: &str) {
        draft.date_of_birth = Some(date.to_owned());
        assert!(PatientDetails::try_from(draft).is_ok());
    }

    #[rstest]
    #[case("0000")]
    #[case("1815-13")]
    #[case("1815-00-10")]
    #[case("1815-12-32")]
    #[case("18151210")]
    #[case("1815-1-1")]
    #[case("1815-12-10-01")]
    fn rejects_malformed_dates(mut draft: PatientDraft, #[case] date: &str) {
        draft.date_of_birth = Some(date.to_owned());
        assert_eq!(
            PatientDetails::try_from(draft),
            Err(PatientValidationError::InvalidDateOfBirth)
        );
    }

    #[rstest]
    fn first_name_is_required(mut draft: PatientDraft) {
        draft.first_name = Some("  ".to_owned());
        assert_eq!(
            PatientDetails::try_from(draft),
            Err(PatientValidationError::Missing("firstName"))
        );
    }

    #[rstest]
    fn names_are_length_limited(mut draft: PatientDraft) {
        draft.last_name = Some("x".repeat(MAX_NAME_LEN + 1));
        assert_eq!(
            PatientDetails::try_from(draft.clone()),
            Err(PatientValidationError::TooLong {
                field: "lastName",
                max: MAX_NAME_LEN
            })
        );
        draft.last_name = None;
        draft.full_name = Some("x".repeat(MAX_FULL_NAME_LEN));
        assert!(PatientDetails::try_from(draft).is_ok());
    }

    #[rstest]
    #[case("NW1")]
    #[case("NW101")]
    fn post_code_has_a_fixed_length(mut draft: PatientDraft, #[case] post_code: &str) {
        draft.post_code = Some(post_code.to_owned());
        assert_eq!(
            PatientDetails::try_from(draft),
            Err(PatientValidationError::InvalidPostCode)
        );
    }

    #[rstest]
    fn gender_must_be_known(mut draft: PatientDraft) {
        draft.gender = Some("Female".to_owned());
        assert!(matches!(
            PatientDetails::try_from(draft),
            Err(PatientValidationError::InvalidGender(_))
        ));
    }

    #[rstest]
    fn patient_serialises_flat(draft: PatientDraft) {
        let details = PatientDetails::try_from(draft).expect("valid draft");
        let patient = Patient::new(Uuid::nil(), details, Utc::now());
        let value = serde_json::to_value(&patient).expect("serialise patient");
        assert_eq!(value["firstName"], "Ada");
        assert_eq!(value["id"], Uuid::nil().to_string());
        assert!(value.get("details").is_none());
        assert!(value.get("fullName").is_none());
    }
}
