//! # Credential Records
//!
//! The structured data an institution issues: a semester proforma with its
//! course list, or a degree summary. Records are built once at mint time
//! and never change afterwards, because the ledger copy of them can't.
//!
//! The serde layout of these types is a wire format. Sealed payloads already
//! on the ledger were serialized by a browser with camelCase keys, marks as
//! JSON numbers and the semester as a string, so the field renames below must
//! not drift. Decoding is lenient where old clients were sloppy: marks and
//! semester numbers are accepted as either numbers or numeric strings.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Problems with a record that would make it unsafe to seal or fingerprint.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("course {course} has non-finite marks")]
    NonFiniteMarks { course: String },

    #[error("required field `{0}` is blank")]
    BlankField(&'static str),
}

// ---------------------------------------------------------------------------
// CourseResult
// ---------------------------------------------------------------------------

/// One graded course within a record.
///
/// Marks are expected in 0..=100 but nothing clamps them. Aggregation works
/// on whatever was issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseResult {
    pub course_name: String,
    pub course_number: String,
    #[serde(deserialize_with = "number_or_numeric_string")]
    pub marks: f64,
}

impl CourseResult {
    pub fn new(course_name: impl Into<String>, course_number: impl Into<String>, marks: f64) -> Self {
        Self {
            course_name: course_name.into(),
            course_number: course_number.into(),
            marks,
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Anything that can be sealed under a student identifier.
///
/// The identifier returned here is compared against the one a verifier
/// supplies after decryption succeeds.
pub trait SealedRecord {
    /// The student identifier (seat number) embedded in the record.
    fn identifier(&self) -> &str;

    /// Checks invariants that must hold before the record goes on a ledger.
    fn validate(&self) -> Result<(), RecordError> {
        Ok(())
    }
}

/// The semester-scoped payload sealed into a semester proforma token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterRecord {
    pub seat_number: String,
    pub student_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fathers_name: Option<String>,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub degree_title: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub semester: String,
    pub courses: Vec<CourseResult>,
}

impl SealedRecord for SemesterRecord {
    fn identifier(&self) -> &str {
        &self.seat_number
    }

    fn validate(&self) -> Result<(), RecordError> {
        require_non_blank("seatNumber", &self.seat_number)?;
        require_non_blank("studentName", &self.student_name)?;
        require_non_blank("semester", &self.semester)?;
        validate_courses(&self.courses)
    }
}

/// A degree-level (or otherwise summarised) credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    pub student_name: String,
    pub institution: String,
    pub year: String,
    pub degree_title: String,
    pub seat_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub courses: Option<Vec<CourseResult>>,
}

impl SealedRecord for CredentialRecord {
    fn identifier(&self) -> &str {
        &self.seat_number
    }

    fn validate(&self) -> Result<(), RecordError> {
        require_non_blank("studentName", &self.student_name)?;
        require_non_blank("seatNumber", &self.seat_number)?;
        if let Some(p) = self.percentage {
            if !p.is_finite() {
                return Err(RecordError::NonFiniteMarks {
                    course: "percentage".into(),
                });
            }
        }
        match &self.courses {
            Some(courses) => validate_courses(courses),
            None => Ok(()),
        }
    }
}

/// Untyped records, as accepted by the HTTP service. The identifier is the
/// `seatNumber` member; a record without one has an empty identifier and
/// never matches.
impl SealedRecord for serde_json::Value {
    fn identifier(&self) -> &str {
        self.get("seatNumber")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("")
    }

    fn validate(&self) -> Result<(), RecordError> {
        require_non_blank("seatNumber", self.identifier())
    }
}

/// Case-insensitive, whitespace-trimmed identifier comparison.
pub fn identifiers_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

fn require_non_blank(field: &'static str, value: &str) -> Result<(), RecordError> {
    if value.trim().is_empty() {
        Err(RecordError::BlankField(field))
    } else {
        Ok(())
    }
}

fn validate_courses(courses: &[CourseResult]) -> Result<(), RecordError> {
    match courses.iter().find(|c| !c.marks.is_finite()) {
        Some(bad) => Err(RecordError::NonFiniteMarks {
            course: bad.course_name.clone(),
        }),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Lenient decoding
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

fn number_or_numeric_string<'de, D: Deserializer<'de>>(de: D) -> Result<f64, D::Error> {
    match NumberOrString::deserialize(de)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("marks `{s}` is not a number"))),
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(match NumberOrString::deserialize(de)? {
        NumberOrString::Number(n) => crate::fingerprint::format_score(n),
        NumberOrString::Text(s) => s,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_semester() -> SemesterRecord {
        SemesterRecord {
            seat_number: "2021-CS-01".into(),
            student_name: "A. Khan".into(),
            fathers_name: None,
            department: "Computer Science".into(),
            degree_title: "BS Computer Science".into(),
            semester: "5".into(),
            courses: vec![
                CourseResult::new("Algorithms", "CS301", 78.0),
                CourseResult::new("Databases", "CS302", 45.0),
            ],
        }
    }

    #[test]
    fn test_semester_serializes_with_camel_case_keys() {
        let json = serde_json::to_value(sample_semester()).unwrap();
        assert_eq!(json["seatNumber"], "2021-CS-01");
        assert_eq!(json["degreeTitle"], "BS Computer Science");
        assert_eq!(json["courses"][0]["courseNumber"], "CS301");
        assert!(json.get("fathersName").is_none());
    }

    #[test]
    fn test_decodes_browser_payload_with_string_marks() {
        let raw = r#"{
            "seatNumber": "S-9",
            "studentName": "Sara",
            "fathersName": "Omar",
            "department": "Maths",
            "degreeTitle": "BS Maths",
            "semester": 3,
            "courses": [{"courseName": "Calculus", "courseNumber": "MA101", "marks": "67"}]
        }"#;
        let rec: SemesterRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(rec.semester, "3");
        assert_eq!(rec.courses[0].marks, 67.0);
        assert_eq!(rec.fathers_name.as_deref(), Some("Omar"));
    }

    #[test]
    fn test_rejects_non_numeric_marks() {
        let raw = r#"{"courseName": "X", "courseNumber": "1", "marks": "abc"}"#;
        assert!(serde_json::from_str::<CourseResult>(raw).is_err());
    }

    #[test]
    fn test_validate_flags_non_finite_marks() {
        let mut rec = sample_semester();
        rec.courses[1].marks = f64::NAN;
        assert_eq!(
            rec.validate(),
            Err(RecordError::NonFiniteMarks {
                course: "Databases".into()
            })
        );
    }

    #[test]
    fn test_untyped_record_identifier() {
        let v = serde_json::json!({"seatNumber": "S-1", "courses": []});
        assert_eq!(v.identifier(), "S-1");
        assert!(v.validate().is_ok());

        let anonymous = serde_json::json!({"courses": []});
        assert_eq!(anonymous.identifier(), "");
        assert_eq!(anonymous.validate(), Err(RecordError::BlankField("seatNumber")));
    }

    #[test]
    fn test_validate_flags_blank_seat() {
        let mut rec = sample_semester();
        rec.seat_number = "   ".into();
        assert_eq!(rec.validate(), Err(RecordError::BlankField("seatNumber")));
    }

    #[test]
    fn test_out_of_range_marks_are_not_rejected() {
        let mut rec = sample_semester();
        rec.courses[0].marks = 140.0;
        assert!(rec.validate().is_ok());
    }

    #[test]
    fn test_identifiers_match_ignores_case_and_padding() {
        assert!(identifiers_match(" 2021-cs-01 ", "2021-CS-01"));
        assert!(!identifiers_match("2021-CS-01", "2021-CS-02"));
    }
}
