//! # Transcript Summary
//!
//! Collates a student's revealed semesters into the figures a printed
//! marksheet shows: per-semester totals and percentages under the strict
//! policy, a GPA label on the institution's own scale, the overall degree
//! percentage in digits and words, and whether the degree is complete.
//!
//! A semester whose courses all failed has no strict percentage. It still
//! appears in the transcript but does not contribute to the overall figure.

use serde::Serialize;
use thiserror::Error;

use crate::grading::{aggregate, required_semester_count, Gpa, GradingError, GradingPolicy};
use crate::record::SemesterRecord;
use crate::registry::InstitutionRegistry;

const ONES: [&str; 20] = [
    "Zero", "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine", "Ten", "Eleven",
    "Twelve", "Thirteen", "Fourteen", "Fifteen", "Sixteen", "Seventeen", "Eighteen", "Nineteen",
];

const TENS: [&str; 10] = [
    "", "", "Twenty", "Thirty", "Forty", "Fifty", "Sixty", "Seventy", "Eighty", "Ninety",
];

pub const ONGOING_LABEL: &str = "Ongoing";
pub const COMPLETED_LABEL: &str = "Completed";

#[derive(Debug, Error, PartialEq)]
pub enum TranscriptError {
    #[error("a transcript needs at least one semester")]
    NoSemesters,
}

/// English words for a whole number from 0 to 100: `78` → "Seventy Eight".
/// `None` outside that range.
pub fn number_to_words(n: u32) -> Option<String> {
    let words = match n {
        0..=19 => ONES[n as usize].to_string(),
        100 => "One Hundred".to_string(),
        20..=99 => {
            let (tens, ones) = ((n / 10) as usize, (n % 10) as usize);
            if ones == 0 {
                TENS[tens].to_string()
            } else {
                format!("{} {}", TENS[tens], ONES[ones])
            }
        }
        _ => return None,
    };
    Some(words)
}

/// Rounds a percentage half-up and spells it out.
pub fn percentage_in_words(percentage: f64) -> Option<String> {
    let rounded = percentage.round();
    if !(0.0..=100.0).contains(&rounded) {
        return None;
    }
    number_to_words(rounded as u32)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseLine {
    pub course_number: String,
    pub course_name: String,
    pub marks: f64,
    /// Grade point on the institution's scale.
    pub grade_points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterLine {
    pub semester: String,
    pub courses: Vec<CourseLine>,
    /// Sum of passing marks.
    pub total: f64,
    /// Strict percentage; `None` when no course passed.
    pub percentage: Option<f64>,
    pub percentage_words: Option<String>,
    /// Institution-scale GPA over every course; `None` for an empty semester.
    pub gpa: Option<Gpa>,
    pub failed_courses: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSummary {
    pub student_name: String,
    pub institution: String,
    pub degree_title: String,
    pub semesters: Vec<SemesterLine>,
    pub overall_percentage: Option<f64>,
    pub overall_words: Option<String>,
    pub required_semesters: u32,
    pub completed: bool,
}

impl TranscriptSummary {
    /// "Completed", or "Ongoing" while semesters are missing or the degree
    /// title implies no known semester count.
    pub fn status_label(&self) -> &'static str {
        if self.completed {
            COMPLETED_LABEL
        } else {
            ONGOING_LABEL
        }
    }
}

fn semester_line(record: &SemesterRecord, institution_policy: &GradingPolicy) -> SemesterLine {
    let strict = aggregate(&record.courses, &GradingPolicy::strict());
    let (total, percentage, failed_courses) = match strict {
        Ok(s) => (s.total, Some(s.percentage), s.failed.len()),
        Err(GradingError::NoCountedCourses { failed }) => (0.0, None, failed),
        Err(_) => (0.0, None, 0),
    };
    let gpa = aggregate(&record.courses, institution_policy).ok().map(|s| s.gpa);

    SemesterLine {
        semester: record.semester.clone(),
        courses: record
            .courses
            .iter()
            .map(|c| CourseLine {
                course_number: c.course_number.clone(),
                course_name: c.course_name.clone(),
                marks: c.marks,
                grade_points: institution_policy.scale.grade_points(c.marks),
            })
            .collect(),
        total,
        percentage,
        percentage_words: percentage.and_then(percentage_in_words),
        gpa,
        failed_courses,
    }
}

/// Builds the transcript for semesters already revealed with the student's
/// seat number. Semesters keep the order they were given in.
pub fn build_transcript(
    student_name: &str,
    institution: &str,
    degree_title: &str,
    semesters: &[SemesterRecord],
    registry: &InstitutionRegistry,
) -> Result<TranscriptSummary, TranscriptError> {
    if semesters.is_empty() {
        return Err(TranscriptError::NoSemesters);
    }

    let policy = registry.policy_for(institution);
    let lines: Vec<SemesterLine> = semesters.iter().map(|s| semester_line(s, &policy)).collect();

    let counted: Vec<f64> = lines.iter().filter_map(|l| l.percentage).collect();
    let overall_percentage = if counted.is_empty() {
        None
    } else {
        Some(counted.iter().sum::<f64>() / counted.len() as f64)
    };

    let required_semesters = required_semester_count(degree_title);
    let completed = required_semesters > 0 && lines.len() == required_semesters as usize;

    tracing::debug!(
        semesters = lines.len(),
        required_semesters,
        completed,
        "transcript built"
    );

    Ok(TranscriptSummary {
        student_name: student_name.trim().to_string(),
        institution: institution.trim().to_string(),
        degree_title: degree_title.trim().to_string(),
        semesters: lines,
        overall_percentage,
        overall_words: overall_percentage.and_then(percentage_in_words),
        required_semesters,
        completed,
    })
}
