//! # Grade Aggregation
//!
//! Reduces a course list to `{total, percentage, gpa}` under a
//! [`GradingPolicy`]: a marks-to-grade-point [`GradingScale`] plus a rule for
//! what happens to failing courses.
//!
//! - Institution policies count every course. The percentage denominator is
//!   `courses * 100` and the GPA is the mean grade point over all courses.
//! - The strict policy drops courses below [`FAIL_THRESHOLD`] from numerator,
//!   denominator and GPA mean alike, then reports them separately.
//!
//! Marks are not clamped. A 140 is aggregated as 140.
//!
//! An empty course list has no percentage. Instead of the `0/0 = NaN` a
//! naive implementation would hand to a display layer, [`aggregate`] returns
//! [`GradingError::EmptyCourseList`], and [`GradingError::NoCountedCourses`]
//! when the strict policy excluded everything.
//!
//! The degree helpers at the bottom of this module are string heuristics over
//! free-form degree titles. Unknown titles map to zero semesters, which the
//! transcript treats as "ongoing". That fallback is intentional; don't turn it
//! into a guess.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::config::{
    BACHELOR_SEMESTER_ASSETS, FAILED_LABEL, FAIL_THRESHOLD, MASTER_SEMESTER_ASSETS, MAX_MARKS,
};
use crate::record::CourseResult;

#[derive(Debug, Error, PartialEq)]
pub enum GradingError {
    #[error("cannot aggregate an empty course list")]
    EmptyCourseList,

    #[error("all {failed} courses are below the fail threshold; no percentage can be computed")]
    NoCountedCourses { failed: usize },

    #[error("invalid grading scale: {0}")]
    InvalidScale(String),

    #[error("{degree} requires {expected} semester assets, got {got}")]
    SemesterCount {
        degree: String,
        expected: String,
        got: usize,
    },
}

// ---------------------------------------------------------------------------
// Scales
// ---------------------------------------------------------------------------

/// Marks at or above `min_marks` earn `points`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeTier {
    pub min_marks: f64,
    pub points: f64,
}

/// An ordered marks-to-grade-point lookup table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingScale {
    pub name: String,
    pub tiers: Vec<GradeTier>,
}

impl GradingScale {
    /// Builds a scale, sorting tiers from the highest threshold down.
    pub fn new(name: impl Into<String>, mut tiers: Vec<GradeTier>) -> Result<Self, GradingError> {
        let name = name.into();
        if tiers.is_empty() {
            return Err(GradingError::InvalidScale(format!("{name}: no tiers")));
        }
        if tiers
            .iter()
            .any(|t| !t.min_marks.is_finite() || !t.points.is_finite() || t.points < 0.0)
        {
            return Err(GradingError::InvalidScale(format!(
                "{name}: thresholds and points must be finite and non-negative"
            )));
        }
        tiers.sort_by(|a, b| b.min_marks.total_cmp(&a.min_marks));
        Ok(Self { name, tiers })
    }

    /// Grade point for one course; zero below the lowest tier.
    pub fn grade_points(&self, marks: f64) -> f64 {
        self.tiers
            .iter()
            .find(|t| marks >= t.min_marks)
            .map(|t| t.points)
            .unwrap_or(0.0)
    }

    fn from_table(name: &str, table: &[(f64, f64)]) -> Self {
        Self {
            name: name.to_string(),
            tiers: table
                .iter()
                .map(|&(min_marks, points)| GradeTier { min_marks, points })
                .collect(),
        }
    }

    /// Standard 4.0 scale, ten tiers from 51 → 1.0 to 85+ → 4.0.
    pub fn karachi_university() -> Self {
        Self::from_table(
            "Karachi University",
            &[
                (85.0, 4.0),
                (81.0, 3.8),
                (76.0, 3.4),
                (71.0, 3.0),
                (68.0, 2.8),
                (64.0, 2.4),
                (61.0, 2.0),
                (58.0, 1.8),
                (54.0, 1.4),
                (51.0, 1.0),
            ],
        )
    }

    /// Lenient scale; passes from 45.
    pub fn smiu() -> Self {
        Self::from_table(
            "Sindh Madressatul Islam University",
            &[
                (85.0, 4.0),
                (80.0, 3.7),
                (75.0, 3.3),
                (70.0, 3.0),
                (65.0, 2.7),
                (60.0, 2.3),
                (55.0, 2.0),
                (50.0, 1.7),
                (45.0, 1.0),
            ],
        )
    }

    /// Stricter scale; nothing below 60.
    pub fn abc_university() -> Self {
        Self::from_table(
            "ABC University",
            &[
                (90.0, 4.0),
                (85.0, 3.8),
                (80.0, 3.4),
                (75.0, 3.0),
                (70.0, 2.8),
                (65.0, 2.5),
                (60.0, 2.0),
            ],
        )
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// What failing courses do to the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedCourses {
    /// Failing courses stay in numerator and denominator.
    Counted,
    /// Failing courses are dropped from the aggregate entirely.
    Excluded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingPolicy {
    pub scale: GradingScale,
    pub failed_courses: FailedCourses,
    pub fail_threshold: f64,
}

impl GradingPolicy {
    /// The default policy: standard scale, failing courses excluded.
    pub fn strict() -> Self {
        Self {
            scale: GradingScale::karachi_university(),
            failed_courses: FailedCourses::Excluded,
            fail_threshold: FAIL_THRESHOLD,
        }
    }

    /// An institution's own scale with every course counted.
    pub fn institution(scale: GradingScale) -> Self {
        Self {
            scale,
            failed_courses: FailedCourses::Counted,
            fail_threshold: FAIL_THRESHOLD,
        }
    }

    pub fn is_failing(&self, marks: f64) -> bool {
        marks < self.fail_threshold
    }
}

impl Default for GradingPolicy {
    fn default() -> Self {
        Self::strict()
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Mean grade point, or the failed label when it is zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gpa {
    Points(f64),
    Failed,
}

impl Gpa {
    fn from_mean(mean: f64) -> Self {
        if mean == 0.0 {
            Gpa::Failed
        } else {
            Gpa::Points(mean)
        }
    }
}

impl fmt::Display for Gpa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gpa::Points(p) => write!(f, "{:.2}", p),
            Gpa::Failed => f.write_str(FAILED_LABEL),
        }
    }
}

impl Serialize for Gpa {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeSummary {
    /// Sum of counted marks.
    pub total: f64,
    pub percentage: f64,
    pub gpa: Gpa,
    pub counted_courses: usize,
    /// Courses below the fail threshold, in input order.
    pub failed: Vec<CourseResult>,
}

/// Aggregates a course list under `policy`.
pub fn aggregate(courses: &[CourseResult], policy: &GradingPolicy) -> Result<GradeSummary, GradingError> {
    if courses.is_empty() {
        return Err(GradingError::EmptyCourseList);
    }

    let (failed, passing): (Vec<&CourseResult>, Vec<&CourseResult>) =
        courses.iter().partition(|c| policy.is_failing(c.marks));

    let counted: Vec<&CourseResult> = match policy.failed_courses {
        FailedCourses::Counted => courses.iter().collect(),
        FailedCourses::Excluded => passing,
    };
    if counted.is_empty() {
        return Err(GradingError::NoCountedCourses {
            failed: failed.len(),
        });
    }

    let total: f64 = counted.iter().map(|c| c.marks).sum();
    let n = counted.len() as f64;
    let percentage = total / (n * MAX_MARKS) * 100.0;
    let mean_points = counted
        .iter()
        .map(|c| policy.scale.grade_points(c.marks))
        .sum::<f64>()
        / n;

    Ok(GradeSummary {
        total,
        percentage,
        gpa: Gpa::from_mean(mean_points),
        counted_courses: counted.len(),
        failed: failed.into_iter().cloned().collect(),
    })
}

/// Plain mean of a semester's marks, as used when a degree percentage is
/// derived from sealed semester payloads. `None` for an empty semester.
pub fn semester_average(courses: &[CourseResult]) -> Option<f64> {
    if courses.is_empty() {
        return None;
    }
    Some(courses.iter().map(|c| c.marks).sum::<f64>() / courses.len() as f64)
}

/// Mean of the per-semester averages, skipping empty semesters.
pub fn degree_percentage<'a, I>(semesters: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a [CourseResult]>,
{
    let averages: Vec<f64> = semesters.into_iter().filter_map(semester_average).collect();
    if averages.is_empty() {
        return None;
    }
    Some(averages.iter().sum::<f64>() / averages.len() as f64)
}

// ---------------------------------------------------------------------------
// Degree-title heuristics
// ---------------------------------------------------------------------------

/// Semesters a degree title implies: bachelor-class 8, master-class 4,
/// doctoral-class 2, unknown 0.
///
/// Plain substring matching on the lowercased title, first match wins, so
/// "Bachelor of Science" hits `ba` and "Master of Arts" hits `ma`.
pub fn required_semester_count(degree_title: &str) -> u32 {
    let d = degree_title.trim().to_lowercase();
    let has = |keys: &[&str]| keys.iter().any(|k| d.contains(k));

    if has(&["bs", "ba", "be", "bba"]) {
        8
    } else if has(&["ms", "ma", "me", "mba"]) {
        4
    } else if has(&["mphil", "phd"]) {
        2
    } else if has(&["finance", "management"]) {
        2
    } else {
        0
    }
}

/// Checks the number of semester assets referenced by a degree at issuance:
/// bachelor titles need exactly 8, master titles 4 or 2, anything else is
/// unconstrained. An empty list is always accepted (the issuer supplied a
/// percentage directly instead).
pub fn validate_semester_asset_count(degree_title: &str, count: usize) -> Result<(), GradingError> {
    if count == 0 {
        return Ok(());
    }
    let d = degree_title.to_lowercase();
    if d.contains("bachelor") && count != BACHELOR_SEMESTER_ASSETS {
        return Err(GradingError::SemesterCount {
            degree: degree_title.to_string(),
            expected: BACHELOR_SEMESTER_ASSETS.to_string(),
            got: count,
        });
    }
    if d.contains("master") && !MASTER_SEMESTER_ASSETS.contains(&count) {
        return Err(GradingError::SemesterCount {
            degree: degree_title.to_string(),
            expected: "4 or 2".to_string(),
            got: count,
        });
    }
    Ok(())
}
