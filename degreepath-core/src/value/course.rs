use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::{Clbid, Crsid};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum GradeOption {
    Graded,
    #[serde(rename = "pn", alias = "pass_fail")]
    PassFail,
    Audit,
    NoGrade,
}

/// How a course instance entered the transcript. Open-ended: new
/// transfer-credit sources can be added without touching clause logic, since
/// `Clause::apply` only ever compares it for (in)equality.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum CourseType {
    Regular,
    #[serde(rename = "ap")]
    AP,
    #[serde(rename = "ib")]
    IB,
    #[serde(rename = "cal")]
    CAL,
    Transfer,
}

/// Ordinal term within an academic year, used to find the "earliest"
/// instance of a retaken course (`Query::source_repeats == First`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Term {
    Fall,
    Interim,
    Spring,
    Summer,
}

/// One transcript line: an immutable record of a single course-taking event.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CourseInstance {
    pub clbid: Clbid,
    pub crsid: Crsid,

    /// Canonical "SUBJ 101" rendering.
    pub course: String,
    pub subject: Vec<String>,

    pub grade_points: Decimal,
    pub grade_option: GradeOption,
    pub credits: Decimal,
    pub course_type: CourseType,

    pub is_in_progress: bool,
    pub is_in_progress_this_term: bool,
    pub is_in_progress_in_future: bool,
    pub is_incomplete: bool,
    pub is_in_gpa: bool,

    #[serde(default)]
    pub attributes: BTreeSet<String>,
    #[serde(default)]
    pub gereqs: BTreeSet<String>,

    pub year: u16,
    pub term: Term,
    pub section: Option<String>,
}

impl CourseInstance {
    /// "SUBJ 101" without section, used as a secondary lookup key alongside
    /// the fully-qualified `course` string.
    pub fn course_shorthand(&self) -> String {
        self.course
            .split_whitespace()
            .take(2)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Invariant: an in-progress course must be enrolled this term,
    /// registered for a future term, or incomplete. Violating this is a
    /// programming bug in the data feeding the audit, not a domain negative.
    pub fn check_in_progress_invariant(&self) -> Result<(), crate::error::Unreachable> {
        if self.is_in_progress
            && !(self.is_in_progress_this_term || self.is_in_progress_in_future || self.is_incomplete)
        {
            return Err(crate::error::Unreachable::InconsistentInProgressCourse {
                clbid: self.clbid.0.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CourseInstance {
        CourseInstance {
            clbid: Clbid::from("c1"),
            crsid: Crsid::from("crs1"),
            course: "BIO 101".to_string(),
            subject: vec!["BIO".to_string()],
            grade_points: Decimal::new(40, 1),
            grade_option: GradeOption::Graded,
            credits: Decimal::new(10, 1),
            course_type: CourseType::Regular,
            is_in_progress: false,
            is_in_progress_this_term: false,
            is_in_progress_in_future: false,
            is_incomplete: false,
            is_in_gpa: true,
            attributes: BTreeSet::new(),
            gereqs: BTreeSet::new(),
            year: 2020,
            term: Term::Fall,
            section: Some("01".to_string()),
        }
    }

    #[test]
    fn shorthand_drops_section() {
        let mut c = sample();
        c.course = "BIO 101.01".to_string();
        assert_eq!(c.course_shorthand(), "BIO 101.01");
    }

    #[test]
    fn in_progress_invariant_holds_for_completed_course() {
        assert!(sample().check_in_progress_invariant().is_ok());
    }

    #[test]
    fn in_progress_invariant_fails_when_unexplained() {
        let mut c = sample();
        c.is_in_progress = true;
        assert!(c.check_in_progress_invariant().is_err());
    }
}
