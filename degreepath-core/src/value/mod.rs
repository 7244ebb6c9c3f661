mod area;
mod course;
mod ids;
mod music;

pub use area::{AreaKind, AreaPointer};
pub use course::{CourseInstance, CourseType, GradeOption, Term};
pub use ids::{Clbid, Crsid};
pub use music::{MusicPerformance, MusicPerformanceKind, MusicProficiencies, ProficiencyStatus};

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A typed value read off a `Clausable`, or carried as a clause's `expected`.
/// Scalars compare directly; `StrSet` is the representation for set-valued
/// course attributes (`attributes`, `gereqs`, cross-listed `subject`).
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClauseValue {
    Str(String),
    Decimal(Decimal),
    Bool(bool),
    Grade(GradeOption),
    StrSet(BTreeSet<String>),
    StrList(Vec<String>),
    DecimalList(Vec<Decimal>),
}

impl ClauseValue {
    pub fn is_set_valued(&self) -> bool {
        matches!(self, ClauseValue::StrSet(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ClauseValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            ClauseValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }
}

/// Anything a `Clause` can be applied to: a transcript course, a declared
/// area, or any other item carried through the solver (music performances,
/// recitals).
pub trait Clausable {
    /// Fetch the attribute named by `key`, if this kind of item has one.
    fn attribute(&self, key: &str) -> Option<ClauseValue>;
}

impl Clausable for CourseInstance {
    fn attribute(&self, key: &str) -> Option<ClauseValue> {
        Some(match key {
            "course" => ClauseValue::Str(self.course.clone()),
            "crsid" => ClauseValue::Str(self.crsid.0.clone()),
            "clbid" => ClauseValue::Str(self.clbid.0.clone()),
            "subject" => ClauseValue::StrSet(self.subject.iter().cloned().collect()),
            "attributes" => ClauseValue::StrSet(self.attributes.clone()),
            "gereqs" => ClauseValue::StrSet(self.gereqs.clone()),
            "grade" => ClauseValue::Decimal(self.grade_points),
            "grade_option" => ClauseValue::Grade(self.grade_option),
            "credits" => ClauseValue::Decimal(self.credits),
            "year" => ClauseValue::Decimal(Decimal::from(self.year)),
            _ => return None,
        })
    }
}

impl Clausable for AreaPointer {
    fn attribute(&self, key: &str) -> Option<ClauseValue> {
        Some(match key {
            "code" => ClauseValue::Str(self.code.clone()),
            "catalog" => ClauseValue::Str(self.catalog.clone()),
            "gpa" => ClauseValue::Decimal(self.gpa.unwrap_or_default()),
            _ => return None,
        })
    }
}

impl Clausable for MusicPerformance {
    fn attribute(&self, key: &str) -> Option<ClauseValue> {
        Some(match key {
            "id" => ClauseValue::Str(self.id.clone()),
            _ => return None,
        })
    }
}
