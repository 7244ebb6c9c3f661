//! `RequirementContext`: the single mutable surface threaded through an
//! audit. The rule tree is loaded once and never mutated; this holds the
//! transcript, declared areas, exceptions, and the claim ledger.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;

use crate::claim::{Claim, ClaimAttempt, ClaimLedger, MulticountablePolicy};
use crate::clause::Clause;
use crate::error::ContextError;
use crate::exception::RuleException;
use crate::result::Rank;
use crate::result::ResultStatus;
use crate::rule::RulePath;
use crate::value::{AreaKind, AreaPointer, Clbid, CourseInstance, CourseType, MusicPerformance, MusicProficiencies};

#[derive(Clone, Default, Debug)]
pub struct RequirementContext {
    transcript: Vec<CourseInstance>,
    clbid_index: HashMap<Clbid, usize>,
    shorthand_index: HashMap<String, Vec<usize>>,

    pub areas: Vec<AreaPointer>,
    pub multicountable: MulticountablePolicy,
    pub claims: ClaimLedger,
    pub music_proficiencies: MusicProficiencies,
    pub music_performances: Vec<MusicPerformance>,

    exceptions: HashMap<RulePath, Vec<RuleException>>,
    /// Filled in as named `requirement` rules are audited, so a `reference`
    /// rule elsewhere in the tree can report the same status/rank without
    /// re-running (and re-claiming) the referenced subtree.
    requirement_results: HashMap<String, (ResultStatus, Rank)>,
}

impl RequirementContext {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_transcript(mut self, transcript: Vec<CourseInstance>) -> Self {
        self.clbid_index = transcript
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clbid.clone(), i))
            .collect();

        let mut shorthand_index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, c) in transcript.iter().enumerate() {
            shorthand_index.entry(c.course_shorthand()).or_default().push(i);
            shorthand_index.entry(c.course.clone()).or_default().push(i);
        }
        self.shorthand_index = shorthand_index;
        self.transcript = transcript;
        self
    }

    pub fn with_areas(mut self, areas: Vec<AreaPointer>) -> Self {
        self.areas = areas;
        self
    }

    /// Used when only the declared area codes are known (tests, and
    /// predicate evaluation that only cares about `has-declared-area-code`).
    pub fn with_declared_areas(mut self, codes: Vec<String>) -> Self {
        self.areas = codes
            .into_iter()
            .map(|code| AreaPointer {
                code,
                catalog: String::new(),
                kind: AreaKind::Major,
                gpa: None,
            })
            .collect();
        self
    }

    pub fn with_multicountable(mut self, policy: MulticountablePolicy) -> Self {
        self.multicountable = policy;
        self
    }

    pub fn with_music_proficiencies(mut self, proficiencies: MusicProficiencies) -> Self {
        self.music_proficiencies = proficiencies;
        self
    }

    pub fn with_music_performances(mut self, performances: Vec<MusicPerformance>) -> Self {
        self.music_performances = performances;
        self
    }

    pub fn with_exceptions(mut self, exceptions: HashMap<RulePath, Vec<RuleException>>) -> Self {
        self.exceptions = exceptions;
        self
    }

    pub fn find_course_by_clbid(&self, clbid: &Clbid) -> Option<&CourseInstance> {
        self.clbid_index.get(clbid).map(|&i| &self.transcript[i])
    }

    /// Courses matching a "SUBJ 101"-style shorthand or the full `course`
    /// string.
    pub fn find_course(&self, shorthand: &str) -> Vec<&CourseInstance> {
        self.shorthand_index
            .get(shorthand)
            .map(|idxs| idxs.iter().map(|&i| &self.transcript[i]).collect())
            .unwrap_or_default()
    }

    /// AP/IB/CAL credit, keyed on the transfer course's name rather than a
    /// catalog shorthand (`degreepath/context.py::find_course`, "other"
    /// branch).
    pub fn find_other_courses(&self, name: &str, course_type: CourseType) -> Vec<&CourseInstance> {
        self.transcript
            .iter()
            .filter(|c| c.course_type == course_type && c.course == name)
            .collect()
    }

    pub fn find_all_courses(&self) -> &[CourseInstance] {
        &self.transcript
    }

    /// Courses that have actually been completed — deliberately excludes
    /// in-progress courses, unlike a naive pass-through (see DESIGN.md Open
    /// Questions).
    pub fn completed_courses(&self) -> Vec<&CourseInstance> {
        self.transcript.iter().filter(|c| !c.is_in_progress).collect()
    }

    pub fn has_course(&self, course: &str) -> bool {
        !self.find_course(course).is_empty()
    }

    pub fn has_ip_course(&self, course: &str) -> bool {
        self.find_course(course).iter().any(|c| c.is_in_progress)
    }

    pub fn has_completed_course(&self, course: &str) -> bool {
        self.find_course(course).iter().any(|c| !c.is_in_progress)
    }

    pub fn has_declared_area_code(&self, code: &str) -> bool {
        self.areas.iter().any(|a| a.code == code)
    }

    fn exceptions_at(&self, path: &RulePath) -> &[RuleException] {
        self.exceptions.get(path).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn get_insert_exceptions(&self, path: &RulePath) -> Vec<Clbid> {
        self.exceptions_at(path)
            .iter()
            .filter_map(|e| match e {
                RuleException::Insert { clbid } => Some(clbid.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn get_waive_exception(&self, path: &RulePath) -> bool {
        self.exceptions_at(path).iter().any(|e| matches!(e, RuleException::Waive))
    }

    pub fn get_value_exception(&self, path: &RulePath) -> Option<Decimal> {
        self.exceptions_at(path).iter().find_map(|e| match e {
            RuleException::Value { value } => Some(*value),
            _ => None,
        })
    }

    pub fn get_course_override(&self, path: &RulePath) -> Option<Clbid> {
        self.exceptions_at(path).iter().find_map(|e| match e {
            RuleException::ForceCourse { clbid } => Some(clbid.clone()),
            _ => None,
        })
    }

    /// A `course` rule forced to a specific clbid by exception; errors if
    /// that clbid isn't actually on the transcript.
    pub fn forced_course_by_clbid(&self, path: &RulePath) -> Result<Option<&CourseInstance>, ContextError> {
        match self.get_course_override(path) {
            None => Ok(None),
            Some(clbid) => self
                .find_course_by_clbid(&clbid)
                .map(Some)
                .ok_or_else(|| ContextError::MissingForcedClbid {
                    path: path.clone(),
                    clbid: clbid.0,
                }),
        }
    }

    pub fn make_claim(
        &mut self,
        course: &CourseInstance,
        path: &RulePath,
        clause: Clause,
        allow_claimed: bool,
    ) -> ClaimAttempt {
        let policy = self.multicountable.clone();
        self.claims.make_claim(course, path, clause, allow_claimed, &policy)
    }

    pub fn reset_claims(&mut self) {
        self.claims.reset();
    }

    /// Scoped backtracking support (§5): snapshot before trying a candidate
    /// branch, restore if it doesn't pan out.
    pub fn claims_snapshot(&self) -> HashMap<Clbid, HashSet<Claim>> {
        self.claims.snapshot()
    }

    pub fn restore_claims(&mut self, snapshot: HashMap<Clbid, HashSet<Claim>>) {
        self.claims.restore(snapshot);
    }

    pub fn record_requirement_result(&mut self, name: &str, status: ResultStatus, rank: Rank) {
        self.requirement_results.insert(name.to_string(), (status, rank));
    }

    pub fn requirement_result(&self, name: &str) -> Option<(ResultStatus, Rank)> {
        self.requirement_results.get(name).copied()
    }
}
