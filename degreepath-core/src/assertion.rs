//! Assertions apply a reducer to a matched item set and compare the result
//! against an expected value (§4.2), with an optional conditional wrapper.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::clause::{apply_numeric_operator, Clause, Operator};
use crate::context::RequirementContext;
use crate::predicate::PredicateExpression;
use crate::result::{done_rank, empty_rank, Rank, ResultStatus};
use crate::rule::RulePath;
use crate::value::{AreaPointer, Clbid, CourseInstance, MusicPerformance, MusicPerformanceKind};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum DataType {
    Course,
    Area,
    MusicPerformance,
    Recital,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ValueChangeMode {
    Add,
    Subtract,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ValueChange {
    pub mode: ValueChangeMode,
    pub condition: PredicateExpression,
    pub amount: Decimal,
}

/// Sum all firing changes into a single diff, applied once the condition's
/// predicate expression has been resolved (§4.2).
pub fn compute_change_diff(changes: &[ValueChange]) -> Decimal {
    let mut diff = Decimal::ZERO;
    for change in changes {
        if !change.condition.result().unwrap_or(false) {
            continue;
        }
        match change.mode {
            ValueChangeMode::Add => diff += change.amount,
            ValueChangeMode::Subtract => diff -= change.amount,
        }
    }
    diff
}

/// What a matched-and-reduced item set looked like, for reporting and for
/// the in-progress-course pending-status logic.
#[derive(Clone, Debug, Default)]
pub struct ReducedCourses {
    pub value: Decimal,
    pub matched: Vec<CourseInstance>,
}

fn reduce_courses(key: &str, items: &[CourseInstance]) -> ReducedCourses {
    let value = match key {
        "count(courses)" => Decimal::from(items.len()),
        "count(terms)" => {
            let mut terms: Vec<(u16, _)> = items.iter().map(|c| (c.year, c.term)).collect();
            terms.sort_by_key(|(y, t)| (*y, *t as u8));
            terms.dedup();
            Decimal::from(terms.len())
        }
        "count(subjects)" => {
            let mut subjects: Vec<&String> = items.iter().flat_map(|c| c.subject.iter()).collect();
            subjects.sort();
            subjects.dedup();
            Decimal::from(subjects.len())
        }
        "count(distinct_courses)" => {
            let mut crsids: Vec<&str> = items.iter().map(|c| c.crsid.0.as_str()).collect();
            crsids.sort();
            crsids.dedup();
            Decimal::from(crsids.len())
        }
        "sum(credits)" => items.iter().map(|c| c.credits).sum(),
        "average(grades)" => average(items.iter().map(|c| c.grade_points)),
        "average(credits)" => average(items.iter().map(|c| c.credits)),
        _ => Decimal::ZERO,
    };

    ReducedCourses {
        value,
        matched: items.to_vec(),
    }
}

fn average(values: impl Iterator<Item = Decimal> + Clone) -> Decimal {
    let count = values.clone().count();
    if count == 0 {
        return Decimal::ZERO;
    }
    values.sum::<Decimal>() / Decimal::from(count)
}

fn reduce_areas(key: &str, items: &[AreaPointer]) -> Decimal {
    match key {
        "count(areas)" => Decimal::from(items.len()),
        _ => Decimal::ZERO,
    }
}

fn reduce_music(key: &str, items: &[MusicPerformance], kind: MusicPerformanceKind) -> Decimal {
    let matching = items.iter().filter(|p| p.kind == kind).count();
    match key {
        "count(performances)" | "count(recitals)" => Decimal::from(matching),
        _ => Decimal::ZERO,
    }
}

/// What a candidate set was filtered/reduced from — whichever source a
/// `Query` was drawing from.
#[derive(Clone, Copy, Debug)]
pub enum AssertionInput<'a> {
    Courses(&'a [CourseInstance]),
    Areas(&'a [AreaPointer]),
    Music(&'a [MusicPerformance]),
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Assertion {
    pub path: RulePath,
    pub data_type: DataType,
    pub where_clause: Option<Clause>,
    pub key: String,
    pub operator: Operator,
    pub expected: Decimal,
    pub original: Option<Decimal>,
    pub changes: Vec<ValueChange>,
    pub at_most: bool,
    pub treat_in_progress_as_pass: bool,
    pub overridden: bool,
    pub evaluated: bool,
    pub state: ResultStatus,
    pub resolved: Option<Decimal>,
    pub resolved_clbids: Vec<Clbid>,
    pub inserted_clbids: Vec<Clbid>,
}

impl Assertion {
    pub fn waive(&self) -> Assertion {
        Assertion {
            resolved: Some(Decimal::ZERO),
            evaluated: true,
            state: ResultStatus::Waived,
            overridden: true,
            ..self.clone()
        }
    }

    pub fn override_expected(&self, value: Decimal) -> Assertion {
        Assertion {
            expected: value,
            original: Some(value),
            ..self.clone()
        }
    }

    pub fn rank(&self) -> Rank {
        if matches!(self.state, ResultStatus::Done | ResultStatus::Waived) {
            return done_rank();
        }

        let resolved = match self.resolved {
            Some(r) => r,
            None => return empty_rank(),
        };

        if matches!(self.operator, Operator::LessThan | Operator::LessThanOrEqualTo) {
            return empty_rank();
        }

        if self.expected != Decimal::ZERO {
            return (std::cmp::min(Decimal::ONE, resolved / self.expected), Decimal::ONE);
        }

        empty_rank()
    }

    pub fn is_simple_count_clause(&self) -> bool {
        matches!(self.key.as_str(), "count(courses)" | "count(terms)")
    }

    pub fn is_simple_sum_clause(&self) -> bool {
        self.key == "sum(credits)"
    }

    pub fn is_lt_clause(&self) -> bool {
        matches!(self.operator, Operator::LessThan | Operator::LessThanOrEqualTo)
    }

    pub fn is_at_least_0_clause(&self) -> bool {
        self.operator == Operator::GreaterThanOrEqualTo && self.expected == Decimal::ZERO
    }

    /// Candidate subset sizes to try, ordered for deterministic, pruned
    /// enumeration (§4.4, grounded in `assertion_clause.py::input_size_range`).
    pub fn input_size_range(&self, maximum: usize) -> Vec<usize> {
        input_size_range(self.expected, self.operator, self.at_most, maximum)
    }

    pub fn audit_and_resolve(&self, input: AssertionInput<'_>, ctx: &RequirementContext) -> Assertion {
        if self.overridden {
            return self.clone();
        }

        match (self.data_type, input) {
            (DataType::Course, AssertionInput::Courses(items)) => self.audit_courses(items, ctx),
            (DataType::Area, AssertionInput::Areas(items)) => self.audit_areas(items, ctx),
            (DataType::MusicPerformance, AssertionInput::Music(items)) => {
                self.audit_music(items, MusicPerformanceKind::Performance)
            }
            (DataType::Recital, AssertionInput::Music(items)) => {
                self.audit_music(items, MusicPerformanceKind::Recital)
            }
            _ => self.clone(),
        }
    }

    fn filtered_courses<'a>(&self, items: &'a [CourseInstance]) -> Vec<CourseInstance> {
        match &self.where_clause {
            Some(clause) => items.iter().filter(|c| clause.apply(*c)).cloned().collect(),
            None => items.to_vec(),
        }
    }

    fn audit_courses(&self, items: &[CourseInstance], ctx: &RequirementContext) -> Assertion {
        let mut filtered = self.filtered_courses(items);
        let mut inserted_clbids = Vec::new();
        for insert in ctx.get_insert_exceptions(&self.path) {
            if let Some(course) = ctx.find_course_by_clbid(&insert) {
                filtered.push(course.clone());
                inserted_clbids.push(course.clbid.clone());
            }
        }

        let reduced = reduce_courses(&self.key, &filtered);
        let expected = self.expected + compute_change_diff(&self.changes);
        let operator_result = apply_numeric_operator(reduced.value, self.operator, expected);

        let state = if operator_result {
            classify_course_pass(&self.key, self.operator, self.treat_in_progress_as_pass, &reduced.matched, expected)
        } else {
            classify_failure(self.operator, reduced.value, expected)
        };

        Assertion {
            evaluated: true,
            state,
            resolved: Some(reduced.value),
            resolved_clbids: reduced.matched.iter().map(|c| c.clbid.clone()).collect(),
            inserted_clbids,
            expected,
            ..self.clone()
        }
    }

    fn audit_areas(&self, items: &[AreaPointer], _ctx: &RequirementContext) -> Assertion {
        let filtered: Vec<AreaPointer> = match &self.where_clause {
            Some(clause) => items.iter().filter(|a| clause.apply(*a)).cloned().collect(),
            None => items.to_vec(),
        };
        let value = reduce_areas(&self.key, &filtered);
        let expected = self.expected + compute_change_diff(&self.changes);
        let operator_result = apply_numeric_operator(value, self.operator, expected);
        let state = if operator_result {
            ResultStatus::Done
        } else {
            classify_failure(self.operator, value, expected)
        };

        Assertion {
            evaluated: true,
            state,
            resolved: Some(value),
            expected,
            resolved_clbids: Vec::new(),
            inserted_clbids: Vec::new(),
            ..self.clone()
        }
    }

    fn audit_music(&self, items: &[MusicPerformance], kind: MusicPerformanceKind) -> Assertion {
        let value = reduce_music(&self.key, items, kind);
        let expected = self.expected + compute_change_diff(&self.changes);
        let operator_result = apply_numeric_operator(value, self.operator, expected);
        let state = if operator_result {
            ResultStatus::Done
        } else {
            classify_failure(self.operator, value, expected)
        };

        Assertion {
            evaluated: true,
            state,
            resolved: Some(value),
            expected,
            resolved_clbids: Vec::new(),
            inserted_clbids: Vec::new(),
            ..self.clone()
        }
    }
}

fn classify_failure(operator: Operator, computed: Decimal, expected: Decimal) -> ResultStatus {
    let zero = Decimal::ZERO;
    match operator {
        Operator::GreaterThan if zero < computed && computed <= expected => ResultStatus::NeedsMoreItems,
        Operator::GreaterThanOrEqualTo if zero < computed && computed < expected => ResultStatus::NeedsMoreItems,
        Operator::EqualTo if zero < computed && computed < expected => ResultStatus::NeedsMoreItems,
        Operator::LessThan | Operator::LessThanOrEqualTo => ResultStatus::FailedInvariant,
        _ => ResultStatus::Empty,
    }
}

/// §4.2 course status assignment when the operator is satisfied on the full
/// matched set — handle in-progress courses by re-testing the operator with
/// them excluded before falling back to a pending status.
fn classify_course_pass(
    key: &str,
    operator: Operator,
    treat_in_progress_as_pass: bool,
    matched: &[CourseInstance],
    expected: Decimal,
) -> ResultStatus {
    let has_ip = matched.iter().any(|c| c.is_in_progress);
    if !has_ip {
        return ResultStatus::Done;
    }

    if treat_in_progress_as_pass {
        return ResultStatus::Done;
    }

    let without_ip: Vec<CourseInstance> = matched.iter().filter(|c| !c.is_in_progress).cloned().collect();
    let reduced_without_ip = reduce_courses(key, &without_ip);
    if apply_numeric_operator(reduced_without_ip.value, operator, expected) {
        return ResultStatus::Done;
    }

    let has_enrolled = matched.iter().any(|c| c.is_in_progress_this_term);
    let has_registered = matched.iter().any(|c| c.is_in_progress_in_future);
    let has_incomplete = matched.iter().any(|c| c.is_incomplete);

    if (has_enrolled || has_incomplete) && !has_registered {
        ResultStatus::PendingCurrent
    } else if has_registered {
        ResultStatus::PendingRegistered
    } else {
        ResultStatus::Done
    }
}

fn input_size_range(expected: Decimal, operator: Operator, at_most: bool, maximum: usize) -> Vec<usize> {
    let expected: usize = std::convert::TryInto::try_into(expected).unwrap_or(0);

    match operator {
        Operator::EqualTo => {
            if maximum < expected {
                vec![maximum]
            } else {
                vec![expected]
            }
        }
        Operator::GreaterThanOrEqualTo if at_most => {
            if maximum < expected {
                vec![maximum]
            } else {
                vec![expected]
            }
        }
        Operator::NotEqualTo => (0..=maximum).filter(|&n| n != expected).collect(),
        Operator::GreaterThanOrEqualTo => {
            if maximum < expected {
                vec![maximum]
            } else {
                (expected..=maximum).collect()
            }
        }
        Operator::GreaterThan => {
            if maximum < expected {
                vec![maximum]
            } else {
                (expected + 1..=maximum.max(expected + 1)).collect()
            }
        }
        Operator::LessThan => (0..expected).collect(),
        Operator::LessThanOrEqualTo => (0..=expected).collect(),
        Operator::In | Operator::NotIn => (0..=maximum).collect(),
    }
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ConditionalAssertion {
    pub path: RulePath,
    pub condition: PredicateExpression,
    pub when_true: Box<AnyAssertion>,
    pub when_false: Option<Box<AnyAssertion>>,
}

impl ConditionalAssertion {
    pub fn audit_and_resolve(&self, input: AssertionInput<'_>, ctx: &RequirementContext) -> ConditionalAssertion {
        match self.condition.result() {
            Some(true) => ConditionalAssertion {
                when_true: Box::new(self.when_true.audit_and_resolve(input, ctx)),
                ..self.clone()
            },
            Some(false) => match &self.when_false {
                Some(when_false) => ConditionalAssertion {
                    when_false: Some(Box::new(when_false.audit_and_resolve(input, ctx))),
                    ..self.clone()
                },
                None => self.clone(),
            },
            None => self.clone(),
        }
    }

    pub fn status(&self) -> ResultStatus {
        match self.condition.result() {
            Some(true) => self.when_true.status(),
            Some(false) => self
                .when_false
                .as_ref()
                .map(|a| a.status())
                .unwrap_or(ResultStatus::Empty),
            None => ResultStatus::Empty,
        }
    }

    pub fn rank(&self) -> Rank {
        match self.condition.result() {
            Some(true) => self.when_true.rank(),
            Some(false) => self.when_false.as_ref().map(|a| a.rank()).unwrap_or(empty_rank()),
            None => empty_rank(),
        }
    }

    pub fn max_expected(&self) -> Decimal {
        match &self.when_false {
            Some(when_false) => std::cmp::max(self.when_true.max_expected(), when_false.max_expected()),
            None => self.when_true.max_expected(),
        }
    }

    pub fn input_size_range(&self, maximum: usize) -> Vec<usize> {
        match self.condition.result() {
            Some(false) => self
                .when_false
                .as_ref()
                .map(|a| a.input_size_range(maximum))
                .unwrap_or_else(|| self.when_true.input_size_range(maximum)),
            _ => self.when_true.input_size_range(maximum),
        }
    }
}

/// `Union[Assertion, ConditionalAssertion]` in the source this was distilled
/// from — an explicit sum type here rather than runtime `isinstance` checks.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum AnyAssertion {
    Simple(Assertion),
    Conditional(ConditionalAssertion),
}

pub type AssertionOutcome = AnyAssertion;

impl AnyAssertion {
    pub fn audit_and_resolve(&self, input: AssertionInput<'_>, ctx: &RequirementContext) -> AnyAssertion {
        match self {
            AnyAssertion::Simple(a) => AnyAssertion::Simple(a.audit_and_resolve(input, ctx)),
            AnyAssertion::Conditional(c) => AnyAssertion::Conditional(c.audit_and_resolve(input, ctx)),
        }
    }

    pub fn status(&self) -> ResultStatus {
        match self {
            AnyAssertion::Simple(a) => a.state,
            AnyAssertion::Conditional(c) => c.status(),
        }
    }

    pub fn rank(&self) -> Rank {
        match self {
            AnyAssertion::Simple(a) => a.rank(),
            AnyAssertion::Conditional(c) => c.rank(),
        }
    }

    pub fn max_expected(&self) -> Decimal {
        match self {
            AnyAssertion::Simple(a) => a.expected,
            AnyAssertion::Conditional(c) => c.max_expected(),
        }
    }

    pub fn input_size_range(&self, maximum: usize) -> Vec<usize> {
        match self {
            AnyAssertion::Simple(a) => a.input_size_range(maximum),
            AnyAssertion::Conditional(c) => c.input_size_range(maximum),
        }
    }

    pub fn path(&self) -> &RulePath {
        match self {
            AnyAssertion::Simple(a) => &a.path,
            AnyAssertion::Conditional(c) => &c.path,
        }
    }
}
