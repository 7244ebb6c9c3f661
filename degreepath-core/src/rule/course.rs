//! The leaf rule: "the student took this specific course" (§4.1).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::clause::{Clause, Operator};
use crate::context::RequirementContext;
use crate::error::DegreepathError;
use crate::result::{done_rank, empty_rank, CourseRuleResult, ResultStatus, RuleResult};
use crate::rule::RulePath;
use crate::value::{ClauseValue, CourseInstance, CourseType};

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CourseRule {
    pub path: RulePath,
    /// "SUBJ 101"-style shorthand, or the transfer-credit course name when
    /// `course_type` names a non-regular institution.
    pub course: String,
    #[serde(default)]
    pub course_type: Option<CourseType>,
    #[serde(default)]
    pub allow_claimed: bool,
    #[serde(default)]
    pub grade: Option<Decimal>,
}

fn single_course_status(course: &CourseInstance) -> ResultStatus {
    if !course.is_in_progress {
        ResultStatus::Done
    } else if course.is_in_progress_in_future {
        ResultStatus::PendingRegistered
    } else if course.is_in_progress_this_term || course.is_incomplete {
        ResultStatus::PendingCurrent
    } else {
        ResultStatus::Done
    }
}

fn empty_result(rule: &CourseRule) -> RuleResult {
    RuleResult::Course(CourseRuleResult {
        path: rule.path.clone(),
        status: ResultStatus::Empty,
        rank: empty_rank(),
        course: rule.course.clone(),
        claim: None,
    })
}

pub fn audit(rule: &CourseRule, ctx: &mut RequirementContext) -> Result<RuleResult, DegreepathError> {
    if ctx.get_waive_exception(&rule.path) {
        return Ok(RuleResult::Course(CourseRuleResult {
            path: rule.path.clone(),
            status: ResultStatus::Waived,
            rank: done_rank(),
            course: rule.course.clone(),
            claim: None,
        }));
    }

    let forced = ctx.forced_course_by_clbid(&rule.path)?.cloned();

    let candidate = match forced {
        Some(course) => Some(course),
        None => {
            let matches: Vec<CourseInstance> = match rule.course_type {
                Some(course_type) if course_type != CourseType::Regular => ctx
                    .find_other_courses(&rule.course, course_type)
                    .into_iter()
                    .cloned()
                    .collect(),
                _ => ctx.find_course(&rule.course).into_iter().cloned().collect(),
            };

            matches
                .into_iter()
                .find(|c| rule.grade.map_or(true, |min| c.grade_points >= min))
        }
    };

    let candidate = match candidate {
        Some(c) => c,
        None => return Ok(empty_result(rule)),
    };

    let clause = Clause::single("course", Operator::EqualTo, ClauseValue::Str(candidate.course.clone()));
    let attempt = ctx.make_claim(&candidate, &rule.path, clause, rule.allow_claimed);

    if !attempt.ok() {
        return Ok(RuleResult::Course(CourseRuleResult {
            path: rule.path.clone(),
            status: ResultStatus::NeedsMoreItems,
            rank: empty_rank(),
            course: rule.course.clone(),
            claim: None,
        }));
    }

    let status = single_course_status(&candidate);
    Ok(RuleResult::Course(CourseRuleResult {
        path: rule.path.clone(),
        status,
        rank: if status.is_passing() { done_rank() } else { empty_rank() },
        course: rule.course.clone(),
        claim: Some(attempt.claim),
    }))
}
