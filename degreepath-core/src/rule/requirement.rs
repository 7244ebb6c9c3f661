//! A named, possibly-waived wrapper around a single child rule. Naming
//! requirements is what lets a `reference` rule elsewhere in the tree point
//! back at one without duplicating it (§4.1).

use serde::{Deserialize, Serialize};

use crate::context::RequirementContext;
use crate::error::DegreepathError;
use crate::result::{done_rank, empty_rank, RequirementRuleResult, ResultStatus, RuleResult};
use crate::rule::{Rule, RulePath};
use crate::solver::AuditDeadline;

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct RequirementRule {
    pub path: RulePath,
    pub name: String,
    pub result: Box<Rule>,
    #[serde(default)]
    pub message: Option<String>,
    /// Left for human review — audited without evaluating `result` (§4.3).
    #[serde(default)]
    pub is_audited: bool,
    #[serde(default)]
    pub is_contract: bool,
    #[serde(default)]
    pub in_gpa: bool,
    #[serde(default)]
    pub disjoint: Option<bool>,
}

pub fn audit(
    rule: &RequirementRule,
    ctx: &mut RequirementContext,
    deadline: &mut AuditDeadline,
) -> Result<RuleResult, DegreepathError> {
    if ctx.get_waive_exception(&rule.path) {
        let result = RuleResult::Requirement(RequirementRuleResult {
            path: rule.path.clone(),
            status: ResultStatus::Waived,
            rank: done_rank(),
            name: rule.name.clone(),
            result: None,
        });
        ctx.record_requirement_result(&rule.name, result.status(), result.rank());
        return Ok(result);
    }

    if rule.is_audited {
        let result = RuleResult::Requirement(RequirementRuleResult {
            path: rule.path.clone(),
            status: ResultStatus::PendingApproval,
            rank: empty_rank(),
            name: rule.name.clone(),
            result: None,
        });
        ctx.record_requirement_result(&rule.name, result.status(), result.rank());
        return Ok(result);
    }

    let inner = rule.result.audit(ctx, deadline)?;
    let status = inner.status();
    let rank = inner.rank();

    ctx.record_requirement_result(&rule.name, status, rank);

    Ok(RuleResult::Requirement(RequirementRuleResult {
        path: rule.path.clone(),
        status,
        rank,
        name: rule.name.clone(),
        result: Some(Box::new(inner)),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::CourseRule;

    fn body() -> Box<Rule> {
        Box::new(Rule::Course(CourseRule {
            path: RulePath::root().child("BIO 101"),
            course: "BIO 101".to_string(),
            course_type: None,
            allow_claimed: false,
            grade: None,
        }))
    }

    #[test]
    fn audited_requirement_is_pending_without_evaluating_body() {
        let mut ctx = RequirementContext::empty();
        let rule = RequirementRule {
            path: RulePath::root().child("Major"),
            name: "Major".to_string(),
            result: body(),
            message: None,
            is_audited: true,
            is_contract: false,
            in_gpa: false,
            disjoint: None,
        };

        let mut deadline = AuditDeadline::unbounded();
        let result = audit(&rule, &mut ctx, &mut deadline).unwrap();

        assert_eq!(result.status(), ResultStatus::PendingApproval);
        match result {
            RuleResult::Requirement(r) => assert!(r.result.is_none()),
            _ => panic!("expected a requirement result"),
        }
    }
}
