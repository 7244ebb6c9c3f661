//! Points at a named `requirement` rule already audited elsewhere in the
//! tree, so a `count` rule can list it as a child without re-auditing (and
//! re-claiming) the whole subtree a second time.

use serde::{Deserialize, Serialize};

use crate::context::RequirementContext;
use crate::error::{ContextError, DegreepathError};
use crate::result::{ReferenceRuleResult, RuleResult};
use crate::rule::RulePath;
use crate::solver::AuditDeadline;

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ReferenceRule {
    pub path: RulePath,
    pub requirement_name: String,
}

pub fn audit(
    rule: &ReferenceRule,
    ctx: &mut RequirementContext,
    _deadline: &mut AuditDeadline,
) -> Result<RuleResult, DegreepathError> {
    match ctx.requirement_result(&rule.requirement_name) {
        Some((status, rank)) => Ok(RuleResult::Reference(ReferenceRuleResult {
            path: rule.path.clone(),
            status,
            rank,
            requirement_name: rule.requirement_name.clone(),
        })),
        None => Err(DegreepathError::Context(ContextError::MissingRequirement {
            name: rule.requirement_name.clone(),
        })),
    }
}
