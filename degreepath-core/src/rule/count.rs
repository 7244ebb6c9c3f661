//! "At least N of these children pass" (§4.4) — the tree's branching node.
//! Search lives in `crate::solver`.

use serde::{Deserialize, Serialize};

use crate::assertion::AnyAssertion;
use crate::context::RequirementContext;
use crate::error::DegreepathError;
use crate::result::RuleResult;
use crate::rule::{Rule, RulePath};
use crate::solver::{self, AuditDeadline};

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CountRule {
    pub path: RulePath,
    /// How many of `children` must independently pass. `count == children.len()`
    /// is "all of"; `count == 1` is "any of".
    pub count: usize,
    pub children: Vec<Rule>,
    /// Assertions checked against the union of claims made by the chosen
    /// children (e.g. "and at least 30 credits total among them").
    #[serde(default)]
    pub audit: Vec<AnyAssertion>,
    /// Strict: exactly `count` children may pass, not more (§4.3).
    #[serde(default)]
    pub at_most: bool,
}

pub fn audit(
    rule: &CountRule,
    ctx: &mut RequirementContext,
    deadline: &mut AuditDeadline,
) -> Result<RuleResult, DegreepathError> {
    solver::audit_count(rule, ctx, deadline)
}
