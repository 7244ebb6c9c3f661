//! Matches a set of items (courses, areas, or music performances) against a
//! `where` clause and one or more reducing assertions (§4.2, §4.4). The
//! branching search itself lives in `crate::solver`; this module is the
//! rule's data shape and a thin entry point.

use serde::{Deserialize, Serialize};

use crate::assertion::AnyAssertion;
use crate::clause::Clause;
use crate::context::RequirementContext;
use crate::error::DegreepathError;
use crate::result::RuleResult;
use crate::rule::RulePath;
use crate::solver::{self, AuditDeadline};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum SourceType {
    Courses,
    /// Draws from courses some other rule has already claimed, rather than
    /// the full transcript — used for "of the courses counted elsewhere..."
    /// style queries.
    Claimed,
    Areas,
    MusicPerformances,
    Recitals,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum SourceRepeats {
    /// Every instance of a retaken course counts separately.
    All,
    /// Only the earliest instance of a retaken course counts.
    First,
    /// Only the latest instance of a retaken course counts.
    Last,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Limit {
    pub where_clause: Clause,
    pub at_most: usize,
}

/// An ordered set of caps on how many matched items may satisfy a given
/// sub-clause, applied greedily in declaration order.
#[derive(Clone, Default, PartialEq, Debug, Serialize, Deserialize)]
pub struct LimitSet(pub Vec<Limit>);

impl LimitSet {
    pub fn filter_candidates<T: Clone>(&self, items: Vec<T>, matches: impl Fn(&T, &Clause) -> bool) -> Vec<T> {
        if self.0.is_empty() {
            return items;
        }

        let mut counts = vec![0usize; self.0.len()];
        let mut kept = Vec::with_capacity(items.len());

        for item in items {
            let mut allowed = true;
            for (i, limit) in self.0.iter().enumerate() {
                if matches(&item, &limit.where_clause) && counts[i] >= limit.at_most {
                    allowed = false;
                    break;
                }
            }
            if allowed {
                for (i, limit) in self.0.iter().enumerate() {
                    if matches(&item, &limit.where_clause) {
                        counts[i] += 1;
                    }
                }
                kept.push(item);
            }
        }

        kept
    }
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct QueryRule {
    pub path: RulePath,
    pub source_type: SourceType,
    #[serde(default = "default_source_repeats")]
    pub source_repeats: SourceRepeats,
    #[serde(default)]
    pub where_clause: Option<Clause>,
    #[serde(default)]
    pub limit: LimitSet,
    #[serde(default)]
    pub allow_claimed: bool,
    /// If false, skip claim arbitration entirely but still run assertions
    /// against the matched set (§4.3) — distinct from `allow_claimed`, which
    /// only widens what an attempted claim may admit.
    #[serde(default = "default_attempt_claims")]
    pub attempt_claims: bool,
    pub assertions: Vec<AnyAssertion>,
}

fn default_source_repeats() -> SourceRepeats {
    SourceRepeats::All
}

fn default_attempt_claims() -> bool {
    true
}

impl QueryRule {
    /// The value recorded in the claim ledger for every item this query
    /// matches: the query's own `where` clause, or "matches anything" when
    /// there is none. This is what a `multicountable` policy's clausesets
    /// compare against (§4.5).
    pub fn claiming_clause(&self) -> Clause {
        self.where_clause.clone().unwrap_or(Clause::And { children: Vec::new() })
    }
}

pub fn audit(
    rule: &QueryRule,
    ctx: &mut RequirementContext,
    deadline: &mut AuditDeadline,
) -> Result<RuleResult, DegreepathError> {
    solver::audit_query(rule, ctx, deadline)
}
