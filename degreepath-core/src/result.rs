//! The result tree: a mirror of the rule tree with resolution data attached.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::assertion::AssertionOutcome;
use crate::claim::Claim;
use crate::rule::RulePath;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ResultStatus {
    Empty,
    NeedsMoreItems,
    PendingCurrent,
    PendingRegistered,
    PendingApproval,
    Done,
    Waived,
    FailedInvariant,
}

impl ResultStatus {
    pub fn is_passing(self) -> bool {
        matches!(
            self,
            ResultStatus::Done
                | ResultStatus::Waived
                | ResultStatus::PendingCurrent
                | ResultStatus::PendingRegistered
                | ResultStatus::PendingApproval
        )
    }
}

pub type Rank = (Decimal, Decimal);

pub fn done_rank() -> Rank {
    (Decimal::ONE, Decimal::ONE)
}

pub fn empty_rank() -> Rank {
    (Decimal::ZERO, Decimal::ONE)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CourseRuleResult {
    pub path: RulePath,
    pub status: ResultStatus,
    pub rank: Rank,
    pub course: String,
    pub claim: Option<Claim>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryRuleResult {
    pub path: RulePath,
    pub status: ResultStatus,
    pub rank: Rank,
    pub claims: Vec<Claim>,
    pub assertions: Vec<AssertionOutcome>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CountRuleResult {
    pub path: RulePath,
    pub status: ResultStatus,
    pub rank: Rank,
    pub children: Vec<RuleResult>,
    pub chosen: Vec<usize>,
    pub audit: Vec<AssertionOutcome>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequirementRuleResult {
    pub path: RulePath,
    pub status: ResultStatus,
    pub rank: Rank,
    pub name: String,
    pub result: Option<Box<RuleResult>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReferenceRuleResult {
    pub path: RulePath,
    pub status: ResultStatus,
    pub rank: Rank,
    pub requirement_name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum RuleResult {
    Course(CourseRuleResult),
    Query(QueryRuleResult),
    Count(CountRuleResult),
    Requirement(RequirementRuleResult),
    Reference(ReferenceRuleResult),
}

impl RuleResult {
    pub fn path(&self) -> &RulePath {
        match self {
            RuleResult::Course(r) => &r.path,
            RuleResult::Query(r) => &r.path,
            RuleResult::Count(r) => &r.path,
            RuleResult::Requirement(r) => &r.path,
            RuleResult::Reference(r) => &r.path,
        }
    }

    pub fn status(&self) -> ResultStatus {
        match self {
            RuleResult::Course(r) => r.status,
            RuleResult::Query(r) => r.status,
            RuleResult::Count(r) => r.status,
            RuleResult::Requirement(r) => r.status,
            RuleResult::Reference(r) => r.status,
        }
    }

    pub fn rank(&self) -> Rank {
        match self {
            RuleResult::Course(r) => r.rank,
            RuleResult::Query(r) => r.rank,
            RuleResult::Count(r) => r.rank,
            RuleResult::Requirement(r) => r.rank,
            RuleResult::Reference(r) => r.rank,
        }
    }

    /// All claims this result (and its descendants) are responsible for.
    pub fn claims(&self) -> Vec<Claim> {
        match self {
            RuleResult::Course(r) => r.claim.clone().into_iter().collect(),
            RuleResult::Query(r) => r.claims.clone(),
            RuleResult::Count(r) => r.children.iter().flat_map(|c| c.claims()).collect(),
            RuleResult::Requirement(r) => r.result.as_ref().map(|res| res.claims()).unwrap_or_default(),
            RuleResult::Reference(_) => Vec::new(),
        }
    }
}

/// Invariant 5 (§3): `rank == max_rank` implies a passing status.
pub fn check_rank_invariant(rank: Rank, status: ResultStatus) -> bool {
    rank.0 <= rank.1 && (rank.0 != rank.1 || status.is_passing())
}
