//! The claim ledger and arbitration procedure (§4.5): the only mutable
//! shared structure during an audit. The rule tree is immutable; this is
//! where "each course is used at most once, unless a multi-countable
//! exception applies" is enforced.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::clause::Clause;
use crate::rule::RulePath;
use crate::value::{Clbid, Crsid, CourseInstance};

#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Claim {
    pub crsid: Crsid,
    pub clbid: Clbid,
    pub claimant_path: RulePath,
    pub value: Clause,
}

#[derive(Clone, Debug)]
pub struct ClaimAttempt {
    pub claim: Claim,
    pub conflict_with: HashSet<Claim>,
    pub did_fail: bool,
}

impl ClaimAttempt {
    pub fn ok(&self) -> bool {
        !self.did_fail
    }
}

/// An ordered list of clausesets describing the ways in which a single
/// course may satisfy multiple rules simultaneously. Order is load order and
/// is observable: arbitration tries clausesets in this order (§4.5
/// "Determinism").
#[derive(Clone, Default, Debug, Serialize, Deserialize)]
pub struct MulticountablePolicy(pub Vec<Vec<Clause>>);

/// `clbid -> set of admitted claims`. The only mutable shared structure
/// during an audit (§5 "Shared-resource policy").
#[derive(Clone, Default, Debug)]
pub struct ClaimLedger {
    claims: HashMap<Clbid, HashSet<Claim>>,
}

impl ClaimLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claims_for(&self, clbid: &Clbid) -> HashSet<Claim> {
        self.claims.get(clbid).cloned().unwrap_or_default()
    }

    pub fn claimed_clbids(&self) -> HashSet<Clbid> {
        self.claims.keys().cloned().collect()
    }

    pub fn set_claims(&mut self, claims: HashMap<Clbid, HashSet<Claim>>) {
        self.claims = claims;
    }

    pub fn reset(&mut self) {
        self.claims.clear();
    }

    pub fn snapshot(&self) -> HashMap<Clbid, HashSet<Claim>> {
        self.claims.clone()
    }

    pub fn restore(&mut self, snapshot: HashMap<Clbid, HashSet<Claim>>) {
        self.claims = snapshot;
    }

    fn record(&mut self, claim: Claim) {
        self.claims.entry(claim.clbid.clone()).or_default().insert(claim);
    }

    /// The decision procedure from §4.5. `allow_claimed` bypasses arbitration
    /// entirely and never mutates the ledger (the claim "doesn't count").
    pub fn make_claim(
        &mut self,
        course: &CourseInstance,
        path: &RulePath,
        clause: Clause,
        allow_claimed: bool,
        multicountable: &MulticountablePolicy,
    ) -> ClaimAttempt {
        let claim = Claim {
            crsid: course.crsid.clone(),
            clbid: course.clbid.clone(),
            claimant_path: path.clone(),
            value: clause.clone(),
        };

        if allow_claimed {
            if tracing::enabled!(tracing::Level::DEBUG) {
                tracing::debug!(clbid = %course.clbid, "claim allowed unconditionally (allow_claimed)");
            }
            return ClaimAttempt {
                claim,
                conflict_with: HashSet::new(),
                did_fail: false,
            };
        }

        let prior_claims = self.claims_for(&course.clbid);

        if prior_claims.is_empty() {
            if tracing::enabled!(tracing::Level::DEBUG) {
                tracing::debug!(clbid = %course.clbid, "no prior claims, admitting");
            }
            self.record(claim.clone());
            return ClaimAttempt {
                claim,
                conflict_with: HashSet::new(),
                did_fail: false,
            };
        }

        let applicable_clausesets: Vec<&Vec<Clause>> = multicountable
            .0
            .iter()
            .filter(|clauseset| clauseset.iter().any(|c| c.is_subset(&clause)))
            .collect();

        if applicable_clausesets.is_empty() {
            if tracing::enabled!(tracing::Level::DEBUG) {
                tracing::debug!(clbid = %course.clbid, "no applicable multicountable clauseset; conflicts with prior claims");
            }
            return ClaimAttempt {
                claim,
                conflict_with: prior_claims,
                did_fail: true,
            };
        }

        let mut clauses_to_cover: Vec<Clause> = prior_claims.iter().map(|c| c.value.clone()).collect();
        clauses_to_cover.push(clause.clone());

        let chosen = applicable_clausesets.into_iter().find(|clauseset| {
            clauses_to_cover
                .iter()
                .all(|to_cover| clauseset.iter().any(|c| c.is_subset(to_cover)))
        });

        let chosen = match chosen {
            Some(c) => c,
            None => {
                if tracing::enabled!(tracing::Level::DEBUG) {
                    tracing::debug!(clbid = %course.clbid, "no multicountable clauseset covers all prior claims plus the new one");
                }
                return ClaimAttempt {
                    claim,
                    conflict_with: prior_claims,
                    did_fail: true,
                };
            }
        };

        let prior_clauses: Vec<&Clause> = prior_claims.iter().map(|c| &c.value).collect();
        let available: Vec<&Clause> = chosen
            .iter()
            .filter(|c| !prior_clauses.iter().any(|p| c.is_subset(p)))
            .collect();

        if available.is_empty() {
            if tracing::enabled!(tracing::Level::DEBUG) {
                tracing::debug!(clbid = %course.clbid, "multicountable clauseset exhausted (all slots already claimed)");
            }
            return ClaimAttempt {
                claim,
                conflict_with: prior_claims,
                did_fail: true,
            };
        }

        self.record(claim.clone());
        ClaimAttempt {
            claim,
            conflict_with: HashSet::new(),
            did_fail: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::Operator;
    use crate::value::{ClauseValue, CourseType, GradeOption, Term};
    use rust_decimal::Decimal;

    fn course(clbid: &str, attrs: &[&str]) -> CourseInstance {
        CourseInstance {
            clbid: Clbid::from(clbid),
            crsid: Crsid::from(clbid),
            course: "HIST 301".to_string(),
            subject: vec!["HIST".to_string()],
            grade_points: Decimal::new(40, 1),
            grade_option: GradeOption::Graded,
            credits: Decimal::new(10, 1),
            course_type: CourseType::Regular,
            is_in_progress: false,
            is_in_progress_this_term: false,
            is_in_progress_in_future: false,
            is_incomplete: false,
            is_in_gpa: true,
            attributes: attrs.iter().map(|s| s.to_string()).collect(),
            gereqs: Default::default(),
            year: 2020,
            term: Term::Fall,
            section: None,
        }
    }

    fn attr_eq(name: &str) -> Clause {
        Clause::single("attributes", Operator::EqualTo, ClauseValue::Str(name.into()))
    }

    #[test]
    fn first_claim_always_succeeds() {
        let mut ledger = ClaimLedger::new();
        let path = RulePath::root();
        let attempt = ledger.make_claim(&course("c1", &[]), &path, attr_eq("elective"), false, &MulticountablePolicy::default());
        assert!(attempt.ok());
    }

    #[test]
    fn second_claim_without_multicountable_conflicts() {
        let mut ledger = ClaimLedger::new();
        let path = RulePath::root();
        let c = course("c1", &["elective"]);
        assert!(ledger.make_claim(&c, &path, attr_eq("elective"), false, &MulticountablePolicy::default()).ok());
        let second = ledger.make_claim(&c, &path, attr_eq("elective"), false, &MulticountablePolicy::default());
        assert!(!second.ok());
        assert_eq!(second.conflict_with.len(), 1);
    }

    #[test]
    fn multicountable_clauseset_admits_second_claim() {
        let mut ledger = ClaimLedger::new();
        let path = RulePath::root();
        let c = course("c1", &["elective", "post1800"]);
        let policy = MulticountablePolicy(vec![vec![attr_eq("elective"), attr_eq("post1800")]]);

        let first = ledger.make_claim(&c, &path, attr_eq("elective"), false, &policy);
        assert!(first.ok());
        let second = ledger.make_claim(&c, &path, attr_eq("post1800"), false, &policy);
        assert!(second.ok());
    }

    #[test]
    fn third_claim_against_two_slot_clauseset_fails() {
        let mut ledger = ClaimLedger::new();
        let path = RulePath::root();
        let c = course("c1", &["elective", "post1800"]);
        let policy = MulticountablePolicy(vec![vec![attr_eq("elective"), attr_eq("post1800")]]);

        assert!(ledger.make_claim(&c, &path, attr_eq("elective"), false, &policy).ok());
        assert!(ledger.make_claim(&c, &path, attr_eq("post1800"), false, &policy).ok());
        let third = ledger.make_claim(&c, &path, attr_eq("elective"), false, &policy);
        assert!(!third.ok());
    }

    #[test]
    fn scenario_d_disjoint_clausesets_conflict() {
        // Scenario D: two clausesets share "elective" but the second claim's
        // clause (war) isn't covered by the first clauseset's remaining slot
        // (post1800), so the second query's claim fails.
        let mut ledger = ClaimLedger::new();
        let path = RulePath::root();
        let c = course("c1", &["elective", "post1800", "war"]);
        let policy = MulticountablePolicy(vec![
            vec![attr_eq("elective"), attr_eq("post1800")],
            vec![attr_eq("elective"), attr_eq("war")],
        ]);

        let first = ledger.make_claim(&c, &path, attr_eq("post1800"), false, &policy);
        assert!(first.ok());

        let second = ledger.make_claim(&c, &path, attr_eq("war"), false, &policy);
        assert!(!second.ok(), "post1800 isn't covered by the war clauseset");
    }

    #[test]
    fn allow_claimed_never_mutates_ledger() {
        let mut ledger = ClaimLedger::new();
        let path = RulePath::root();
        let c = course("c1", &[]);
        let attempt = ledger.make_claim(&c, &path, attr_eq("elective"), true, &MulticountablePolicy::default());
        assert!(attempt.ok());
        assert!(ledger.claims_for(&c.clbid).is_empty());
    }
}
