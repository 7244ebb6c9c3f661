//! The branching search behind `query` and `count` rules (§4.4). Candidate
//! subsets are enumerated lazily via `itertools::combinations` — never
//! materialized as a full powerset — and bounded by an `AuditDeadline` so a
//! pathological specification can't run forever.

use std::collections::HashSet;

use itertools::Itertools;
use rust_decimal::Decimal;

use crate::assertion::{AnyAssertion, AssertionInput, ConditionalAssertion};
use crate::context::RequirementContext;
use crate::error::DegreepathError;
use crate::result::{done_rank, empty_rank, CountRuleResult, QueryRuleResult, Rank, ResultStatus, RuleResult};
use crate::rule::count::CountRule;
use crate::rule::query::{QueryRule, SourceRepeats, SourceType};
use crate::value::{AreaPointer, Clbid, CourseInstance, Crsid, MusicPerformanceKind};

/// Bounds how much branching work a single audit may do. Exhausting the
/// budget mid-search yields a best-effort (never a falsely-passing) result
/// rather than blocking forever.
#[derive(Clone, Copy, Debug)]
pub struct AuditDeadline {
    max_iterations: usize,
    iterations: usize,
}

impl AuditDeadline {
    pub fn new(max_iterations: usize) -> Self {
        AuditDeadline {
            max_iterations,
            iterations: 0,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    /// Consume one unit of budget; `false` once exhausted.
    pub fn tick(&mut self) -> bool {
        self.iterations += 1;
        self.iterations <= self.max_iterations
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn is_exhausted(&self) -> bool {
        self.iterations >= self.max_iterations
    }
}

fn aggregate_status(statuses: &[ResultStatus]) -> ResultStatus {
    if statuses.is_empty() {
        return ResultStatus::Done;
    }
    if statuses.iter().any(|s| *s == ResultStatus::FailedInvariant) {
        return ResultStatus::FailedInvariant;
    }
    if statuses.iter().all(|s| matches!(s, ResultStatus::Done | ResultStatus::Waived)) {
        return ResultStatus::Done;
    }
    if statuses.iter().any(|s| !s.is_passing()) {
        return ResultStatus::NeedsMoreItems;
    }
    if statuses.iter().any(|s| *s == ResultStatus::PendingRegistered) {
        return ResultStatus::PendingRegistered;
    }
    if statuses.iter().any(|s| *s == ResultStatus::PendingCurrent) {
        return ResultStatus::PendingCurrent;
    }
    ResultStatus::PendingApproval
}

fn aggregate_rank(assertions: &[AnyAssertion]) -> Rank {
    if assertions.is_empty() {
        return done_rank();
    }
    let sum_num: Decimal = assertions.iter().map(|a| a.rank().0).sum();
    let sum_den: Decimal = assertions.iter().map(|a| a.rank().1).sum();
    if sum_den == Decimal::ZERO {
        done_rank()
    } else {
        (sum_num, sum_den)
    }
}

/// Resolve any conditional assertion's predicate against the context, then
/// reduce and compare each assertion against `input`.
fn resolve_assertions(
    assertions: &[AnyAssertion],
    input: AssertionInput<'_>,
    ctx: &RequirementContext,
) -> Vec<AnyAssertion> {
    assertions
        .iter()
        .map(|assertion| {
            let with_condition_resolved = match assertion {
                AnyAssertion::Conditional(c) => AnyAssertion::Conditional(ConditionalAssertion {
                    condition: c.condition.evaluate(ctx),
                    ..c.clone()
                }),
                other => other.clone(),
            };
            with_condition_resolved.audit_and_resolve(input, ctx)
        })
        .collect()
}

fn dedup_by_source_repeats(pool: Vec<CourseInstance>, mode: SourceRepeats) -> Vec<CourseInstance> {
    if mode == SourceRepeats::All {
        return pool;
    }

    let mut best: std::collections::HashMap<Crsid, CourseInstance> = std::collections::HashMap::new();
    for course in pool {
        match best.get(&course.crsid) {
            None => {
                best.insert(course.crsid.clone(), course);
            }
            Some(existing) => {
                let challenger_is_better = match mode {
                    SourceRepeats::First => (course.year, course.term) < (existing.year, existing.term),
                    SourceRepeats::Last => (course.year, course.term) > (existing.year, existing.term),
                    SourceRepeats::All => unreachable!(),
                };
                if challenger_is_better {
                    best.insert(course.crsid.clone(), course);
                }
            }
        }
    }

    let mut result: Vec<CourseInstance> = best.into_values().collect();
    result.sort_by(|a, b| a.clbid.cmp(&b.clbid));
    result
}

fn waived_query_result(rule: &QueryRule) -> RuleResult {
    RuleResult::Query(QueryRuleResult {
        path: rule.path.clone(),
        status: ResultStatus::Waived,
        rank: done_rank(),
        claims: Vec::new(),
        assertions: rule.assertions.clone(),
    })
}

pub fn audit_query(
    rule: &QueryRule,
    ctx: &mut RequirementContext,
    deadline: &mut AuditDeadline,
) -> Result<RuleResult, DegreepathError> {
    if ctx.get_waive_exception(&rule.path) {
        return Ok(waived_query_result(rule));
    }

    match rule.source_type {
        SourceType::Courses => audit_query_courses(rule, ctx, deadline, false),
        SourceType::Claimed => audit_query_courses(rule, ctx, deadline, true),
        SourceType::Areas => audit_query_areas(rule, ctx),
        SourceType::MusicPerformances => audit_query_music(rule, ctx, MusicPerformanceKind::Performance),
        SourceType::Recitals => audit_query_music(rule, ctx, MusicPerformanceKind::Recital),
    }
}

fn build_course_pool(rule: &QueryRule, ctx: &RequirementContext, claimed_only: bool) -> Vec<CourseInstance> {
    let mut pool: Vec<CourseInstance> = ctx.find_all_courses().to_vec();

    if claimed_only {
        let claimed: HashSet<Clbid> = ctx.claims.claimed_clbids();
        pool.retain(|c| claimed.contains(&c.clbid));
    }

    if let Some(clause) = &rule.where_clause {
        pool.retain(|c| clause.apply(c));
    }

    pool = dedup_by_source_repeats(pool, rule.source_repeats);
    pool = rule.limit.filter_candidates(pool, |c, clause| clause.apply(c));

    let mut seen: HashSet<Clbid> = pool.iter().map(|c| c.clbid.clone()).collect();
    for clbid in ctx.get_insert_exceptions(&rule.path) {
        if seen.contains(&clbid) {
            continue;
        }
        if let Some(course) = ctx.find_course_by_clbid(&clbid) {
            pool.push(course.clone());
            seen.insert(clbid);
        }
    }

    pool.sort_by(|a, b| a.clbid.cmp(&b.clbid));
    pool
}

fn candidate_sizes(assertions: &[AnyAssertion], max: usize) -> Vec<usize> {
    if assertions.is_empty() {
        return vec![max];
    }
    let mut sizes: Vec<usize> = assertions.iter().flat_map(|a| a.input_size_range(max)).collect();
    sizes.retain(|&n| n <= max);
    sizes.sort_unstable();
    sizes.dedup();
    sizes
}

fn fallback_query_result(rule: &QueryRule, ctx: &RequirementContext, pool: &[CourseInstance]) -> RuleResult {
    let resolved = resolve_assertions(&rule.assertions, AssertionInput::Courses(pool), ctx);
    let statuses: Vec<ResultStatus> = resolved.iter().map(|a| a.status()).collect();
    let mut status = if resolved.is_empty() {
        ResultStatus::Empty
    } else {
        aggregate_status(&statuses)
    };
    // No claims were actually committed in the fallback path, so a
    // seemingly-passing reduction over the raw pool can never be reported
    // as Done — that would claim success without the claims to back it.
    if status.is_passing() {
        status = ResultStatus::NeedsMoreItems;
    }
    let rank = aggregate_rank(&resolved);
    RuleResult::Query(QueryRuleResult {
        path: rule.path.clone(),
        status,
        rank,
        claims: Vec::new(),
        assertions: resolved,
    })
}

fn audit_query_courses(
    rule: &QueryRule,
    ctx: &mut RequirementContext,
    deadline: &mut AuditDeadline,
    claimed_only: bool,
) -> Result<RuleResult, DegreepathError> {
    let pool = build_course_pool(rule, ctx, claimed_only);
    let sizes = candidate_sizes(&rule.assertions, pool.len());
    let claiming_clause = rule.claiming_clause();

    for size in sizes {
        if size > pool.len() {
            continue;
        }

        for combo in pool.clone().into_iter().combinations(size) {
            if !deadline.tick() {
                return Ok(fallback_query_result(rule, ctx, &pool));
            }

            let snapshot = ctx.claims_snapshot();
            let mut claims = Vec::with_capacity(combo.len());
            let mut ok = true;
            if rule.attempt_claims {
                for course in &combo {
                    let attempt = ctx.make_claim(course, &rule.path, claiming_clause.clone(), rule.allow_claimed);
                    if !attempt.ok() {
                        ok = false;
                        break;
                    }
                    claims.push(attempt.claim);
                }
            }

            if !ok {
                ctx.restore_claims(snapshot);
                continue;
            }

            let resolved = resolve_assertions(&rule.assertions, AssertionInput::Courses(&combo), ctx);
            if resolved.iter().all(|a| a.status().is_passing()) {
                let statuses: Vec<ResultStatus> = resolved.iter().map(|a| a.status()).collect();
                return Ok(RuleResult::Query(QueryRuleResult {
                    path: rule.path.clone(),
                    status: aggregate_status(&statuses),
                    rank: aggregate_rank(&resolved),
                    claims,
                    assertions: resolved,
                }));
            }

            ctx.restore_claims(snapshot);
        }
    }

    Ok(fallback_query_result(rule, ctx, &pool))
}

fn audit_query_areas(rule: &QueryRule, ctx: &mut RequirementContext) -> Result<RuleResult, DegreepathError> {
    let mut pool: Vec<AreaPointer> = ctx.areas.clone();
    if let Some(clause) = &rule.where_clause {
        pool.retain(|a| clause.apply(a));
    }

    let resolved = resolve_assertions(&rule.assertions, AssertionInput::Areas(&pool), ctx);
    let statuses: Vec<ResultStatus> = resolved.iter().map(|a| a.status()).collect();
    let status = if resolved.is_empty() {
        ResultStatus::Done
    } else {
        aggregate_status(&statuses)
    };

    Ok(RuleResult::Query(QueryRuleResult {
        path: rule.path.clone(),
        status,
        rank: aggregate_rank(&resolved),
        claims: Vec::new(),
        assertions: resolved,
    }))
}

fn audit_query_music(
    rule: &QueryRule,
    ctx: &mut RequirementContext,
    kind: MusicPerformanceKind,
) -> Result<RuleResult, DegreepathError> {
    let mut pool: Vec<_> = ctx
        .music_performances
        .iter()
        .filter(|p| p.kind == kind)
        .cloned()
        .collect();

    if let Some(clause) = &rule.where_clause {
        pool.retain(|p| clause.apply(p));
    }

    let resolved = resolve_assertions(&rule.assertions, AssertionInput::Music(&pool), ctx);
    let statuses: Vec<ResultStatus> = resolved.iter().map(|a| a.status()).collect();
    let status = if resolved.is_empty() {
        ResultStatus::Done
    } else {
        aggregate_status(&statuses)
    };

    Ok(RuleResult::Query(QueryRuleResult {
        path: rule.path.clone(),
        status,
        rank: aggregate_rank(&resolved),
        claims: Vec::new(),
        assertions: resolved,
    }))
}

fn collect_claimed_courses(chosen: &[(usize, RuleResult)], ctx: &RequirementContext) -> Vec<CourseInstance> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (_, result) in chosen {
        for claim in result.claims() {
            if seen.insert(claim.clbid.clone()) {
                if let Some(course) = ctx.find_course_by_clbid(&claim.clbid) {
                    out.push(course.clone());
                }
            }
        }
    }
    out
}

pub fn audit_count(
    rule: &CountRule,
    ctx: &mut RequirementContext,
    deadline: &mut AuditDeadline,
) -> Result<RuleResult, DegreepathError> {
    if ctx.get_waive_exception(&rule.path) {
        return Ok(RuleResult::Count(CountRuleResult {
            path: rule.path.clone(),
            status: ResultStatus::Waived,
            rank: done_rank(),
            children: Vec::new(),
            chosen: Vec::new(),
            audit: rule.audit.clone(),
        }));
    }

    let total = rule.children.len();
    let needed = rule.count.min(total);
    let max_size = if rule.at_most { needed } else { total };

    for size in needed..=max_size {
        for combo in (0..total).combinations(size) {
            if !deadline.tick() {
                return fallback_count_result(rule, ctx, deadline);
            }

            let claims_snapshot = ctx.claims_snapshot();
            let preview_base = ctx.clone();

            let mut chosen_results: Vec<(usize, RuleResult)> = Vec::with_capacity(combo.len());
            let mut all_pass = true;
            for &idx in &combo {
                let r = rule.children[idx].audit(ctx, deadline)?;
                if !r.status().is_passing() {
                    all_pass = false;
                }
                chosen_results.push((idx, r));
            }

            let claimed_courses = collect_claimed_courses(&chosen_results, ctx);
            let resolved_audit = resolve_assertions(&rule.audit, AssertionInput::Courses(&claimed_courses), ctx);
            let audit_passes = resolved_audit.iter().all(|a| a.status().is_passing());

            if all_pass && audit_passes {
                let mut children = Vec::with_capacity(total);
                let mut chosen_idx = Vec::with_capacity(combo.len());
                for i in 0..total {
                    if let Some((_, r)) = chosen_results.iter().find(|(idx, _)| *idx == i) {
                        children.push(r.clone());
                        chosen_idx.push(i);
                    } else {
                        let mut preview_ctx = preview_base.clone();
                        let preview = rule.children[i].audit(&mut preview_ctx, deadline)?;
                        children.push(preview);
                    }
                }

                let status = if rule.audit.is_empty() {
                    ResultStatus::Done
                } else {
                    aggregate_status(&resolved_audit.iter().map(|a| a.status()).collect::<Vec<_>>())
                };
                let rank = if rule.audit.is_empty() {
                    done_rank()
                } else {
                    aggregate_rank(&resolved_audit)
                };

                return Ok(RuleResult::Count(CountRuleResult {
                    path: rule.path.clone(),
                    status,
                    rank,
                    children,
                    chosen: chosen_idx,
                    audit: resolved_audit,
                }));
            }

            ctx.restore_claims(claims_snapshot);
        }
    }

    fallback_count_result(rule, ctx, deadline)
}

fn fallback_count_result(
    rule: &CountRule,
    ctx: &mut RequirementContext,
    deadline: &mut AuditDeadline,
) -> Result<RuleResult, DegreepathError> {
    let mut children = Vec::with_capacity(rule.children.len());
    let mut chosen = Vec::new();

    for (i, child) in rule.children.iter().enumerate() {
        let mut preview_ctx = ctx.clone();
        let r = child.audit(&mut preview_ctx, deadline)?;
        if r.status().is_passing() {
            chosen.push(i);
        }
        children.push(r);
    }

    // None of these children's claims were actually committed to `ctx`, so
    // even a numerically-sufficient `chosen` count can't be reported Done.
    let status = ResultStatus::NeedsMoreItems;

    Ok(RuleResult::Count(CountRuleResult {
        path: rule.path.clone(),
        status,
        rank: empty_rank(),
        children,
        chosen,
        audit: rule.audit.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::{Clause, Operator};
    use crate::rule::{CourseRule, Rule, RulePath};
    use crate::value::{Clbid, ClauseValue, CourseType, GradeOption, Term};

    fn course(clbid: &str, name: &str) -> CourseInstance {
        CourseInstance {
            clbid: Clbid::from(clbid),
            crsid: Crsid::from(clbid),
            course: name.to_string(),
            subject: vec![name.split_whitespace().next().unwrap().to_string()],
            grade_points: Decimal::new(40, 1),
            grade_option: GradeOption::Graded,
            credits: Decimal::new(10, 1),
            course_type: CourseType::Regular,
            is_in_progress: false,
            is_in_progress_this_term: false,
            is_in_progress_in_future: false,
            is_incomplete: false,
            is_in_gpa: true,
            attributes: Default::default(),
            gereqs: Default::default(),
            year: 2020,
            term: Term::Fall,
            section: None,
        }
    }

    #[test]
    fn query_claims_minimal_satisfying_subset() {
        let mut ctx = RequirementContext::empty().with_transcript(vec![
            course("c1", "HIST 201"),
            course("c2", "HIST 202"),
            course("c3", "HIST 203"),
        ]);

        let assertion = crate::assertion::Assertion {
            path: RulePath::root(),
            data_type: crate::assertion::DataType::Course,
            where_clause: None,
            key: "count(courses)".to_string(),
            operator: Operator::GreaterThanOrEqualTo,
            expected: Decimal::from(2),
            original: None,
            changes: Vec::new(),
            at_most: false,
            treat_in_progress_as_pass: false,
            overridden: false,
            evaluated: false,
            state: ResultStatus::Empty,
            resolved: None,
            resolved_clbids: Vec::new(),
            inserted_clbids: Vec::new(),
        };

        let rule = QueryRule {
            path: RulePath::root(),
            source_type: SourceType::Courses,
            source_repeats: SourceRepeats::All,
            where_clause: None,
            limit: Default::default(),
            allow_claimed: false,
            attempt_claims: true,
            assertions: vec![AnyAssertion::Simple(assertion)],
        };

        let mut deadline = AuditDeadline::unbounded();
        let result = audit_query(&rule, &mut ctx, &mut deadline).unwrap();
        assert!(result.status().is_passing());
        assert_eq!(result.claims().len(), 2);
    }

    #[test]
    fn count_rule_picks_passing_subset() {
        let mut ctx = RequirementContext::empty().with_transcript(vec![course("c1", "HIST 201")]);

        let present = Rule::Course(CourseRule {
            path: RulePath::root().child("present"),
            course: "HIST 201".to_string(),
            course_type: None,
            allow_claimed: false,
            grade: None,
        });
        let absent = Rule::Course(CourseRule {
            path: RulePath::root().child("absent"),
            course: "HIST 999".to_string(),
            course_type: None,
            allow_claimed: false,
            grade: None,
        });

        let rule = CountRule {
            path: RulePath::root(),
            count: 1,
            children: vec![present, absent],
            audit: Vec::new(),
            at_most: false,
        };

        let mut deadline = AuditDeadline::unbounded();
        let result = audit_count(&rule, &mut ctx, &mut deadline).unwrap();
        assert!(result.status().is_passing());
        match result {
            RuleResult::Count(r) => assert_eq!(r.chosen, vec![0]),
            _ => panic!("expected count result"),
        }
    }

    #[test]
    fn limit_set_caps_matches_per_clause() {
        use crate::rule::query::{Limit, LimitSet};

        let limit = LimitSet(vec![Limit {
            where_clause: Clause::single("course", Operator::EqualTo, ClauseValue::Str("HIST 201".into())),
            at_most: 1,
        }]);

        let items = vec![course("c1", "HIST 201"), course("c2", "HIST 201"), course("c3", "HIST 202")];
        let kept = limit.filter_candidates(items, |c, clause| clause.apply(c));
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn query_without_attempt_claims_skips_arbitration() {
        let mut ctx = RequirementContext::empty().with_transcript(vec![course("c1", "HIST 201")]);

        let assertion = crate::assertion::Assertion {
            path: RulePath::root(),
            data_type: crate::assertion::DataType::Course,
            where_clause: None,
            key: "count(courses)".to_string(),
            operator: Operator::GreaterThanOrEqualTo,
            expected: Decimal::from(1),
            original: None,
            changes: Vec::new(),
            at_most: false,
            treat_in_progress_as_pass: false,
            overridden: false,
            evaluated: false,
            state: ResultStatus::Empty,
            resolved: None,
            resolved_clbids: Vec::new(),
            inserted_clbids: Vec::new(),
        };

        let rule = QueryRule {
            path: RulePath::root(),
            source_type: SourceType::Courses,
            source_repeats: SourceRepeats::All,
            where_clause: None,
            limit: Default::default(),
            allow_claimed: false,
            attempt_claims: false,
            assertions: vec![AnyAssertion::Simple(assertion)],
        };

        let mut deadline = AuditDeadline::unbounded();
        let result = audit_query(&rule, &mut ctx, &mut deadline).unwrap();
        assert!(result.status().is_passing());
        assert!(result.claims().is_empty());
        assert!(ctx.claims.claimed_clbids().is_empty());
    }

    #[test]
    fn count_rule_at_most_rejects_larger_passing_subsets() {
        let mut ctx = RequirementContext::empty().with_transcript(vec![course("c1", "HIST 201"), course("c2", "HIST 202")]);

        let first = Rule::Course(CourseRule {
            path: RulePath::root().child("first"),
            course: "HIST 201".to_string(),
            course_type: None,
            allow_claimed: false,
            grade: None,
        });
        let second = Rule::Course(CourseRule {
            path: RulePath::root().child("second"),
            course: "HIST 202".to_string(),
            course_type: None,
            allow_claimed: false,
            grade: None,
        });

        let audit_assertion = crate::assertion::Assertion {
            path: RulePath::root(),
            data_type: crate::assertion::DataType::Course,
            where_clause: None,
            key: "sum(credits)".to_string(),
            operator: Operator::GreaterThanOrEqualTo,
            expected: Decimal::from(2),
            original: None,
            changes: Vec::new(),
            at_most: false,
            treat_in_progress_as_pass: false,
            overridden: false,
            evaluated: false,
            state: ResultStatus::Empty,
            resolved: None,
            resolved_clbids: Vec::new(),
            inserted_clbids: Vec::new(),
        };

        let rule = CountRule {
            path: RulePath::root(),
            count: 1,
            children: vec![first, second],
            audit: vec![AnyAssertion::Simple(audit_assertion)],
            at_most: true,
        };

        let mut deadline = AuditDeadline::unbounded();
        let result = audit_count(&rule, &mut ctx, &mut deadline).unwrap();
        assert!(
            !result.status().is_passing(),
            "at_most should keep the search at exactly `count` children, where no single course reaches 2 credits"
        );
    }
}
