//! End-to-end scenarios (spec.md §8): a handful of representative audits run
//! through the public API rather than exercising a single module in
//! isolation.

use std::collections::HashMap;

use rust_decimal::Decimal;

use degreepath_core::assertion::{Assertion, AssertionOutcome, AnyAssertion, ConditionalAssertion, DataType};
use degreepath_core::claim::MulticountablePolicy;
use degreepath_core::clause::{Clause, Operator};
use degreepath_core::context::RequirementContext;
use degreepath_core::exception::RuleException;
use degreepath_core::predicate::{PredicateExpression, PredicateFunction};
use degreepath_core::result::{empty_rank, ResultStatus};
use degreepath_core::rule::query::{LimitSet, QueryRule, SourceRepeats, SourceType};
use degreepath_core::rule::{CourseRule, Rule, RulePath};
use degreepath_core::value::{Clbid, ClauseValue, Crsid, CourseInstance, CourseType, GradeOption, Term};
use degreepath_core::AuditDeadline;

fn course(clbid: &str, name: &str, subject: &str, credits: i64, in_progress: bool) -> CourseInstance {
    CourseInstance {
        clbid: Clbid::from(clbid),
        crsid: Crsid::from(clbid),
        course: name.to_string(),
        subject: vec![subject.to_string()],
        grade_points: Decimal::new(40, 1),
        grade_option: GradeOption::Graded,
        credits: Decimal::new(credits, 0),
        course_type: CourseType::Regular,
        is_in_progress: in_progress,
        is_in_progress_this_term: in_progress,
        is_in_progress_in_future: false,
        is_incomplete: false,
        is_in_gpa: !in_progress,
        attributes: Default::default(),
        gereqs: Default::default(),
        year: 2020,
        term: Term::Fall,
        section: None,
    }
}

fn course_with_attrs(clbid: &str, attrs: &[&str]) -> CourseInstance {
    CourseInstance {
        attributes: attrs.iter().map(|s| s.to_string()).collect(),
        ..course(clbid, "HIST 301", "HIST", 3, false)
    }
}

#[test]
fn scenario_a_single_course_rule_matches() {
    let mut ctx = RequirementContext::empty().with_transcript(vec![course("c1", "BIO 101", "BIO", 4, false)]);
    let rule = CourseRule {
        path: RulePath::root(),
        course: "BIO 101".to_string(),
        course_type: None,
        allow_claimed: false,
        grade: None,
    };

    let result = degreepath_core::rule::course::audit(&rule, &mut ctx).unwrap();

    assert_eq!(result.status(), ResultStatus::Done);
    let claims = result.claims();
    assert_eq!(claims.len(), 1);
    assert_eq!(claims[0].clbid, Clbid::from("c1"));
}

#[test]
fn scenario_b_course_rule_no_match() {
    let mut ctx = RequirementContext::empty();
    let rule = CourseRule {
        path: RulePath::root(),
        course: "BIO 101".to_string(),
        course_type: None,
        allow_claimed: false,
        grade: None,
    };

    let result = degreepath_core::rule::course::audit(&rule, &mut ctx).unwrap();

    assert_eq!(result.status(), ResultStatus::Empty);
    assert!(result.claims().is_empty());
    assert_eq!(result.rank(), empty_rank());
}

#[test]
fn scenario_c_query_with_credit_assertion() {
    let mut ctx = RequirementContext::empty().with_transcript(vec![
        course("c1", "MATH 101", "MATH", 3, false),
        course("c2", "MATH 201", "MATH", 3, false),
        course("c3", "MATH 301", "MATH", 2, false),
    ]);

    let assertion = Assertion {
        path: RulePath::root(),
        data_type: DataType::Course,
        where_clause: None,
        key: "sum(credits)".to_string(),
        operator: Operator::GreaterThanOrEqualTo,
        expected: Decimal::from(8),
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
        where_clause: Some(Clause::single("subject", Operator::EqualTo, ClauseValue::Str("MATH".into()))),
        limit: LimitSet::default(),
        allow_claimed: false,
        attempt_claims: true,
        assertions: vec![AnyAssertion::Simple(assertion)],
    };

    let mut deadline = AuditDeadline::unbounded();
    let result = Rule::Query(rule).audit(&mut ctx, &mut deadline).unwrap();

    assert_eq!(result.status(), ResultStatus::Done);
    assert_eq!(result.rank(), (Decimal::ONE, Decimal::ONE));
    assert_eq!(result.claims().len(), 3);
}

#[test]
fn scenario_d_multicountable_shared_attribute_conflict() {
    // Two clausesets share "elective" but neither covers the other's second
    // slot, so a course already claimed under clauseset #1's "post1800" slot
    // cannot also satisfy clauseset #2's "war" slot.
    let policy = MulticountablePolicy(vec![
        vec![
            Clause::single("attributes", Operator::EqualTo, ClauseValue::Str("elective".into())),
            Clause::single("attributes", Operator::EqualTo, ClauseValue::Str("post1800".into())),
        ],
        vec![
            Clause::single("attributes", Operator::EqualTo, ClauseValue::Str("elective".into())),
            Clause::single("attributes", Operator::EqualTo, ClauseValue::Str("war".into())),
        ],
    ]);

    let mut ctx = RequirementContext::empty()
        .with_transcript(vec![course_with_attrs("c1", &["elective", "post1800", "war"])])
        .with_multicountable(policy);

    let c1 = ctx.find_course_by_clbid(&Clbid::from("c1")).unwrap().clone();

    let query_a_path = RulePath::root().child("query-a");
    let first = ctx.make_claim(
        &c1,
        &query_a_path,
        Clause::single("attributes", Operator::EqualTo, ClauseValue::Str("post1800".into())),
        false,
    );
    assert!(first.ok());

    let query_b_path = RulePath::root().child("query-b");
    let second = ctx.make_claim(
        &c1,
        &query_b_path,
        Clause::single("attributes", Operator::EqualTo, ClauseValue::Str("war".into())),
        false,
    );

    assert!(!second.ok(), "clauseset #2 doesn't cover the post1800 claim already on record");
    assert_eq!(second.conflict_with.len(), 1);
}

#[test]
fn scenario_e_waiver_exception() {
    let path = RulePath::root().child("PHIL 400");
    let mut exceptions = HashMap::new();
    exceptions.insert(path.clone(), vec![RuleException::Waive]);

    let mut ctx = RequirementContext::empty().with_exceptions(exceptions);

    let rule = CourseRule {
        path,
        course: "PHIL 400".to_string(),
        course_type: None,
        allow_claimed: false,
        grade: None,
    };

    let result = degreepath_core::rule::course::audit(&rule, &mut ctx).unwrap();

    assert_eq!(result.status(), ResultStatus::Waived);
    assert_eq!(result.rank(), (Decimal::ONE, Decimal::ONE));
}

#[test]
fn scenario_f_conditional_assertion_unmet_branch() {
    let mut ctx = RequirementContext::empty()
        .with_transcript(vec![
            course("c1", "ART 101", "ART", 3, false),
            course("c2", "ART 102", "ART", 3, false),
            course("c3", "ART 103", "ART", 3, false),
        ])
        .with_declared_areas(vec!["130".to_string()]);

    let when_true = Assertion {
        path: RulePath::root(),
        data_type: DataType::Course,
        where_clause: None,
        key: "count(courses)".to_string(),
        operator: Operator::GreaterThanOrEqualTo,
        expected: Decimal::from(4),
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
    let when_false = Assertion {
        expected: Decimal::from(2),
        ..when_true.clone()
    };

    let conditional = ConditionalAssertion {
        path: RulePath::root(),
        condition: PredicateExpression::Atom {
            function: PredicateFunction::HasDeclaredAreaCode,
            argument: "130".to_string(),
            result: None,
        },
        when_true: Box::new(AnyAssertion::Simple(when_true)),
        when_false: Some(Box::new(AnyAssertion::Simple(when_false))),
    };

    let rule = QueryRule {
        path: RulePath::root(),
        source_type: SourceType::Courses,
        source_repeats: SourceRepeats::All,
        where_clause: None,
        limit: LimitSet::default(),
        allow_claimed: false,
        attempt_claims: true,
        assertions: vec![AnyAssertion::Conditional(conditional)],
    };

    let mut deadline = AuditDeadline::unbounded();
    let result = Rule::Query(rule).audit(&mut ctx, &mut deadline).unwrap();

    // The declared area routes evaluation to the `when_true` branch
    // (expected 4), which the 3-course transcript cannot satisfy.
    assert_eq!(result.status(), ResultStatus::NeedsMoreItems);

    let outcomes: Vec<AssertionOutcome> = match &result {
        degreepath_core::RuleResult::Query(q) => q.assertions.clone(),
        _ => panic!("expected a query result"),
    };
    assert_eq!(outcomes.len(), 1);
    match &outcomes[0] {
        AnyAssertion::Conditional(c) => match c.when_true.as_ref() {
            AnyAssertion::Simple(a) => {
                assert_eq!(a.resolved, Some(Decimal::from(3)));
                assert_eq!(a.expected, Decimal::from(4));
            }
            _ => panic!("expected a simple assertion in the true branch"),
        },
        _ => panic!("expected the conditional to survive resolution"),
    }
}
