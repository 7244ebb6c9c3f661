//! Predicates over a single `Clausable` item, with compound boolean
//! composition and semantic-implication testing (`is_subset`) used by claim
//! arbitration (`crate::claim`).

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::value::{ClauseValue, Clausable};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "$eq")]
    EqualTo,
    #[serde(rename = "$neq")]
    NotEqualTo,
    #[serde(rename = "$lt")]
    LessThan,
    #[serde(rename = "$lte")]
    LessThanOrEqualTo,
    #[serde(rename = "$gt")]
    GreaterThan,
    #[serde(rename = "$gte")]
    GreaterThanOrEqualTo,
    #[serde(rename = "$in")]
    In,
    #[serde(rename = "$nin")]
    NotIn,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::EqualTo => "$eq",
            Operator::NotEqualTo => "$neq",
            Operator::LessThan => "$lt",
            Operator::LessThanOrEqualTo => "$lte",
            Operator::GreaterThan => "$gt",
            Operator::GreaterThanOrEqualTo => "$gte",
            Operator::In => "$in",
            Operator::NotIn => "$nin",
        }
    }

    pub fn is_sequence_operator(self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }
}

impl std::str::FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "$eq" => Ok(Operator::EqualTo),
            "$neq" => Ok(Operator::NotEqualTo),
            "$lt" => Ok(Operator::LessThan),
            "$lte" => Ok(Operator::LessThanOrEqualTo),
            "$gt" => Ok(Operator::GreaterThan),
            "$gte" => Ok(Operator::GreaterThanOrEqualTo),
            "$in" => Ok(Operator::In),
            "$nin" => Ok(Operator::NotIn),
            other => Err(format!("unknown operator {other:?}")),
        }
    }
}

/// Numeric/ordering comparison used both by clause application on scalar
/// attributes and by assertion evaluation.
fn compare(lhs: &ClauseValue, rhs: &ClauseValue) -> Option<Ordering> {
    match (lhs, rhs) {
        (ClauseValue::Decimal(a), ClauseValue::Decimal(b)) => a.partial_cmp(b),
        (ClauseValue::Str(a), ClauseValue::Str(b)) => a.partial_cmp(b),
        (ClauseValue::Bool(a), ClauseValue::Bool(b)) => a.partial_cmp(b),
        (ClauseValue::Grade(a), ClauseValue::Grade(b)) => {
            if a == b {
                Some(Ordering::Equal)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn sequence_of(value: &ClauseValue) -> Option<Vec<ClauseValue>> {
    match value {
        ClauseValue::StrList(items) => Some(items.iter().cloned().map(ClauseValue::Str).collect()),
        ClauseValue::DecimalList(items) => {
            Some(items.iter().cloned().map(ClauseValue::Decimal).collect())
        }
        ClauseValue::StrSet(items) => Some(items.iter().cloned().map(ClauseValue::Str).collect()),
        _ => None,
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Clause {
    Single {
        key: String,
        operator: Operator,
        expected: ClauseValue,
        #[serde(default)]
        at_most: bool,
        #[serde(default)]
        treat_in_progress_as_pass: bool,
    },
    And {
        children: Vec<Clause>,
    },
    Or {
        children: Vec<Clause>,
    },
}

impl Clause {
    pub fn single(key: impl Into<String>, operator: Operator, expected: ClauseValue) -> Clause {
        Clause::Single {
            key: key.into(),
            operator,
            expected,
            at_most: false,
            treat_in_progress_as_pass: false,
        }
    }

    /// Evaluate this clause against one item. `at_most`/`treat_in_progress_as_pass`
    /// are metadata consumed elsewhere (claim arbitration, assertion status);
    /// they play no role in `apply` itself.
    pub fn apply(&self, item: &dyn Clausable) -> bool {
        match self {
            Clause::And { children } => children.iter().all(|c| c.apply(item)),
            Clause::Or { children } => children.iter().any(|c| c.apply(item)),
            Clause::Single {
                key,
                operator,
                expected,
                ..
            } => {
                let actual = match item.attribute(key) {
                    Some(v) => v,
                    None => return false,
                };
                apply_single(&actual, *operator, expected)
            }
        }
    }

    /// True iff the predicate `self` implies `other`: every item matching
    /// `self` also matches `other`. Reflexive and transitive (see
    /// `degreepath-core/tests`), conservative (returns `false`, never a false
    /// positive) for combinations it doesn't specifically reason about.
    pub fn is_subset(&self, other: &Clause) -> bool {
        if self == other {
            return true;
        }

        if let Clause::And { children } = other {
            return children.iter().all(|c| self.is_subset(c));
        }
        if let Clause::Or { children } = other {
            return children.iter().any(|c| self.is_subset(c));
        }

        match self {
            Clause::Or { children } => return children.iter().all(|c| c.is_subset(other)),
            Clause::And { children } => return children.iter().any(|c| c.is_subset(other)),
            Clause::Single { .. } => {}
        }

        let (Clause::Single {
            key: self_key,
            operator: self_op,
            expected: self_expected,
            ..
        },
        Clause::Single {
            key: other_key,
            operator: other_op,
            expected: other_expected,
            ..
        }) = (self, other) else {
            return false;
        };

        if self_key != other_key {
            return false;
        }

        match (self_op, other_op) {
            (Operator::EqualTo, Operator::In) => match sequence_of(other_expected) {
                Some(set) => set.contains(self_expected),
                None => false,
            },
            (Operator::In, Operator::In) => match (sequence_of(self_expected), sequence_of(other_expected)) {
                (Some(a), Some(b)) => a.iter().all(|v| b.contains(v)),
                _ => false,
            },
            (Operator::EqualTo, Operator::EqualTo) => self_expected == other_expected,
            _ => false,
        }
    }

    pub fn children(&self) -> &[Clause] {
        match self {
            Clause::And { children } | Clause::Or { children } => children,
            Clause::Single { .. } => &[],
        }
    }
}

fn apply_single(actual: &ClauseValue, operator: Operator, expected: &ClauseValue) -> bool {
    if operator.is_sequence_operator() {
        let candidates = match sequence_of(expected) {
            Some(c) => c,
            None => return false,
        };
        let is_in = match actual {
            ClauseValue::StrSet(set) => candidates.iter().any(|c| match c {
                ClauseValue::Str(s) => set.contains(s),
                _ => false,
            }),
            other => candidates.iter().any(|c| c == other),
        };
        return match operator {
            Operator::In => is_in,
            Operator::NotIn => !is_in,
            _ => unreachable!(),
        };
    }

    match actual {
        ClauseValue::StrSet(set) => {
            let expected_str = match expected.as_str() {
                Some(s) => s,
                None => return false,
            };
            let member = set.contains(expected_str);
            match operator {
                Operator::EqualTo => member,
                Operator::NotEqualTo => !member,
                _ => false,
            }
        }
        scalar => match operator {
            Operator::EqualTo => scalar == expected,
            Operator::NotEqualTo => scalar != expected,
            Operator::LessThan => compare(scalar, expected) == Some(Ordering::Less),
            Operator::LessThanOrEqualTo => {
                matches!(compare(scalar, expected), Some(Ordering::Less) | Some(Ordering::Equal))
            }
            Operator::GreaterThan => compare(scalar, expected) == Some(Ordering::Greater),
            Operator::GreaterThanOrEqualTo => matches!(
                compare(scalar, expected),
                Some(Ordering::Greater) | Some(Ordering::Equal)
            ),
            Operator::In | Operator::NotIn => unreachable!(),
        },
    }
}

/// Applies a numeric comparison operator to a reduced scalar (assertion
/// evaluation; §4.2). `$in`/`$nin` are rejected at load time for assertions.
pub fn apply_numeric_operator(lhs: rust_decimal::Decimal, op: Operator, rhs: rust_decimal::Decimal) -> bool {
    match op {
        Operator::EqualTo => lhs == rhs,
        Operator::NotEqualTo => lhs != rhs,
        Operator::LessThan => lhs < rhs,
        Operator::LessThanOrEqualTo => lhs <= rhs,
        Operator::GreaterThan => lhs > rhs,
        Operator::GreaterThanOrEqualTo => lhs >= rhs,
        Operator::In | Operator::NotIn => false,
    }
}

pub fn str_set(items: impl IntoIterator<Item = impl Into<String>>) -> BTreeSet<String> {
    items.into_iter().map(Into::into).collect()
}
