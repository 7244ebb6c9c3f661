//! Per-path overrides applied to an audit independent of the rule tree
//! itself (§4.6): force a course in, waive a requirement, override a
//! numeric expectation, or force-match a specific course to a `course` rule.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::value::Clbid;

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RuleException {
    /// Force a course into a `query`/assertion's matched set even if it
    /// wouldn't otherwise be selected.
    #[serde(rename = "insert")]
    Insert { clbid: Clbid },
    /// Force a `course` rule to match a specific clbid rather than searching
    /// the transcript for one.
    #[serde(rename = "force")]
    ForceCourse { clbid: Clbid },
    /// Mark the rule at this path as satisfied without evaluating it.
    #[serde(rename = "waive")]
    Waive,
    /// Override an assertion's expected value.
    #[serde(rename = "value")]
    Value { value: Decimal },
}
