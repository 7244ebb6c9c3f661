pub mod count;
pub mod course;
pub mod query;
pub mod reference;
pub mod requirement;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use count::CountRule;
pub use course::CourseRule;
pub use query::{LimitSet, QueryRule, SourceRepeats, SourceType};
pub use reference::ReferenceRule;
pub use requirement::RequirementRule;

use crate::context::RequirementContext;
use crate::error::DegreepathError;
use crate::result::RuleResult;
use crate::solver::AuditDeadline;

/// A rule's position in the tree; the key exceptions are addressed by.
/// Prefix-structured: a child's path is its parent's path plus one segment.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct RulePath(pub Vec<String>);

impl RulePath {
    pub fn root() -> Self {
        RulePath(Vec::new())
    }

    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        RulePath(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for RulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0.join("/"))
    }
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum Rule {
    Course(CourseRule),
    Query(QueryRule),
    Count(CountRule),
    Requirement(RequirementRule),
    Reference(ReferenceRule),
}

impl Rule {
    pub fn path(&self) -> &RulePath {
        match self {
            Rule::Course(r) => &r.path,
            Rule::Query(r) => &r.path,
            Rule::Count(r) => &r.path,
            Rule::Requirement(r) => &r.path,
            Rule::Reference(r) => &r.path,
        }
    }

    /// The uniform audit contract (§4.3): recursively evaluate this rule
    /// against the context, consulting and mutating the claim ledger as
    /// needed, and return a fully-resolved result node.
    pub fn audit(
        &self,
        ctx: &mut RequirementContext,
        deadline: &mut AuditDeadline,
    ) -> Result<RuleResult, DegreepathError> {
        match self {
            Rule::Course(r) => course::audit(r, ctx),
            Rule::Query(r) => query::audit(r, ctx, deadline),
            Rule::Count(r) => count::audit(r, ctx, deadline),
            Rule::Requirement(r) => requirement::audit(r, ctx, deadline),
            Rule::Reference(r) => reference::audit(r, ctx, deadline),
        }
    }
}
