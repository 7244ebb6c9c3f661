//! Audits a transcript against a declarative degree/area requirement
//! specification: loads a rule tree and a transcript, then searches for a
//! satisfying assignment of courses to requirements (§1-§9).

pub mod assertion;
pub mod claim;
pub mod clause;
pub mod context;
pub mod error;
pub mod exception;
pub mod load;
pub mod message;
pub mod predicate;
pub mod result;
pub mod rule;
pub mod solver;
pub mod value;

pub use error::{ContextError, DegreepathError, LoadError, Result, Unreachable};
pub use result::{ResultStatus, RuleResult};
pub use rule::Rule;
pub use solver::AuditDeadline;
