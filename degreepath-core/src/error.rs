//! Error kinds surfaced by the core. Domain-level negatives (an unsatisfiable
//! rule) are never errors — see `crate::result::ResultStatus` — these are
//! reserved for malformed specifications and invariant violations.

use thiserror::Error;

use crate::rule::RulePath;

/// Raised when an area specification document is rejected outright.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("at {path}: expected a mapping, found something else")]
    NotAMapping { path: RulePath },

    #[error("at {path}: malformed rule descriptor: {reason}")]
    MalformedRule { path: RulePath, reason: String },

    #[error("at {path}: unknown operator {op:?}")]
    UnknownOperator { path: RulePath, op: String },

    #[error("at {path}: {count} operators present in a clause; exactly one is required")]
    MultipleOperators { path: RulePath, count: usize },

    #[error("at {path}: operator {op:?} is forbidden in this context")]
    ForbiddenOperator { path: RulePath, op: String },

    #[error("at {path}: expected a non-integer value for a counting assertion")]
    NonIntegerExpected { path: RulePath },

    #[error("at {path}: {name:?} does not resolve to a requirement")]
    UnknownRequirement { path: RulePath, name: String },

    #[error("at {path}: predicate function {name:?} is undispatched at load time")]
    UndispatchedPredicate { path: RulePath, name: String },

    #[error("at {path}: {reason}")]
    Other { path: RulePath, reason: String },
}

/// Raised when the student/context data cannot satisfy a request made of it
/// (e.g. an exception references a clbid absent from the transcript).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContextError {
    #[error("exception at {path} forces clbid {clbid:?}, but it is not present in the transcript")]
    MissingForcedClbid { path: RulePath, clbid: String },

    #[error("no requirement named {name:?} is defined in the enclosing container")]
    MissingRequirement { name: String },
}

/// Programming-bug-class invariant violations. These abort the audit; they
/// are never expected to occur against well-formed input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Unreachable {
    #[error("in-progress course {clbid} is neither enrolled, registered, nor incomplete")]
    InconsistentInProgressCourse { clbid: String },

    #[error("conditional assertion at {path} audited before its condition was resolved")]
    UnresolvedCondition { path: RulePath },

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DegreepathError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Unreachable(#[from] Unreachable),
}

pub type Result<T> = std::result::Result<T, DegreepathError>;
