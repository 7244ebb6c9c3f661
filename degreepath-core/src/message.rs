//! Progress events a long-running audit can stream to its caller (§6). The
//! CLI prints these; an embedder can equally well collect them into a log.

use serde::{Deserialize, Serialize};

use crate::result::{Rank, RuleResult};
use crate::value::Clbid;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AuditMessage {
    /// Emitted once, before the search starts, with a rough sense of scale.
    #[serde(rename = "estimate")]
    Estimate { count: usize },

    /// Emitted periodically while the solver is still branching.
    #[serde(rename = "progress")]
    Progress {
        iters: usize,
        avg_iter_ms: f64,
        best_rank: Option<Rank>,
    },

    /// The final, resolved result.
    #[serde(rename = "result")]
    Result {
        result: Box<RuleResult>,
        iters: usize,
        elapsed_ms: u64,
        avg_iter_ms: f64,
        transcript: Vec<Clbid>,
    },

    /// The deadline was exhausted before any candidate was even attempted.
    #[serde(rename = "no-audits-completed")]
    NoAuditsCompleted,
}
