use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum MusicPerformanceKind {
    Performance,
    Recital,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct MusicPerformance {
    pub id: String,
    pub kind: MusicPerformanceKind,
}

/// One declared proficiency: whether the student holds the proficiency
/// outright, and whether they passed the placement exam for it (the two are
/// tracked separately in the source data per `dp/load_clause.py`'s note that
/// only proficiency-or-not is stored, not exam status, for most areas).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize, Default)]
pub struct ProficiencyStatus {
    pub has_proficiency: bool,
    pub passed_exam: bool,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize, Default)]
pub struct MusicProficiencies(pub BTreeMap<String, ProficiencyStatus>);

impl MusicProficiencies {
    pub fn passed_exam(&self, of: &str) -> bool {
        self.0.get(of).map(|s| s.passed_exam).unwrap_or(false)
    }

    pub fn has_proficiency(&self, of: &str) -> bool {
        self.0.get(of).map(|s| s.has_proficiency).unwrap_or(false)
    }
}
