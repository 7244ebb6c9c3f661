use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum AreaKind {
    Major,
    Minor,
    Concentration,
    Emphasis,
}

/// A declared area-of-study reference, as carried on the student record
/// (distinct from the area specification being audited against).
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct AreaPointer {
    pub code: String,
    pub catalog: String,
    pub kind: AreaKind,
    pub gpa: Option<Decimal>,
}
