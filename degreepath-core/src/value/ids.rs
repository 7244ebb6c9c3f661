use std::fmt;

use serde::{Deserialize, Serialize};

/// An opaque, transcript-unique identifier for one course-taking event.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Clbid(pub String);

impl fmt::Display for Clbid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Clbid {
    fn from(s: &str) -> Self {
        Clbid(s.to_string())
    }
}

impl From<String> for Clbid {
    fn from(s: String) -> Self {
        Clbid(s)
    }
}

/// A catalog identifier shared across retakes of the same course.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Crsid(pub String);

impl fmt::Display for Crsid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Crsid {
    fn from(s: &str) -> Self {
        Crsid(s.to_string())
    }
}

impl From<String> for Crsid {
    fn from(s: String) -> Self {
        Crsid(s)
    }
}
