//! Loading an area specification and a student transcript (§6). Both
//! documents may arrive as YAML or JSON; `serde_json::Value` is the common
//! intermediate representation either format is parsed into before the
//! typed structures take over.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::claim::MulticountablePolicy;
use crate::context::RequirementContext;
use crate::error::LoadError;
use crate::exception::RuleException;
use crate::rule::{Rule, RulePath};
use crate::value::{AreaPointer, CourseInstance, MusicPerformance, MusicProficiencies};

/// The top-level document produced by compiling an area's requirements: the
/// rule tree plus the cross-cutting multicountable policy that governs how
/// its queries may share courses (§4.5).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Specification {
    pub result: Rule,
    #[serde(default)]
    pub multicountable: MulticountablePolicy,
}

/// A student's record, as handed to the audit: their transcript plus the
/// declared-area and music-proficiency state a rule tree can query against.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TranscriptDocument {
    #[serde(default)]
    pub courses: Vec<CourseInstance>,
    #[serde(default)]
    pub areas: Vec<AreaPointer>,
    #[serde(default)]
    pub music_proficiencies: MusicProficiencies,
    #[serde(default)]
    pub music_performances: Vec<MusicPerformance>,
}

fn to_load_error(err: impl std::fmt::Display) -> LoadError {
    LoadError::Other {
        path: RulePath::root(),
        reason: err.to_string(),
    }
}

pub fn load_specification(value: &Value) -> Result<Specification, LoadError> {
    serde_json::from_value(value.clone()).map_err(to_load_error)
}

pub fn load_specification_json(text: &str) -> Result<Specification, LoadError> {
    let value: Value = serde_json::from_str(text).map_err(to_load_error)?;
    load_specification(&value)
}

pub fn load_specification_yaml(text: &str) -> Result<Specification, LoadError> {
    let value: Value = serde_yaml::from_str(text).map_err(to_load_error)?;
    load_specification(&value)
}

pub fn load_transcript(value: &Value) -> Result<TranscriptDocument, LoadError> {
    serde_json::from_value(value.clone()).map_err(to_load_error)
}

pub fn load_transcript_json(text: &str) -> Result<TranscriptDocument, LoadError> {
    let value: Value = serde_json::from_str(text).map_err(to_load_error)?;
    load_transcript(&value)
}

pub fn load_transcript_yaml(text: &str) -> Result<TranscriptDocument, LoadError> {
    let value: Value = serde_yaml::from_str(text).map_err(to_load_error)?;
    load_transcript(&value)
}

/// Assemble the mutable audit surface from a loaded transcript, the area's
/// multicountable policy, and any exceptions applying to this particular
/// audit run (§4.6).
pub fn build_context(
    transcript: TranscriptDocument,
    spec: &Specification,
    exceptions: HashMap<RulePath, Vec<RuleException>>,
) -> RequirementContext {
    RequirementContext::empty()
        .with_transcript(transcript.courses)
        .with_areas(transcript.areas)
        .with_music_proficiencies(transcript.music_proficiencies)
        .with_music_performances(transcript.music_performances)
        .with_multicountable(spec.multicountable.clone())
        .with_exceptions(exceptions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn loads_minimal_course_specification() {
        let doc = json!({
            "result": {
                "Course": {
                    "path": [],
                    "course": "HIST 201",
                    "course_type": null,
                    "allow_claimed": false,
                    "grade": null
                }
            },
            "multicountable": []
        });

        let spec = load_specification(&doc).expect("should load");
        match spec.result {
            Rule::Course(c) => assert_eq!(c.course, "HIST 201"),
            _ => panic!("expected a course rule"),
        }
    }

    #[test]
    fn loads_transcript_with_defaults() {
        let doc = json!({ "courses": [] });
        let transcript = load_transcript(&doc).expect("should load");
        assert!(transcript.courses.is_empty());
        assert!(transcript.areas.is_empty());
    }

    #[test]
    fn rejects_malformed_yaml() {
        let err = load_specification_yaml("result: [this is not: a valid: mapping");
        assert!(err.is_err());
    }
}
