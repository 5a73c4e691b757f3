//! Project document model.
//!
//! # Responsibility
//! - Describe ethogram, subjects and observations in the current format.
//! - Provide the lookups used by validation and reporting code.
//!
//! # Invariants
//! - Maps are keyed by the string indices used in the project file.
//! - Keys not modelled here are kept in each `extra` map.

use crate::model::event::Event;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Observation type for media based observations.
pub const MEDIA: &str = "MEDIA";
/// Observation type for live observations.
pub const LIVE: &str = "LIVE";
/// Key of the first media player in an observation `file` map.
pub const PLAYER1: &str = "1";
/// Key of the second media player in an observation `file` map.
pub const PLAYER2: &str = "2";

/// Behavior type for instantaneous behaviors.
pub const POINT_EVENT: &str = "Point event";
/// Behavior type for behaviors with a duration.
pub const STATE_EVENT: &str = "State event";
const STATE_MARKER: &str = "STATE";

/// Modifier set type allowing exactly one value.
pub const SINGLE_SELECTION: u8 = 0;

/// Whole project document after migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub project_format_version: String,
    #[serde(rename = "behaviors_conf", default)]
    pub ethogram: BTreeMap<String, Behavior>,
    #[serde(rename = "subjects_conf", default)]
    pub subjects: BTreeMap<String, Subject>,
    #[serde(default)]
    pub observations: BTreeMap<String, Observation>,
    #[serde(default)]
    pub coding_map: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Project {
    /// Returns the observation with `id`, if any.
    pub fn observation(&self, id: &str) -> Option<&Observation> {
        self.observations.get(id)
    }

    /// Returns the ethogram entry whose code is `code`.
    pub fn behavior_by_code(&self, code: &str) -> Option<&Behavior> {
        self.ethogram.values().find(|behavior| behavior.code == code)
    }
}

/// One ethogram entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Behavior {
    pub code: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub modifiers: BTreeMap<String, ModifierSet>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Behavior {
    /// Creates an entry with no category and no modifiers.
    pub fn new(code: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            kind: kind.into(),
            category: String::new(),
            modifiers: BTreeMap::new(),
            extra: Map::new(),
        }
    }

    /// State behaviors are coded as start/stop pairs.
    pub fn is_state(&self) -> bool {
        is_state_type(&self.kind)
    }
}

/// Returns whether a behavior type string denotes a state behavior.
pub fn is_state_type(kind: &str) -> bool {
    kind.to_uppercase().contains(STATE_MARKER)
}

/// Set of modifiers attached to a behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierSet {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: u8,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Observed individual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One coding session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub file: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_info: Option<MediaInfo>,
    #[serde(rename = "time offset second player", default)]
    pub time_offset_second_player: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Observation {
    /// Media files attached to `player`.
    pub fn media_files(&self, player: &str) -> &[String] {
        self.file.get(player).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Media metadata keyed by media file path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    #[serde(default)]
    pub length: BTreeMap<String, f64>,
    #[serde(default)]
    pub fps: BTreeMap<String, f64>,
    #[serde(rename = "hasVideo", default)]
    pub has_video: BTreeMap<String, bool>,
    #[serde(rename = "hasAudio", default)]
    pub has_audio: BTreeMap<String, bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::{is_state_type, Behavior, Project, POINT_EVENT};
    use serde_json::json;

    #[test]
    fn state_type_detection_is_case_insensitive() {
        assert!(is_state_type("State event"));
        assert!(is_state_type("state event with coding map"));
        assert!(!is_state_type(POINT_EVENT));
        assert!(Behavior::new("sleep", "State event").is_state());
    }

    #[test]
    fn project_keeps_unknown_keys() {
        let value = json!({
            "project_format_version": "4.0",
            "project_name": "ants",
            "behaviors_conf": {
                "0": {
                    "code": "walk",
                    "type": "Point event",
                    "category": "",
                    "key": "w",
                    "modifiers": {}
                }
            },
            "subjects_conf": {"0": {"key": "a", "name": "ant", "description": ""}},
            "observations": {},
            "coding_map": {}
        });

        let project: Project = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(project.extra["project_name"], "ants");
        assert_eq!(project.ethogram["0"].extra["key"], "w");
        assert_eq!(project.behavior_by_code("walk").unwrap().kind, POINT_EVENT);

        let encoded = serde_json::to_value(&project).unwrap();
        assert_eq!(encoded, value);
    }
}
