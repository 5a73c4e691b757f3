//! State event pairing check.
//!
//! # Responsibility
//! - Walk one observation and find state behaviors left open per subject.
//! - Render the outcome as the user-facing summary shown after coding.
//!
//! # Invariants
//! - Each `(behavior, modifier)` occurrence toggles the pair open or closed.
//! - Subjects and behaviors are visited in sorted order, so reports are stable.
//! - An event whose behavior is missing from the ethogram stops the check.

use crate::model::event::{TimeFormat, NO_FOCAL_SUBJECT};
use crate::model::project::{is_state_type, Behavior, Project, POINT_EVENT};
use crate::project::{ProjectError, ProjectResult};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

/// Returns the type of the ethogram behavior coded as `code`.
pub fn event_type<'a>(code: &str, ethogram: &'a BTreeMap<String, Behavior>) -> Option<&'a str> {
    ethogram
        .values()
        .find(|behavior| behavior.code == code)
        .map(|behavior| behavior.kind.as_str())
}

/// State behavior occurrence without a matching stop.
#[derive(Debug, Clone, PartialEq)]
pub struct UnpairedStateEvent {
    /// Empty when coded without a focal subject.
    pub subject: String,
    pub behavior: String,
    pub modifier: String,
    /// Time of the occurrence that opened the pair.
    pub time: f64,
}

impl UnpairedStateEvent {
    /// One report line, e.g. `The behavior sleep (modifier deep) is not PAIRED ...`.
    pub fn describe(&self, time_format: TimeFormat) -> String {
        let modifier = if self.modifier.is_empty() {
            String::new()
        } else {
            format!(" (modifier {})", self.modifier)
        };
        let subject = if self.subject.is_empty() {
            NO_FOCAL_SUBJECT
        } else {
            self.subject.as_str()
        };
        format!(
            "The behavior {}{} is not PAIRED for subject \"{}\" at {}",
            self.behavior,
            modifier,
            subject,
            time_format.format(self.time)
        )
    }
}

/// Outcome of checking one observation.
#[derive(Debug, Clone, PartialEq)]
pub enum StateEventCheck {
    /// The ethogram defines no state behavior.
    NoStateBehaviors,
    /// Every state behavior is paired.
    Paired,
    /// An event uses a behavior code missing from the ethogram.
    UnknownBehavior(String),
    /// At least one state behavior is left open.
    Unpaired(Vec<UnpairedStateEvent>),
}

impl StateEventCheck {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::NoStateBehaviors | Self::Paired)
    }

    /// Renders the user-facing summary, one line per unpaired event.
    pub fn message(&self, time_format: TimeFormat) -> String {
        match self {
            Self::NoStateBehaviors => "No behavior is defined as `State event`".to_string(),
            Self::Paired => "All state events are PAIRED".to_string(),
            Self::UnknownBehavior(code) => {
                format!("The behaviour {code} not found in the ethogram.")
            }
            Self::Unpaired(events) => events
                .iter()
                .map(|event| event.describe(time_format))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// `(ok, message)` pair shown to the user.
    pub fn summary(&self, time_format: TimeFormat) -> (bool, String) {
        (self.is_ok(), self.message(time_format))
    }
}

/// Checks that state behaviors of observation `obs_id` are paired.
///
/// # Errors
/// - `ObservationNotFound` when `obs_id` is not part of the project.
pub fn check_state_events_obs(project: &Project, obs_id: &str) -> ProjectResult<StateEventCheck> {
    let observation = project
        .observation(obs_id)
        .ok_or_else(|| ProjectError::ObservationNotFound(obs_id.to_string()))?;

    let behavior_types: BTreeSet<&str> = project
        .ethogram
        .values()
        .map(|behavior| behavior.kind.as_str())
        .collect();
    if behavior_types.is_empty() || behavior_types.iter().all(|kind| *kind == POINT_EVENT) {
        return Ok(StateEventCheck::NoStateBehaviors);
    }

    let mut coded: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for event in &observation.events {
        coded
            .entry(event.subject.as_str())
            .or_default()
            .insert(event.behavior.as_str());
    }

    let mut unpaired = Vec::new();
    for (subject, behaviors) in &coded {
        for behavior in behaviors {
            let Some(kind) = event_type(behavior, &project.ethogram) else {
                debug!(
                    "event=state_check module=validation status=unknown_behavior observation={} behavior={}",
                    obs_id, behavior
                );
                return Ok(StateEventCheck::UnknownBehavior((*behavior).to_string()));
            };
            if !is_state_type(kind) {
                continue;
            }

            // Open occurrences in coding order: (modifier, opening time).
            let mut open: Vec<(&str, f64)> = Vec::new();
            for event in observation
                .events
                .iter()
                .filter(|event| event.subject == *subject && event.behavior == *behavior)
            {
                match open
                    .iter()
                    .position(|(modifier, _)| *modifier == event.modifier)
                {
                    Some(idx) => {
                        open.remove(idx);
                    }
                    None => open.push((event.modifier.as_str(), event.time)),
                }
            }

            unpaired.extend(open.into_iter().map(|(modifier, time)| UnpairedStateEvent {
                subject: (*subject).to_string(),
                behavior: (*behavior).to_string(),
                modifier: modifier.to_string(),
                time,
            }));
        }
    }

    debug!(
        "event=state_check module=validation status=ok observation={} unpaired={}",
        obs_id,
        unpaired.len()
    );
    if unpaired.is_empty() {
        Ok(StateEventCheck::Paired)
    } else {
        Ok(StateEventCheck::Unpaired(unpaired))
    }
}
