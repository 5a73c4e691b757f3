//! Coded event model.
//!
//! # Responsibility
//! - Represent one coded event of an observation.
//! - Keep the positional wire shape `[time, subject, behavior, modifier, comment]`.
//!
//! # Invariants
//! - `time` is expressed in seconds with millisecond precision.
//! - An empty `subject` means the event has no focal subject.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};

/// Position of the event time in the wire tuple.
pub const EVENT_TIME_FIELD_IDX: usize = 0;
/// Position of the subject name in the wire tuple.
pub const EVENT_SUBJECT_FIELD_IDX: usize = 1;
/// Position of the behavior code in the wire tuple.
pub const EVENT_BEHAVIOR_FIELD_IDX: usize = 2;
/// Position of the modifier string in the wire tuple.
pub const EVENT_MODIFIER_FIELD_IDX: usize = 3;
/// Position of the free-text comment in the wire tuple.
pub const EVENT_COMMENT_FIELD_IDX: usize = 4;

/// Label used in reports for events coded without a subject.
pub const NO_FOCAL_SUBJECT: &str = "No focal subject";

/// One coded event.
///
/// Serialized as a five element JSON array to match the project file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Value>", into = "Vec<Value>")]
pub struct Event {
    /// Seconds from the start of the observation.
    pub time: f64,
    pub subject: String,
    pub behavior: String,
    /// Modifier selection, `|`-joined when several sets are used.
    pub modifier: String,
    pub comment: String,
    /// Columns after the comment, written back unchanged.
    pub extra: Vec<Value>,
}

impl Event {
    /// Creates an event without modifier or comment.
    pub fn new(time: f64, subject: impl Into<String>, behavior: impl Into<String>) -> Self {
        Self {
            time,
            subject: subject.into(),
            behavior: behavior.into(),
            modifier: String::new(),
            comment: String::new(),
            extra: Vec::new(),
        }
    }

    /// Returns a copy of this event carrying `modifier`.
    pub fn with_modifier(mut self, modifier: impl Into<String>) -> Self {
        self.modifier = modifier.into();
        self
    }
}

impl From<Event> for Vec<Value> {
    fn from(value: Event) -> Self {
        let mut row = vec![
            Value::from(value.time),
            Value::String(value.subject),
            Value::String(value.behavior),
            Value::String(value.modifier),
            Value::String(value.comment),
        ];
        row.extend(value.extra);
        row
    }
}

/// Error raised when an event row does not match the positional layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRowError(String);

impl Display for EventRowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid event row: {}", self.0)
    }
}

impl std::error::Error for EventRowError {}

impl TryFrom<Vec<Value>> for Event {
    type Error = EventRowError;

    fn try_from(row: Vec<Value>) -> Result<Self, Self::Error> {
        // Comment and modifier columns are absent in some hand-edited files.
        if row.len() < 3 {
            return Err(EventRowError(format!(
                "expected at least 3 fields, got {}",
                row.len()
            )));
        }

        let time = match &row[EVENT_TIME_FIELD_IDX] {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| {
            EventRowError(format!(
                "time field is not numeric: {}",
                row[EVENT_TIME_FIELD_IDX]
            ))
        })?;

        Ok(Self {
            time,
            subject: text_field(&row, EVENT_SUBJECT_FIELD_IDX)?,
            behavior: text_field(&row, EVENT_BEHAVIOR_FIELD_IDX)?,
            modifier: text_field(&row, EVENT_MODIFIER_FIELD_IDX)?,
            comment: text_field(&row, EVENT_COMMENT_FIELD_IDX)?,
            extra: row.get(EVENT_COMMENT_FIELD_IDX + 1..).unwrap_or_default().to_vec(),
        })
    }
}

fn text_field(row: &[Value], idx: usize) -> Result<String, EventRowError> {
    match row.get(idx) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(text)) => Ok(text.clone()),
        Some(other) => Err(EventRowError(format!(
            "field {idx} must be a string, got {other}"
        ))),
    }
}

/// Display format for event times in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFormat {
    /// Plain seconds, e.g. `75.250`.
    #[default]
    Seconds,
    /// Clock format, e.g. `00:01:15.250`.
    HhMmSs,
}

impl TimeFormat {
    /// Renders `seconds` according to this format.
    pub fn format(self, seconds: f64) -> String {
        match self {
            Self::Seconds => format!("{seconds:.3}"),
            Self::HhMmSs => seconds_to_time(seconds),
        }
    }
}

/// Converts seconds into `hh:mm:ss.mmm`, keeping a leading `-` for negative values.
pub fn seconds_to_time(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "NA".to_string();
    }

    let sign = if seconds < 0.0 { "-" } else { "" };
    let total_ms = (seconds.abs() * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let secs = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;

    format!("{sign}{hours:02}:{minutes:02}:{secs:02}.{millis:03}")
}

/// Rounds a time value to millisecond precision.
pub fn round_to_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::{round_to_millis, seconds_to_time, Event, TimeFormat};
    use serde_json::json;

    #[test]
    fn seconds_to_time_formats_hours_minutes_and_millis() {
        assert_eq!(seconds_to_time(0.0), "00:00:00.000");
        assert_eq!(seconds_to_time(75.25), "00:01:15.250");
        assert_eq!(seconds_to_time(3723.5), "01:02:03.500");
        assert_eq!(seconds_to_time(-1.5), "-00:00:01.500");
    }

    #[test]
    fn seconds_to_time_carries_rounded_millis() {
        assert_eq!(seconds_to_time(59.9996), "00:01:00.000");
    }

    #[test]
    fn time_format_seconds_uses_three_decimals() {
        assert_eq!(TimeFormat::Seconds.format(12.5), "12.500");
        assert_eq!(TimeFormat::HhMmSs.format(12.5), "00:00:12.500");
    }

    #[test]
    fn round_to_millis_drops_sub_millisecond_noise() {
        assert_eq!(round_to_millis(1.23456), 1.235);
        assert_eq!(round_to_millis(0.1 + 0.2), 0.3);
    }

    #[test]
    fn event_decodes_short_rows_and_string_times() {
        let event: Event = serde_json::from_value(json!(["4.5", "ant", "walk"])).unwrap();
        assert_eq!(event.time, 4.5);
        assert_eq!(event.subject, "ant");
        assert_eq!(event.behavior, "walk");
        assert_eq!(event.modifier, "");
        assert_eq!(event.comment, "");
    }

    #[test]
    fn event_encodes_as_positional_array() {
        let event = Event::new(1.0, "", "rest").with_modifier("left");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, json!([1.0, "", "rest", "left", ""]));
    }

    #[test]
    fn event_keeps_trailing_columns() {
        let row = json!([2.0, "ant", "rest", "", "", 42, {"frame": 50}]);
        let event: Event = serde_json::from_value(row.clone()).unwrap();
        assert_eq!(event.extra, vec![json!(42), json!({"frame": 50})]);
        assert_eq!(serde_json::to_value(&event).unwrap(), row);
    }

    #[test]
    fn event_rejects_non_string_subject() {
        let err = serde_json::from_value::<Event>(json!([1.0, 3, "rest", "", ""])).unwrap_err();
        assert!(err.to_string().contains("field 1 must be a string"));
    }
}
