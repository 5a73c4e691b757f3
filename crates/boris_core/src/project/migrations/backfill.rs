//! Steps adding keys introduced by later format revisions.

use super::{MigrationContext, ETHOGRAM, EVENTS, OBSERVATIONS, SUBJECTS, TIME_OFFSET_SECOND_PLAYER};
use crate::model::event::{round_to_millis, EVENT_TIME_FIELD_IDX};
use crate::model::project::{PLAYER1, PLAYER2};
use crate::project::ProjectResult;
use serde_json::{Map, Number, Value};

const TIME_OFFSET_KEYS: &[&str] = &["time offset", TIME_OFFSET_SECOND_PLAYER];

/// Turns event times and observation offsets into millisecond-rounded numbers.
pub(super) fn normalize_times(ctx: &mut MigrationContext<'_>) -> ProjectResult<()> {
    let Some(observations) = ctx.section_mut(OBSERVATIONS) else {
        return Ok(());
    };

    for observation in observations.values_mut().filter_map(Value::as_object_mut) {
        for key in TIME_OFFSET_KEYS {
            if let Some(value) = observation.get_mut(*key) {
                normalize_time_value(value);
            }
        }

        let Some(events) = observation.get_mut(EVENTS).and_then(Value::as_array_mut) else {
            continue;
        };
        for event in events.iter_mut().filter_map(Value::as_array_mut) {
            if let Some(time) = event.get_mut(EVENT_TIME_FIELD_IDX) {
                normalize_time_value(time);
            }
        }
    }
    Ok(())
}

fn normalize_time_value(value: &mut Value) {
    let seconds = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    if let Some(number) = seconds.and_then(|secs| Number::from_f64(round_to_millis(secs))) {
        *value = Value::Number(number);
    }
}

pub(super) fn ensure_coding_map(ctx: &mut MigrationContext<'_>) -> ProjectResult<()> {
    if !ctx.doc.contains_key("coding_map") {
        ctx.doc
            .insert("coding_map".to_string(), Value::Object(Map::new()));
        ctx.changed = true;
    }
    Ok(())
}

/// Adds an empty description to subjects of versioned projects.
///
/// Unversioned projects store subjects as pairs and are handled by
/// `convert_unversioned`.
pub(super) fn backfill_subject_descriptions(ctx: &mut MigrationContext<'_>) -> ProjectResult<()> {
    if ctx.version()?.is_none() {
        return Ok(());
    }
    let mut changed = false;
    if let Some(subjects) = ctx.section_mut(SUBJECTS) {
        for subject in subjects.values_mut().filter_map(Value::as_object_mut) {
            if !subject.contains_key("description") {
                subject.insert("description".to_string(), Value::String(String::new()));
                changed = true;
            }
        }
    }
    ctx.changed |= changed;
    Ok(())
}

/// Replaces an empty `file` list with empty player lists.
pub(super) fn normalize_file_lists(ctx: &mut MigrationContext<'_>) -> ProjectResult<()> {
    let Some(observations) = ctx.section_mut(OBSERVATIONS) else {
        return Ok(());
    };
    for observation in observations.values_mut().filter_map(Value::as_object_mut) {
        let is_empty_list = observation
            .get("file")
            .and_then(Value::as_array)
            .is_some_and(Vec::is_empty);
        if is_empty_list {
            observation.insert("file".to_string(), empty_players());
        }
    }
    Ok(())
}

pub(super) fn empty_players() -> Value {
    let mut players = Map::new();
    players.insert(PLAYER1.to_string(), Value::Array(Vec::new()));
    players.insert(PLAYER2.to_string(), Value::Array(Vec::new()));
    Value::Object(players)
}

pub(super) fn backfill_time_offset(ctx: &mut MigrationContext<'_>) -> ProjectResult<()> {
    let mut changed = false;
    if let Some(observations) = ctx.section_mut(OBSERVATIONS) {
        for observation in observations.values_mut().filter_map(Value::as_object_mut) {
            if !observation.contains_key(TIME_OFFSET_SECOND_PLAYER) {
                observation.insert(TIME_OFFSET_SECOND_PLAYER.to_string(), Value::from(0.0));
                changed = true;
            }
        }
    }
    ctx.changed |= changed;
    Ok(())
}

/// Adds an empty category to behaviors lacking one.
///
/// Does not mark the project as changed.
pub(super) fn backfill_categories(ctx: &mut MigrationContext<'_>) -> ProjectResult<()> {
    if let Some(ethogram) = ctx.section_mut(ETHOGRAM) {
        for behavior in ethogram.values_mut().filter_map(Value::as_object_mut) {
            behavior
                .entry("category")
                .or_insert_with(|| Value::String(String::new()));
        }
    }
    Ok(())
}
