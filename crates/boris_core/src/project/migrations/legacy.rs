//! Steps upgrading pre-4.0 project layouts.

use super::{old_version_path, MigrationContext, ETHOGRAM, OBSERVATIONS, SUBJECTS};
use crate::model::project::{MEDIA, PLAYER1, PLAYER2, SINGLE_SELECTION};
use crate::model::version::FormatVersion;
use crate::project::migrations::backfill::empty_players;
use crate::project::{ProjectError, ProjectResult};
use log::info;
use serde_json::{Map, Value};

const LEGACY_MEDIA_TYPES: &[&str] = &["VIDEO", "AUDIO"];

/// Converts an unversioned (v0) project to the current layout.
///
/// The caller must save the result under a new file name.
pub(super) fn convert_unversioned(ctx: &mut MigrationContext<'_>) -> ProjectResult<()> {
    if ctx.version()?.is_some() {
        return Ok(());
    }

    ctx.set_current_version();

    if let Some(observations) = ctx.section_mut(OBSERVATIONS) {
        for observation in observations.values_mut().filter_map(Value::as_object_mut) {
            observation.remove("replace audio");

            let is_legacy_media = observation
                .get("type")
                .and_then(Value::as_str)
                .is_some_and(|kind| LEGACY_MEDIA_TYPES.contains(&kind));
            if is_legacy_media {
                observation.insert("type".to_string(), Value::String(MEDIA.to_string()));
            }

            if let Some(files) = observation.get("file").and_then(Value::as_array) {
                let players = players_from_list(files);
                observation.insert("file".to_string(), players);
            }
        }
    }

    if let Some(subjects) = ctx.section_mut(SUBJECTS) {
        for subject in subjects.values_mut() {
            if let Some(converted) = subject_from_pair(subject) {
                *subject = converted;
            }
        }
    }

    ctx.message = Some(format!(
        "The project file was converted to the new format (v. {}) in use with your version of BORIS. \
         Choose a new file name for saving it.",
        FormatVersion::current()
    ));
    ctx.path_cleared = true;
    info!(
        "event=project_migrate module=project status=converted from=0 to={}",
        FormatVersion::current()
    );
    Ok(())
}

fn players_from_list(files: &[Value]) -> Value {
    if files.is_empty() {
        return empty_players();
    }
    let mut players = Map::new();
    players.insert(PLAYER1.to_string(), Value::Array(vec![files[0].clone()]));
    if let Some(second) = files.get(1) {
        players.insert(PLAYER2.to_string(), Value::Array(vec![second.clone()]));
    }
    Value::Object(players)
}

fn subject_from_pair(subject: &Value) -> Option<Value> {
    let pair = subject.as_array()?;
    let mut converted = Map::new();
    converted.insert(
        "key".to_string(),
        pair.first().cloned().unwrap_or_else(|| Value::String(String::new())),
    );
    converted.insert(
        "name".to_string(),
        pair.get(1).cloned().unwrap_or_else(|| Value::String(String::new())),
    );
    converted.insert("description".to_string(), Value::String(String::new()));
    Some(Value::Object(converted))
}

/// Converts `|`/`,` separated modifier strings to structured modifier sets.
///
/// Projects below 4.0 without string modifiers only get their version bumped.
/// Projects with string modifiers are bumped and marked changed right away as
/// well, rather than on the next load, so the result always matches the
/// current model. Converted v0 projects are saved under a new name, so no copy
/// is kept.
pub(super) fn structure_modifiers(ctx: &mut MigrationContext<'_>) -> ProjectResult<()> {
    let Some(version) = ctx.version()? else {
        return Ok(());
    };
    let converted_from_v0 = ctx.path_cleared;
    if !converted_from_v0 && version >= FormatVersion::structured_modifiers() {
        return Ok(());
    }

    let mut legacy_modifiers = false;
    if let Some(ethogram) = ctx.section_mut(ETHOGRAM) {
        for behavior in ethogram.values_mut().filter_map(Value::as_object_mut) {
            let converted = match behavior.get("modifiers") {
                Some(Value::String(text)) if !text.is_empty() => {
                    legacy_modifiers = true;
                    parse_modifier_sets(text)
                }
                Some(value) if is_truthy(value) => continue,
                _ => Map::new(),
            };
            behavior.insert("modifiers".to_string(), Value::Object(converted));
        }
    }

    if converted_from_v0 {
        return Ok(());
    }

    ctx.legacy_modifiers = legacy_modifiers;
    if !legacy_modifiers {
        ctx.message = Some(format!(
            "The project version was updated from {} to {}",
            version,
            FormatVersion::current()
        ));
    }
    ctx.set_current_version();
    info!(
        "event=project_migrate module=project status=ok from={} to={} legacy_modifiers={}",
        version,
        FormatVersion::current(),
        legacy_modifiers
    );
    Ok(())
}

/// Parses `a,b|c` into sets keyed `"0"`, `"1"`, ... with single selection.
pub(crate) fn parse_modifier_sets(text: &str) -> Map<String, Value> {
    let mut sets = Map::new();
    for set in text.split('|') {
        let mut entry = Map::new();
        entry.insert("name".to_string(), Value::String(String::new()));
        entry.insert("type".to_string(), Value::from(SINGLE_SELECTION));
        entry.insert(
            "values".to_string(),
            Value::Array(
                set.split(',')
                    .map(|value| Value::String(value.to_string()))
                    .collect(),
            ),
        );
        sets.insert(sets.len().to_string(), Value::Object(entry));
    }
    sets
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Keeps a copy of the source file when modifiers were converted.
pub(super) fn save_old_version(ctx: &mut MigrationContext<'_>) -> ProjectResult<()> {
    if !ctx.legacy_modifiers {
        return Ok(());
    }

    let Some(source) = ctx.source_path else {
        ctx.message = Some(format!(
            "The project was updated to the current project version ({}).",
            FormatVersion::current()
        ));
        return Ok(());
    };

    let backup = old_version_path(source);
    std::fs::copy(source, &backup).map_err(|err| ProjectError::Backup {
        path: backup.clone(),
        source: err,
    })?;
    info!(
        "event=project_backup module=project status=ok path={}",
        backup.display()
    );

    ctx.message = Some(format!(
        "The project was updated to the current project version ({}). \
         The old file project was saved as {}",
        FormatVersion::current(),
        backup.display()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{is_truthy, parse_modifier_sets};
    use serde_json::json;

    #[test]
    fn parse_modifier_sets_splits_sets_and_values() {
        let sets = parse_modifier_sets("left,right|fast,slow,still");
        assert_eq!(
            serde_json::Value::Object(sets),
            json!({
                "0": {"name": "", "type": 0, "values": ["left", "right"]},
                "1": {"name": "", "type": 0, "values": ["fast", "slow", "still"]}
            })
        );
    }

    #[test]
    fn truthiness_matches_empty_containers() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!({})));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!({"0": {}})));
    }
}
