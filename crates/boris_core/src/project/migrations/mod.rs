//! Project document migration registry and executor.
//!
//! # Responsibility
//! - Register document upgrade steps in a fixed order.
//! - Run every step against the raw JSON document and collect the outcome.
//!
//! # Invariants
//! - Steps run in registry order; later steps may rely on earlier ones.
//! - Every step is idempotent on a document already in the current format.
//! - A project newer than `PROJECT_FORMAT_VERSION` aborts the run.

use crate::model::project::Project;
use crate::model::version::FormatVersion;
use crate::project::media::{backfill_media_info, MediaAnalyzer};
use crate::project::{ProjectError, ProjectResult};
use log::debug;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

mod backfill;
mod legacy;

pub const OBSERVATIONS: &str = "observations";
pub const EVENTS: &str = "events";
pub const ETHOGRAM: &str = "behaviors_conf";
pub const SUBJECTS: &str = "subjects_conf";
pub const VERSION_KEY: &str = "project_format_version";
pub const TIME_OFFSET_SECOND_PLAYER: &str = "time offset second player";

/// Suffix appended to the file stem of the pre-migration copy.
pub const OLD_VERSION_SUFFIX: &str = "_old_version";

type MigrationFn = fn(&mut MigrationContext<'_>) -> ProjectResult<()>;

#[derive(Clone, Copy)]
struct Migration {
    name: &'static str,
    apply: MigrationFn,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "normalize_times",
        apply: backfill::normalize_times,
    },
    Migration {
        name: "ensure_coding_map",
        apply: backfill::ensure_coding_map,
    },
    Migration {
        name: "normalize_version_marker",
        apply: normalize_version_marker,
    },
    Migration {
        name: "reject_newer_format",
        apply: reject_newer_format,
    },
    Migration {
        name: "backfill_subject_descriptions",
        apply: backfill::backfill_subject_descriptions,
    },
    Migration {
        name: "convert_unversioned",
        apply: legacy::convert_unversioned,
    },
    Migration {
        name: "normalize_file_lists",
        apply: backfill::normalize_file_lists,
    },
    Migration {
        name: "backfill_time_offset",
        apply: backfill::backfill_time_offset,
    },
    Migration {
        name: "structure_modifiers",
        apply: legacy::structure_modifiers,
    },
    Migration {
        name: "backfill_categories",
        apply: backfill::backfill_categories,
    },
    Migration {
        name: "save_old_version",
        apply: legacy::save_old_version,
    },
    Migration {
        name: "backfill_media_info",
        apply: backfill_media_info,
    },
];

/// Names of registered migration steps, in execution order.
pub fn migration_names() -> Vec<&'static str> {
    MIGRATIONS.iter().map(|migration| migration.name).collect()
}

/// Mutable state threaded through migration steps.
pub(crate) struct MigrationContext<'a> {
    pub(crate) doc: Map<String, Value>,
    pub(crate) source_path: Option<&'a Path>,
    pub(crate) analyzer: &'a dyn MediaAnalyzer,
    pub(crate) changed: bool,
    pub(crate) message: Option<String>,
    /// Set when the source file must be reopened through "save as".
    pub(crate) path_cleared: bool,
    /// Set when string modifiers were converted to structured sets.
    pub(crate) legacy_modifiers: bool,
}

impl<'a> MigrationContext<'a> {
    fn new(
        doc: Map<String, Value>,
        source_path: Option<&'a Path>,
        analyzer: &'a dyn MediaAnalyzer,
    ) -> Self {
        Self {
            doc,
            source_path,
            analyzer,
            changed: false,
            message: None,
            path_cleared: false,
            legacy_modifiers: false,
        }
    }

    /// Version marker, or `None` for unversioned (v0) documents.
    pub(crate) fn version(&self) -> ProjectResult<Option<FormatVersion>> {
        match self.doc.get(VERSION_KEY) {
            None => Ok(None),
            Some(value) => FormatVersion::from_value(value)
                .map(Some)
                .ok_or_else(|| ProjectError::InvalidVersion(value.to_string())),
        }
    }

    pub(crate) fn set_current_version(&mut self) {
        self.doc.insert(
            VERSION_KEY.to_string(),
            Value::String(FormatVersion::current().as_str().to_string()),
        );
        self.changed = true;
    }

    /// Mutable object map stored under `key`, if present and an object.
    pub(crate) fn section_mut(&mut self, key: &str) -> Option<&mut Map<String, Value>> {
        self.doc.get_mut(key).and_then(Value::as_object_mut)
    }
}

/// Result of migrating one project document.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationOutcome {
    pub project: Project,
    /// Whether the document differs from what was read.
    pub changed: bool,
    /// Whether the caller must choose a new file name before saving.
    pub path_cleared: bool,
    /// User-facing note describing the upgrade, if any.
    pub message: Option<String>,
}

/// Upgrades a raw project document to the current format.
///
/// `source_path` is the file the document was read from; it is required to
/// keep a copy of projects whose modifiers are converted.
///
/// # Errors
/// - `NewerFormat` when the document was written by a newer format.
/// - `InvalidVersion` when the version marker cannot be parsed.
/// - `Corrupted` when the document is not a JSON object.
/// - `Malformed` when the migrated document does not fit the project model.
/// - Media analysis and backup failures from the corresponding steps.
pub fn migrate_document(
    document: Value,
    source_path: Option<&Path>,
    analyzer: &dyn MediaAnalyzer,
) -> ProjectResult<MigrationOutcome> {
    let Value::Object(doc) = document else {
        return Err(ProjectError::Corrupted(serde::de::Error::custom(
            "project root is not a JSON object",
        )));
    };

    let mut ctx = MigrationContext::new(doc, source_path, analyzer);
    for migration in MIGRATIONS {
        let was_changed = ctx.changed;
        (migration.apply)(&mut ctx)?;
        debug!(
            "event=migration_step module=project status=ok step={} changed={}",
            migration.name,
            ctx.changed && !was_changed
        );
    }

    let MigrationContext {
        doc,
        changed,
        message,
        path_cleared,
        ..
    } = ctx;
    let project: Project = serde_json::from_value(Value::Object(doc))
        .map_err(|err| ProjectError::Malformed(err.to_string()))?;

    Ok(MigrationOutcome {
        project,
        changed,
        path_cleared,
        message,
    })
}

/// Stores a numeric version marker (`4.0`) as its string form.
fn normalize_version_marker(ctx: &mut MigrationContext<'_>) -> ProjectResult<()> {
    if let Some(Value::Number(number)) = ctx.doc.get(VERSION_KEY) {
        let marker = Value::String(number.to_string());
        ctx.doc.insert(VERSION_KEY.to_string(), marker);
    }
    Ok(())
}

fn reject_newer_format(ctx: &mut MigrationContext<'_>) -> ProjectResult<()> {
    let Some(version) = ctx.version()? else {
        return Ok(());
    };
    let supported = FormatVersion::current();
    if version > supported {
        return Err(ProjectError::NewerFormat {
            found: version.to_string(),
            supported: supported.to_string(),
        });
    }
    Ok(())
}

/// Path of the copy kept before converting legacy modifiers.
///
/// `ants.boris` becomes `ants_old_version.boris`; other extensions are kept.
pub fn old_version_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match path.extension() {
        Some(ext) => format!("{stem}{OLD_VERSION_SUFFIX}.{}", ext.to_string_lossy()),
        None => format!("{stem}{OLD_VERSION_SUFFIX}"),
    };
    path.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::{migration_names, old_version_path};
    use std::path::{Path, PathBuf};

    #[test]
    fn old_version_path_inserts_suffix_before_extension() {
        assert_eq!(
            old_version_path(Path::new("/data/ants.boris")),
            PathBuf::from("/data/ants_old_version.boris")
        );
        assert_eq!(
            old_version_path(Path::new("/data/ants")),
            PathBuf::from("/data/ants_old_version")
        );
    }

    #[test]
    fn newer_format_check_runs_before_any_upgrade() {
        let names = migration_names();
        let reject = names
            .iter()
            .position(|name| *name == "reject_newer_format")
            .unwrap();
        let convert = names
            .iter()
            .position(|name| *name == "convert_unversioned")
            .unwrap();
        assert!(reject < convert);
        assert_eq!(names.last(), Some(&"backfill_media_info"));
    }
}
