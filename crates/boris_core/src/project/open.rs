//! Project file loading.
//!
//! # Responsibility
//! - Read a project file and hand the raw document to the migration executor.
//! - Emit `project_open` logging events with duration and status.

use super::media::{FfprobeAnalyzer, MediaAnalyzer};
use super::migrations::migrate_document;
use super::{ProjectError, ProjectResult};
use crate::config::CoreConfig;
use crate::model::project::Project;
use log::{error, info};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Project loaded from disk and upgraded to the current format.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenedProject {
    /// Path to save back to; `None` when the caller must pick a new file name.
    pub path: Option<PathBuf>,
    /// Whether the in-memory project differs from the file content.
    pub changed: bool,
    pub project: Project,
    /// User-facing note describing what the upgrade did, if anything.
    pub message: Option<String>,
}

/// Opens a project file using `ffprobe` configured from the environment.
pub fn open_project(path: impl AsRef<Path>) -> ProjectResult<OpenedProject> {
    let analyzer = FfprobeAnalyzer::new(&CoreConfig::from_env());
    open_project_with(path, &analyzer)
}

/// Opens a project file, analysing media with `analyzer`.
///
/// # Errors
/// - `NotFound` when `path` is not a regular file.
/// - `Corrupted` when the file is not a JSON object.
/// - Any migration error (see `migrate_document`).
pub fn open_project_with(
    path: impl AsRef<Path>,
    analyzer: &dyn MediaAnalyzer,
) -> ProjectResult<OpenedProject> {
    let path = path.as_ref();
    let started_at = Instant::now();
    info!(
        "event=project_open module=project status=start path={}",
        path.display()
    );

    match load_and_migrate(path, analyzer) {
        Ok(opened) => {
            info!(
                "event=project_open module=project status=ok duration_ms={} changed={} observations={}",
                started_at.elapsed().as_millis(),
                opened.changed,
                opened.project.observations.len()
            );
            Ok(opened)
        }
        Err(err) => {
            error!(
                "event=project_open module=project status=error duration_ms={} error_code={} error={}",
                started_at.elapsed().as_millis(),
                error_code(&err),
                err
            );
            Err(err)
        }
    }
}

/// Loads and upgrades a project without writing anything next to it.
///
/// Unlike `open_project_with`, no `_old_version` copy is kept when legacy
/// modifiers are converted. Used by inspection commands.
///
/// # Errors
/// Same as `open_project_with`, minus backup failures.
pub fn read_project_with(
    path: impl AsRef<Path>,
    analyzer: &dyn MediaAnalyzer,
) -> ProjectResult<Project> {
    let path = path.as_ref();
    let started_at = Instant::now();

    let result = read_document(path)
        .and_then(|document| migrate_document(document, None, analyzer))
        .map(|outcome| outcome.project);
    match &result {
        Ok(project) => info!(
            "event=project_read module=project status=ok duration_ms={} observations={}",
            started_at.elapsed().as_millis(),
            project.observations.len()
        ),
        Err(err) => error!(
            "event=project_read module=project status=error duration_ms={} error_code={} error={}",
            started_at.elapsed().as_millis(),
            error_code(err),
            err
        ),
    }
    result
}

fn read_document(path: &Path) -> ProjectResult<Value> {
    if !path.is_file() {
        return Err(ProjectError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(ProjectError::Corrupted)
}

fn load_and_migrate(path: &Path, analyzer: &dyn MediaAnalyzer) -> ProjectResult<OpenedProject> {
    let document = read_document(path)?;
    let outcome = migrate_document(document, Some(path), analyzer)?;

    Ok(OpenedProject {
        path: (!outcome.path_cleared).then(|| path.to_path_buf()),
        changed: outcome.changed,
        project: outcome.project,
        message: outcome.message,
    })
}

fn error_code(err: &ProjectError) -> &'static str {
    match err {
        ProjectError::NotFound(_) => "project_not_found",
        ProjectError::Io(_) => "project_read_failed",
        ProjectError::Corrupted(_) => "project_corrupted",
        ProjectError::NewerFormat { .. } => "project_format_newer",
        ProjectError::InvalidVersion(_) => "project_version_invalid",
        ProjectError::Malformed(_) => "project_malformed",
        ProjectError::MediaToolMissing(_) => "media_tool_missing",
        ProjectError::Backup { .. } => "project_backup_failed",
        ProjectError::ObservationNotFound(_) => "observation_not_found",
    }
}
