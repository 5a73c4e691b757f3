//! Project file loading and schema migration entry points.
//!
//! # Responsibility
//! - Read a project file from disk and upgrade it to the current format.
//! - Analyse attached media files when the project lacks media metadata.
//! - Extract per-observation summaries used by reporting code.
//!
//! # Invariants
//! - Callers never see a document older than `PROJECT_FORMAT_VERSION`.
//! - Projects written by a newer format version are rejected, never downgraded.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod media;
pub mod migrations;
mod open;
mod subjects;

pub use open::{open_project, open_project_with, read_project_with, OpenedProject};
pub use subjects::extract_observed_subjects;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(Debug)]
pub enum ProjectError {
    /// Project path does not point to a regular file.
    NotFound(PathBuf),
    Io(std::io::Error),
    /// Project content is not a JSON object.
    Corrupted(serde_json::Error),
    /// Project was written by a newer format version.
    NewerFormat { found: String, supported: String },
    /// Version marker is present but cannot be parsed.
    InvalidVersion(String),
    /// Migrated document does not match the current project model.
    Malformed(String),
    /// Media analysis tool cannot be located.
    MediaToolMissing(String),
    /// Old-version copy of the project could not be written.
    Backup {
        path: PathBuf,
        source: std::io::Error,
    },
    ObservationNotFound(String),
}

impl Display for ProjectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "File {} not found", path.display()),
            Self::Io(err) => write!(f, "{err}"),
            Self::Corrupted(_) => write!(f, "This project file seems corrupted"),
            Self::NewerFormat { found, supported } => write!(
                f,
                "This project file was created with a more recent version of BORIS \
                 (project format {found}, supported {supported}). \
                 You must update BORIS to open it"
            ),
            Self::InvalidVersion(raw) => write!(f, "invalid project format version `{raw}`"),
            Self::Malformed(message) => write!(f, "invalid project document: {message}"),
            Self::MediaToolMissing(tool) => write!(f, "FFmpeg path not found ({tool})"),
            Self::Backup { path, source } => write!(
                f,
                "failed to save old project version to `{}`: {source}",
                path.display()
            ),
            Self::ObservationNotFound(id) => write!(f, "observation not found: {id}"),
        }
    }
}

impl Error for ProjectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Corrupted(err) => Some(err),
            Self::Backup { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ProjectError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
