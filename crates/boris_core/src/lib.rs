//! Core project logic for BORIS observation projects.
//! Loads project files, upgrades older formats and checks coded events.

pub mod config;
pub mod logging;
pub mod model;
pub mod project;
pub mod validation;

pub use config::CoreConfig;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::event::{Event, TimeFormat, NO_FOCAL_SUBJECT};
pub use model::project::{Behavior, MediaInfo, ModifierSet, Observation, Project, Subject};
pub use model::version::{FormatVersion, PROJECT_FORMAT_VERSION};
pub use project::media::{FfprobeAnalyzer, MediaAnalyzer, MediaMetadata};
pub use project::migrations::{migrate_document, MigrationOutcome};
pub use project::{
    extract_observed_subjects, open_project, open_project_with, read_project_with, OpenedProject,
    ProjectError, ProjectResult,
};
pub use validation::state_events::{
    check_state_events_obs, event_type, StateEventCheck, UnpairedStateEvent,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, PROJECT_FORMAT_VERSION};

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
        assert!(!PROJECT_FORMAT_VERSION.is_empty());
    }
}
