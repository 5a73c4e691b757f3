use crate::model::project::Project;
use std::collections::BTreeSet;

/// Returns the unique subjects coded in the selected observations.
///
/// Unknown observation ids are ignored. Events without a focal subject
/// contribute an empty string.
pub fn extract_observed_subjects<S: AsRef<str>>(
    project: &Project,
    selected_observations: &[S],
) -> BTreeSet<String> {
    selected_observations
        .iter()
        .filter_map(|id| project.observation(id.as_ref()))
        .flat_map(|observation| observation.events.iter())
        .map(|event| event.subject.clone())
        .collect()
}
