use boris_core::model::project::{POINT_EVENT, STATE_EVENT};
use boris_core::{
    check_state_events_obs, event_type, extract_observed_subjects, Project, ProjectError,
    StateEventCheck, TimeFormat, UnpairedStateEvent,
};
use serde_json::{json, Value};

fn project_with(behaviors: Value, events: Value) -> Project {
    serde_json::from_value(json!({
        "project_format_version": "4.0",
        "coding_map": {},
        "behaviors_conf": behaviors,
        "subjects_conf": {
            "0": {"key": "a", "name": "ant", "description": ""},
            "1": {"key": "b", "name": "bee", "description": ""}
        },
        "observations": {
            "obs": {
                "type": "LIVE",
                "file": {"1": [], "2": []},
                "time offset second player": 0.0,
                "events": events
            },
            "other": {
                "type": "LIVE",
                "file": {"1": [], "2": []},
                "time offset second player": 0.0,
                "events": [[0.5, "wasp", "walk", "", ""]]
            }
        }
    }))
    .unwrap()
}

fn mixed_ethogram() -> Value {
    json!({
        "0": {"code": "walk", "type": "Point event", "category": "", "modifiers": {}},
        "1": {"code": "sleep", "type": "State event", "category": "", "modifiers": {}},
        "2": {"code": "groom", "type": "State event with coding map", "category": "", "modifiers": {}}
    })
}

#[test]
fn event_type_looks_up_behavior_by_code() {
    let project = project_with(mixed_ethogram(), json!([]));

    assert_eq!(event_type("sleep", &project.ethogram), Some(STATE_EVENT));
    assert_eq!(event_type("walk", &project.ethogram), Some(POINT_EVENT));
    assert_eq!(event_type("fly", &project.ethogram), None);
}

#[test]
fn point_only_ethogram_needs_no_pairing() {
    let behaviors = json!({
        "0": {"code": "walk", "type": "Point event", "category": "", "modifiers": {}}
    });
    let project = project_with(behaviors, json!([[1.0, "ant", "walk", "", ""]]));

    let check = check_state_events_obs(&project, "obs").unwrap();
    assert_eq!(check, StateEventCheck::NoStateBehaviors);
    assert_eq!(
        check.summary(TimeFormat::Seconds),
        (true, "No behavior is defined as `State event`".to_string())
    );
}

#[test]
fn empty_ethogram_needs_no_pairing() {
    let project = project_with(json!({}), json!([]));
    let check = check_state_events_obs(&project, "obs").unwrap();
    assert_eq!(check, StateEventCheck::NoStateBehaviors);
}

#[test]
fn balanced_state_events_are_paired() {
    let events = json!([
        [1.0, "ant", "sleep", "", ""],
        [2.0, "ant", "walk", "", ""],
        [5.0, "ant", "sleep", "", ""],
        [6.0, "bee", "groom", "left", ""],
        [7.0, "bee", "groom", "right", ""],
        [8.0, "bee", "groom", "left", ""],
        [9.0, "bee", "groom", "right", ""]
    ]);
    let project = project_with(mixed_ethogram(), events);

    let check = check_state_events_obs(&project, "obs").unwrap();
    assert_eq!(check, StateEventCheck::Paired);
    assert!(check.is_ok());
    assert_eq!(check.message(TimeFormat::Seconds), "All state events are PAIRED");
}

#[test]
fn odd_occurrences_are_reported_per_subject_and_modifier() {
    let events = json!([
        [1.0, "bee", "sleep", "", ""],
        [2.0, "ant", "sleep", "", ""],
        [3.0, "ant", "sleep", "", ""],
        [4.0, "ant", "sleep", "", ""],
        [10.0, "bee", "groom", "left", ""],
        [11.0, "bee", "groom", "right", ""],
        [12.0, "bee", "groom", "right", ""],
        [75.25, "", "sleep", "", ""]
    ]);
    let project = project_with(mixed_ethogram(), events);

    let check = check_state_events_obs(&project, "obs").unwrap();
    let StateEventCheck::Unpaired(unpaired) = &check else {
        panic!("expected unpaired events, got {check:?}");
    };

    let described: Vec<(&str, &str, &str, f64)> = unpaired
        .iter()
        .map(|event| {
            (
                event.subject.as_str(),
                event.behavior.as_str(),
                event.modifier.as_str(),
                event.time,
            )
        })
        .collect();
    assert_eq!(
        described,
        vec![
            ("", "sleep", "", 75.25),
            ("ant", "sleep", "", 4.0),
            ("bee", "groom", "left", 10.0),
            ("bee", "sleep", "", 1.0),
        ]
    );

    let (ok, message) = check.summary(TimeFormat::HhMmSs);
    assert!(!ok);
    let lines: Vec<&str> = message.lines().collect();
    assert_eq!(
        lines,
        vec![
            "The behavior sleep is not PAIRED for subject \"No focal subject\" at 00:01:15.250",
            "The behavior sleep is not PAIRED for subject \"ant\" at 00:00:04.000",
            "The behavior groom (modifier left) is not PAIRED for subject \"bee\" at 00:00:10.000",
            "The behavior sleep is not PAIRED for subject \"bee\" at 00:00:01.000",
        ]
    );
}

#[test]
fn unknown_behavior_stops_the_check() {
    let events = json!([
        [1.0, "ant", "sleep", "", ""],
        [2.0, "bee", "fly", "", ""]
    ]);
    let project = project_with(mixed_ethogram(), events);

    let check = check_state_events_obs(&project, "obs").unwrap();
    assert_eq!(check, StateEventCheck::UnknownBehavior("fly".to_string()));
    assert_eq!(
        check.summary(TimeFormat::Seconds),
        (false, "The behaviour fly not found in the ethogram.".to_string())
    );
}

#[test]
fn unknown_observation_is_an_error() {
    let project = project_with(mixed_ethogram(), json!([]));
    let err = check_state_events_obs(&project, "missing").unwrap_err();
    assert!(matches!(err, ProjectError::ObservationNotFound(id) if id == "missing"));
}

#[test]
fn seconds_format_is_used_in_reports() {
    let event = UnpairedStateEvent {
        subject: "ant".to_string(),
        behavior: "sleep".to_string(),
        modifier: String::new(),
        time: 4.0,
    };
    let check = StateEventCheck::Unpaired(vec![event]);
    assert_eq!(
        check.message(TimeFormat::Seconds),
        "The behavior sleep is not PAIRED for subject \"ant\" at 4.000"
    );
}

#[test]
fn observed_subjects_are_unique_across_selected_observations() {
    let events = json!([
        [1.0, "ant", "walk", "", ""],
        [2.0, "bee", "walk", "", ""],
        [3.0, "ant", "walk", "", ""],
        [4.0, "", "walk", "", ""]
    ]);
    let project = project_with(mixed_ethogram(), events);

    let subjects = extract_observed_subjects(&project, &["obs"]);
    assert_eq!(
        subjects.into_iter().collect::<Vec<_>>(),
        vec!["".to_string(), "ant".to_string(), "bee".to_string()]
    );

    let both = extract_observed_subjects(&project, &["obs", "other", "unknown"]);
    assert!(both.contains("wasp"));
    assert_eq!(both.len(), 4);

    let none = extract_observed_subjects::<&str>(&project, &[]);
    assert!(none.is_empty());
}
