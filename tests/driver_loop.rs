//! Full steward runs over the recorded single-zone race

use drs_steward::config::{AppSettings, RuleConfig};
use drs_steward::{ReplayProvider, SessionContext, SessionRecording, Steward, StewardError, ZoneRegistry};
use futures::StreamExt;
use std::path::PathBuf;

fn test_data() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test-data")
}

fn rules() -> RuleConfig {
    RuleConfig { drs_activation_gap: 1.0, drs_enabled_lap: 1, ..Default::default() }
}

fn settings() -> AppSettings {
    AppSettings { tick_rate_hz: 0, ..Default::default() }
}

#[tokio::test]
async fn replay_issues_penalty_for_lone_car() {
    let connection = Steward::open_replay(
        test_data().join("single_zone_race.yaml"),
        rules(),
        settings(),
        &test_data().join("tracks"),
    )
    .await
    .unwrap();

    let state = connection.stopped().await;
    assert_eq!(state.pending_penalties, 1);
    assert!(!state.in_zone);
    assert!(connection.is_stopped());
}

#[tokio::test]
async fn subscribers_see_the_penalty_and_the_stream_ends() {
    let recording = SessionRecording::load(test_data().join("single_zone_race.yaml")).unwrap();
    let zones = ZoneRegistry::load(&test_data().join("tracks"), &recording.track.name, None);
    assert_eq!(zones.len(), 1);

    let context = SessionContext::new(rules(), settings(), zones, recording.track.clone());
    let car = recording.car.clone();
    let connection = Steward::start(context, &car, ReplayProvider::new(recording)).unwrap();

    let signals: Vec<_> = connection.subscribe().collect().await;
    let details: Vec<_> = signals
        .iter()
        .filter_map(|s| match s {
            drs_steward::Signal::PenaltyIssued(p) => Some(p.detail.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(details, vec!["Illegal DRS use, Zone 1"]);
}

#[tokio::test]
async fn server_chat_marks_race_finished() {
    let connection = Steward::open_replay(
        test_data().join("single_zone_race.yaml"),
        rules(),
        settings(),
        &test_data().join("tracks"),
    )
    .await
    .unwrap();

    connection.send_chat("SERVER", "You have finished the race").await.unwrap();

    let state = connection.stopped().await;
    assert!(state.finished_flag);
    assert!(state.race_ended);
}

#[tokio::test]
async fn car_outside_allow_list_is_refused() {
    let settings = AppSettings { allowed_cars: vec!["af1_2022".into()], ..settings() };
    let result = Steward::open_replay(
        test_data().join("single_zone_race.yaml"),
        rules(),
        settings,
        &test_data().join("tracks"),
    )
    .await;

    match result {
        Err(StewardError::CarNotAllowed { car }) => assert_eq!(car, "test_car"),
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("car should have been refused"),
    }
}

#[tokio::test]
async fn commands_after_shutdown_fail() {
    let connection = Steward::open_replay(
        test_data().join("single_zone_race.yaml"),
        rules(),
        settings(),
        &test_data().join("tracks"),
    )
    .await
    .unwrap();

    connection.shutdown();
    connection.stopped().await;

    assert!(matches!(connection.race_finished().await, Err(StewardError::Stopped)));
}
