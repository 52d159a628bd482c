//! End-to-end race through the public API

use stage_rally::sim::{ControlInput, GameEvent, RaceStatus, StateSnapshot, Track};
use stage_rally::sync::{SnapshotBuffer, snapshot_feed};
use stage_rally::{ClientSession, ConfigError, Settings, TrackError};

const DRAG_STRIP: &str = r#"{
    "segments": [
        { "start": { "x": 0, "y": 0, "width": 100 }, "end": { "x": 600, "y": 0, "width": 100 } }
    ],
    "checkpoints": [
        { "position": [200, 0], "angle": 0.0, "width": 100, "index": 0 },
        { "position": [400, 0], "angle": 0.0, "width": 100, "index": 1 },
        { "position": [600, 0], "angle": 0.0, "width": 100, "index": 2 }
    ],
    "start_position": [0, 0], "start_heading": 0.0,
    "finish_position": [600, 0], "finish_heading": 0.0,
    "containment": {
        "left_points": [[-100, -150], [800, -150]],
        "right_points": [[-100, 150], [800, 150]]
    }
}"#;

fn flat_out() -> ControlInput {
    ControlInput {
        accelerate: true,
        ..Default::default()
    }
}

#[test]
fn drag_race_to_the_flag() {
    let track = Track::from_json_str(DRAG_STRIP).unwrap();
    let mut session = ClientSession::new(track, Settings::default());
    session.state.add_player("a").unwrap();
    session.state.add_player("b").unwrap();
    session.state.start_race().unwrap();

    let mut events = Vec::new();
    let mut last_view = None;
    let mut now = 0.0;
    while now < 20_000.0 && session.state.status() != RaceStatus::Finished {
        session.set_input("a", flat_out());
        session.set_input("b", flat_out());
        last_view = session.frame(now);
        events.extend(session.take_events());
        now += 1000.0 / 60.0;
    }
    assert_eq!(session.state.status(), RaceStatus::Finished);

    let checkpoints: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            GameEvent::Checkpoint(cp) if cp.player_id == "a" => Some(cp.checkpoint_index),
            _ => None,
        })
        .collect();
    assert_eq!(checkpoints, vec![0, 1, 2]);

    let results = events
        .iter()
        .find_map(|e| match e {
            GameEvent::RaceEnded { results } => Some(results.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| !r.dnf));
    assert_eq!(results[0].position, Some(1));
    assert_eq!(results[0].points, 25);
    assert_eq!(results[1].points, 18);
    assert!(results[0].finish_time <= results[1].finish_time);

    let splits = &session.state.player("a").unwrap().progress.split_times;
    assert_eq!(splits.len(), 3);
    assert!(splits.windows(2).all(|w| w[0] < w[1]));

    // Presentation trails the simulation but never runs ahead of it
    let view = last_view.unwrap();
    assert!(view.tick <= session.state.tick);

    session.teardown();
    assert!(session.buffer.is_empty());
}

#[test]
fn snapshots_survive_the_wire() {
    let track = Track::from_json_str(DRAG_STRIP).unwrap();
    let mut session = ClientSession::new(track, Settings::default());
    session.state.add_player("a").unwrap();
    session.state.start_race().unwrap();

    let (tx, feed) = snapshot_feed();
    let mut remote = SnapshotBuffer::from_config(&Settings::default().game);
    let mut now = 0.0;
    for _ in 0..30 {
        session.frame(now);
        let json = session.state.snapshot().to_json().unwrap();
        tx.send(now, StateSnapshot::from_json(&json).unwrap());
        now += 50.0;
    }
    feed.drain_into(&mut remote);
    assert_eq!(remote.len(), 30);
    let shown = remote.sample(now).unwrap();
    assert_eq!(shown.status(), RaceStatus::Countdown);
    assert!(shown.player("a").is_some());
}

#[test]
fn bundled_stage_loads() {
    let track = Track::from_json_str(include_str!("../demos/sample_stage.json")).unwrap();
    assert_eq!(track.total_checkpoints(), 4);
    assert!(track.total_length > 2000.0);
    assert!(track.is_on_track(track.start_position));
    assert!(track.boundary_edges().count() > 10);
}

#[test]
fn bad_inputs_are_reported_not_fatal() {
    assert!(matches!(Settings::from_json_str("{ nope"), Err(ConfigError::Parse(_))));
    assert!(matches!(
        Track::from_json_str(r#"{ "segments": [], "checkpoints": [],
            "start_position": [0, 0], "start_heading": 0,
            "finish_position": [0, 0], "finish_heading": 0 }"#),
        Err(TrackError::NoSegments)
    ));
}
