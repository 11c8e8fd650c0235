use glam::{DVec2, DVec3};
use pirates_replay::*;

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-12,
        "expected {expected}, got {actual}"
    );
}

fn keyframe(time: f64) -> Keyframe {
    Keyframe {
        time,
        position: DVec2::new(3.0, 7.0),
        color: DVec3::new(10.0, 20.0, 30.0),
        size: 1.0,
        owner: Some(1),
        orientation: Order::North,
        game_id: Some(5),
        death_cause: None,
    }
}

fn track() -> AnimationTrack {
    let mut track = AnimationTrack::new(0, keyframe(0.0));
    track.fade(Channel::X, 11.0, 0.0, 4.0);
    track.fade(Channel::Size, 0.2, 1.0, 2.0);
    track
}

#[test]
fn test_exact_values_at_keyframe_times() {
    let track = track();
    for frame in track.keyframes() {
        let snapshot = track.interpolate(frame.time).unwrap();
        assert_eq!(snapshot.time, frame.time);
        assert_eq!(snapshot.x, frame.position.x);
        assert_eq!(snapshot.y, frame.position.y);
        assert_eq!(snapshot.size, frame.size);
        assert_eq!(snapshot.r, frame.color.x);
    }
    assert_eq!(track.interpolate(4.0).unwrap().x, 11.0);
    assert_eq!(track.interpolate(2.0).unwrap().size, 0.2);
}

#[test]
fn test_linear_between_keyframes() {
    let track = track();
    let frames = track.keyframes();
    for pair in frames.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        for t in [0.25, 0.5, 0.75] {
            let time = a.time + (b.time - a.time) * t;
            let snapshot = track.interpolate(time).unwrap();
            let amount = (time - a.time) / (b.time - a.time);
            assert_close(snapshot.x, a.position.x + (b.position.x - a.position.x) * amount);
            assert_close(snapshot.size, a.size + (b.size - a.size) * amount);
        }
    }
    assert_eq!(track.interpolate(0.5).unwrap().x, 4.0);
}

#[test]
fn test_value_held_after_last_keyframe() {
    let track = track();
    let snapshot = track.interpolate(100.0).unwrap();
    assert_eq!(snapshot.x, 11.0);
    assert_eq!(snapshot.size, 0.2);
    assert_eq!(snapshot.y, 7.0);
}

#[test]
fn test_not_alive_before_first_keyframe_or_after_death() {
    let mut track = track();
    assert!(track.interpolate(-0.01).is_none());
    track.kill(3.0);
    assert!(track.interpolate(2.999).is_some());
    assert!(track.interpolate(3.0).is_none());
    assert!(track.interpolate(7.0).is_none());
}

#[test]
fn test_discrete_attributes_are_not_interpolated() {
    let mut track = track();
    track.set_orientation_from(2.0, Order::East);
    track.set_owner_from(3.0, None);
    let snapshot = track.interpolate(1.999).unwrap();
    assert_eq!(snapshot.orientation, Order::North);
    assert_eq!(snapshot.owner, Some(1));
    assert_eq!(snapshot.game_id, Some(5));
    let snapshot = track.interpolate(2.5).unwrap();
    assert_eq!(snapshot.orientation, Order::East);
    assert_eq!(snapshot.owner, Some(1));
    assert_eq!(track.interpolate(3.5).unwrap().owner, None);
}

#[test]
fn test_overlapping_fades_are_independent() {
    let mut track = AnimationTrack::new(0, keyframe(0.0));
    track.fade(Channel::Red, 110.0, 0.0, 2.0);
    track.fade(Channel::Y, 9.0, 1.0, 3.0);
    let snapshot = track.interpolate(1.0).unwrap();
    assert_eq!(snapshot.r, 60.0);
    assert_eq!(snapshot.y, 7.0);
    let snapshot = track.interpolate(2.0).unwrap();
    assert_eq!(snapshot.r, 110.0);
    assert_eq!(snapshot.y, 8.0);
    let snapshot = track.interpolate(3.0).unwrap();
    assert_eq!((snapshot.r, snapshot.y), (110.0, 9.0));
    assert_eq!(snapshot.g, 20.0);
}

#[test]
fn test_snapshot_serialization() {
    let snapshot = track().interpolate(0.0).unwrap();
    let value = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(value["orientation"], "north");
    assert_eq!(value["owner"], 1);
    assert_eq!(value["x"], 3.0);
    assert!(value["death_cause"].is_null());
}
