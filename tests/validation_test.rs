use pirates_replay::*;
use serde_json::{json, Value};

fn document(pirates: Value, scores: Value) -> Value {
    json!({
        "revision": 3,
        "players": 2,
        "map": {"rows": 2, "cols": 3, "data": ["...", "..."]},
        "pirates": pirates,
        "scores": scores,
    })
}

fn validate(document: Value) -> ReplayResult<ReplayDocument> {
    SchemaValidator::new(false).validate(document)
}

#[test]
fn test_activation_equal_to_end() {
    let error = validate(document(json!([[0, 0, 2, 2, 0, []]]), json!([[0], [0]]))).unwrap_err();
    assert_eq!(
        error.variant,
        ReplayErrorVariant::OutOfRangeIndex {
            field: "replaydata.pirates.0.3".to_string(),
            value: 2,
            min: 3,
            max: None,
        }
    );
}

#[test]
fn test_entity_position_must_be_on_the_map() {
    let error = validate(document(json!([[2, 0, 0, 1, 0, ["-"]]]), json!([[0], [0]]))).unwrap_err();
    assert!(matches!(
        error.variant,
        ReplayErrorVariant::OutOfRangeIndex { ref field, value: 2, max: Some(1), .. }
            if field == "replaydata.pirates.0.0"
    ));
}

#[test]
fn test_zero_length_map_row() {
    let mut value = document(json!([]), json!([[0], [0]]));
    value["map"] = json!({"data": [""]});
    let error = validate(value).unwrap_err();
    assert!(matches!(
        error.variant,
        ReplayErrorVariant::MalformedField { ref field, .. } if field == "replaydata.map.data.0"
    ));
}

#[test]
fn test_differing_map_row_lengths() {
    let mut value = document(json!([]), json!([[0], [0]]));
    value["map"] = json!({"data": ["...", "...."]});
    let error = validate(value).unwrap_err();
    assert_eq!(
        error.variant,
        ReplayErrorVariant::InconsistentMapWidth {
            row: 1,
            expected: 3,
            found: 4
        }
    );
}

#[test]
fn test_missing_map_is_fatal_even_when_tolerant() {
    let mut value = document(json!([]), json!([[0], [0]]));
    value["map"] = json!({"data": []});
    assert!(SchemaValidator::new(true).validate(value).is_err());
}

#[test]
fn test_player_count_is_fatal_even_when_tolerant() {
    let mut value = document(json!([]), json!([]));
    value["players"] = json!(0);
    let error = SchemaValidator::new(true).validate(value).unwrap_err();
    assert!(matches!(
        error.variant,
        ReplayErrorVariant::OutOfRangeIndex { ref field, value: 0, .. }
            if field == "replaydata.players"
    ));
}

#[test]
fn test_tolerant_mode_records_issues() {
    let value = document(
        json!([[0, 7, 0, 2, 0, ["-", "-"]], [1, 1, 0, 2, 1, ["-", "-"]]]),
        json!([[0, 0, 0], [0, 0, 0]]),
    );
    assert!(validate(value.clone()).is_err());
    let document = SchemaValidator::new(true).validate(value).unwrap();
    assert_eq!(document.issues.len(), 1);
    assert!(matches!(
        document.issues[0].variant,
        ReplayErrorVariant::OutOfRangeIndex { value: 7, .. }
    ));
    assert_eq!(document.entities.len(), 2);
    assert_eq!(document.duration, 2);
}

#[test]
fn test_unreadable_record_keeps_its_id() {
    let value = document(
        json!([[0, "x", 0, 1, 0, ["-"]], [0, 2, 0, 1, 0, ["-"]]]),
        json!([[0, 0], [0, 0]]),
    );
    let document = SchemaValidator::new(true).validate(value.clone()).unwrap();
    assert_eq!(document.issues.len(), 1);
    assert_eq!(document.entities.len(), 2);
    assert!(document.entity(0).is_none());
    assert_eq!(document.entity(1).unwrap().col, 2);

    let mut replay =
        Replay::from_source(ReplaySource::Structured(value), &ReplayOptions::new(true, None))
            .unwrap();
    assert_eq!(&*replay.get_turn(0).unwrap(), &[1]);
    assert!(replay.track(0).is_none());
    assert_eq!(replay.interpolate(1, 0.0).unwrap().x, 2.0);
}

#[test]
fn test_turn_arithmetic_does_not_overflow() {
    let value = document(json!([[0, 0, i64::MAX, 5, 0, []]]), json!([[0], [0]]));
    let error = validate(value).unwrap_err();
    assert_eq!(
        error.variant,
        ReplayErrorVariant::OutOfRangeIndex {
            field: "replaydata.pirates.0.3".to_string(),
            value: 5,
            min: i64::MAX,
            max: None,
        }
    );

    for debug in [false, true] {
        let value = document(json!([[0, 0, i64::MAX, i64::MAX, 0, []]]), json!([[0], [0]]));
        let error = SchemaValidator::new(debug).validate(value).unwrap_err();
        assert!(matches!(
            error.variant,
            ReplayErrorVariant::OutOfRangeIndex { ref field, max: Some(max), .. }
                if field == "replaydata.pirates.0" && max == MAX_DURATION as i64
        ));
    }
}

#[test]
fn test_duration_limit() {
    let value = document(json!([[0, 0, 0, 1i64 << 62]]), json!([[0, 1], [0, 1]]));
    let error = validate(value).unwrap_err();
    assert_eq!(
        error.variant,
        ReplayErrorVariant::OutOfRangeIndex {
            field: "replaydata.pirates.0".to_string(),
            value: (1i64 << 62) - 1,
            min: 0,
            max: Some(MAX_DURATION as i64),
        }
    );

    let over = MAX_DURATION as i64 + 2;
    let value = document(json!([[0, 0, 0, over]]), json!([[0], [0]]));
    assert!(validate(value).is_err());
    let value = document(json!([[0, 0, 0, over - 1]]), json!([[0], [0]]));
    assert_eq!(validate(value).unwrap().duration, MAX_DURATION);
}

#[test]
fn test_map_dimensions_are_measured() {
    let mut value = document(json!([]), json!([[0], [0]]));
    value["map"] = json!({"rows": 2, "cols": 1_000_000_000_000u64, "data": ["..%", "..."]});
    assert!(validate(value.clone()).is_err());
    let document = SchemaValidator::new(true).validate(value).unwrap();
    assert_eq!(document.issues.len(), 1);
    assert_eq!((document.rows, document.cols), (2, 3));
    assert_eq!(document.walls.dim(), (2, 3));
    assert!(document.is_wall(0, 2));

    let mut value = crate::document(json!([]), json!([[0], [0]]));
    value["map"] = json!({"data": [".".repeat(MAX_MAP_CELLS + 1)]});
    let error = SchemaValidator::new(true).validate(value).unwrap_err();
    assert!(matches!(
        error.variant,
        ReplayErrorVariant::OutOfRangeIndex { ref field, .. } if field == "replaydata.map.data"
    ));
}

fn lifespan_records() -> Vec<Value> {
    vec![
        // Alive at the end of the replay, so its lifespan fixes the duration.
        json!([0, 0, 0, 5, 0, ["-", "-", "-", "-"]]),
        json!([0, 1, 1, 3, 0, ["-", "-"]]),
        json!([1, 0, 0, 2, 1, ["n", "s"]]),
        json!([1, 2, 2, 4, 1, ["w", "e"]]),
    ]
}

#[test]
fn test_duration_is_independent_of_record_order() {
    let scores = json!([[0, 1, 2, 3, 4], [0, 0, 0, 0, 0]]);
    let mut records = lifespan_records();
    for _ in 0..records.len() {
        records.rotate_left(1);
        let document = validate(document(Value::Array(records.clone()), scores.clone())).unwrap();
        assert_eq!(document.duration, 4);
        let mut reversed = records.clone();
        reversed.reverse();
        let document = validate(document_value(reversed, scores.clone())).unwrap();
        assert_eq!(document.duration, 4);
    }
}

fn document_value(records: Vec<Value>, scores: Value) -> Value {
    document(Value::Array(records), scores)
}

#[test]
fn test_fixed_lifespan_conflict_regardless_of_order() {
    // Scores reach turn 6 while an entity alive at the end only lasts to turn 4.
    let scores = json!([[0, 0, 0, 0, 0, 0, 0], [0]]);
    let mut records = lifespan_records();
    for _ in 0..records.len() {
        records.rotate_left(1);
        let error = validate(document_value(records.clone(), scores.clone())).unwrap_err();
        assert!(matches!(
            error.variant,
            ReplayErrorVariant::DurationConflict { duration: 6, declared: 4, .. }
        ));
    }
    let document = SchemaValidator::new(true)
        .validate(document_value(records, scores))
        .unwrap();
    assert_eq!(document.duration, 6);
    assert_eq!(document.issues.len(), 1);
}

#[test]
fn test_disagreeing_maxima_without_fixed_declarations() {
    let document = validate(document(
        json!([
            [0, 0, 0, 3, 0, ["-", "-", "-"]],
            [0, 1, 0, 8, 1, ["-", "-", "-", "-", "-", "-", "-", "-"]],
        ]),
        json!([[0, 1], [0, 1, 2, 3, 4]]),
    ))
    .unwrap();
    assert_eq!(document.duration, 7);
    assert!(document.issues.is_empty());
    // Short score histories hold their final value.
    assert_eq!(document.score_at(7, 0), Some(1.0));
    assert_eq!(document.score_at(7, 1), Some(4.0));
    assert_eq!(document.leader_at(7), Some(1));
    assert_eq!(document.leader_at(0), Some(0));
}

#[test]
fn test_live_counts_per_player() {
    let document = validate(document(
        json!([
            [0, 0, 0, 2, 0, ["-", "-"]],
            [0, 1, 1, 3, 0, ["-", "-"]],
            [1, 1, 0, 3, 1, ["-", "-", "-"]],
        ]),
        json!([[0, 0, 0], [0, 0, 0]]),
    ))
    .unwrap();
    assert_eq!(document.live_count(0, 0), Some(1));
    assert_eq!(document.live_count(1, 0), Some(2));
    assert_eq!(document.live_count(2, 0), Some(1));
    assert_eq!(document.live_count(2, 1), Some(1));
    assert_eq!(document.live_count(3, 1), None);
}

#[test]
fn test_treasure_records_pass_through() {
    let mut value = document(json!([]), json!([[0, 0, 0], [0, 0, 0]]));
    let treasure = json!([4, [1, 2], 1, "010"]);
    value["treasures"] = json!([treasure.clone()]);
    value["powerups"] = json!([["robpowerup", 0, [0, 1], 0, 2]]);
    let document = validate(value).unwrap();
    assert_eq!(document.treasures, vec![treasure]);
    assert_eq!(document.powerups.len(), 1);
    assert_eq!(document.treasure_available(0, 0), Some(false));
    assert_eq!(document.treasure_available(0, 1), Some(true));
    assert_eq!(document.treasure_available(0, 3), None);
    assert!(document.scripts.is_empty());
}

#[test]
fn test_revision_three_histories() {
    let document = validate(document(
        json!([[
            0, 0, 0, 2, 0, ["a", "d"], 12, "", "01", [0, 1], [1, 0], "00", [5, 5], "00", "10"
        ]]),
        json!([[0, 0, 0], [0, 0, 0]]),
    ))
    .unwrap();
    let entity = document.entity(0).unwrap();
    assert_eq!(entity.game_id, Some(12));
    assert_eq!(entity.death_cause.as_deref(), Some(""));
    assert_eq!(entity.histories.treasure.as_deref(), Some("01"));
    assert_eq!(entity.histories.attack, Some(json!([0, 1])));
    assert_eq!(entity.histories.speed_powerup.as_deref(), Some("10"));
}

#[test]
fn test_revision_two_layout() {
    let document = validate(json!({
        "revision": 2,
        "players": 2,
        "map": {"data": ["a..", "..b"]},
        "pirates": [[0, 0, 0, 2, 4, 1, ["n", "-"]], [1, 1, 1, 3]],
        "treasures": [[1]],
        "scores": [[0, 1, 2, 3], [0, 0, 0, 0]],
    }))
    .unwrap();
    assert_eq!(document.duration, 3);
    let converted = document.entity(0).unwrap();
    assert_eq!(converted.conversion, Some(2));
    assert_eq!(converted.end, Some(4));
    assert_eq!(converted.spawn_owner(), None);
    assert_eq!(converted.actions_at(2), Some("n"));
    let unowned = document.entity(1).unwrap();
    assert_eq!(unowned.owner, None);
    assert_eq!(unowned.death_turn(), 3);
    // Revision 2 has no separate pickup collections.
    assert!(document.treasures.is_empty());
}

#[test]
fn test_revision_two_map_alphabet() {
    let error = validate(json!({
        "revision": 2,
        "players": 1,
        "map": {"data": [".A"]},
        "pirates": [],
        "scores": [[0]],
    }))
    .unwrap_err();
    assert_eq!(
        error.variant,
        ReplayErrorVariant::InvalidMapCharacter {
            character: 'A',
            row: 0,
            col: 1
        }
    );
}

#[test]
fn test_orders_as_single_string() {
    let document = validate(document(json!([[0, 0, 0, 3, 0, "ens"]]), json!([[0], [0]]))).unwrap();
    assert_eq!(
        document.entity(0).unwrap().orders,
        Some(vec!["e".to_string(), "n".to_string(), "s".to_string()])
    );
    assert_eq!(document.duration, 2);
}

#[test]
fn test_unknown_keys_are_kept() {
    let mut value = document(json!([]), json!([[0], [0]]));
    value["cutoff"] = json!("extermination");
    value["attack_radius2"] = json!(5);
    let document = validate(value).unwrap();
    assert_eq!(document.extras.get("cutoff"), Some(&json!("extermination")));
    assert_eq!(document.extras.get("attack_radius2"), Some(&json!(5)));
    assert!(!document.extras.contains_key("pirates"));
}
