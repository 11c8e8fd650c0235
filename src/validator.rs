use log::{debug, warn};
use ndarray::Array2;
use serde_json::{Map, Value};

use crate::*;

/// Accumulates the lifespan declarations found in a replay and resolves them
/// into the replay's duration.
///
/// The duration is the maximum over all declarations. A fixed declaration is
/// one that must equal the duration exactly; every fixed declaration is
/// compared against the final maximum, so the result does not depend on the
/// order in which records were visited.
#[derive(Debug, Default, Clone)]
pub struct DurationTracker {
    maximum: Option<(usize, String)>,
    fixed: Vec<(usize, String)>,
}

impl DurationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_lifespan(&mut self, turn: usize, is_fixed: bool, source: &str) {
        if is_fixed {
            self.fixed.push((turn, source.to_string()));
        }
        match &self.maximum {
            Some((maximum, _)) if *maximum >= turn => {}
            _ => self.maximum = Some((turn, source.to_string())),
        }
    }

    pub fn duration(&self) -> usize {
        self.maximum.as_ref().map_or(0, |(maximum, _)| *maximum)
    }

    /// Field that declared the maximum.
    pub fn established_by(&self) -> Option<&str> {
        self.maximum.as_ref().map(|(_, source)| source.as_str())
    }

    /// Fixed declarations that disagree with the maximum.
    pub fn conflicts(&self) -> Vec<ReplayErrorVariant> {
        let Some((duration, established_by)) = &self.maximum else {
            return Vec::new();
        };
        self.fixed
            .iter()
            .filter(|(declared, _)| declared != duration)
            .map(|(declared, source)| ReplayErrorVariant::DurationConflict {
                duration: *duration,
                established_by: established_by.clone(),
                declared: *declared,
                source_field: source.clone(),
            })
            .collect()
    }
}

static KNOWN_KEYS: [&str; 14] = [
    "revision",
    "players",
    "map",
    "pirates",
    "treasures",
    "powerups",
    "scripts",
    "anti_scripts",
    "bermuda_zones",
    "zones",
    "rejected",
    "scores",
    "bonus",
    "replaydata",
];

static EMPTY: Vec<Value> = Vec::new();

/// Checks a canonical replay document and builds the typed
/// [`ReplayDocument`] from it.
///
/// In tolerant mode (`debug`), range, length and type violations are logged
/// and collected in [`ReplayDocument::issues`] instead of aborting. The
/// revision and player count, the presence of the map rows, and the
/// [`MAX_DURATION`] and [`MAX_MAP_CELLS`] limits are always enforced.
#[derive(Debug)]
pub struct SchemaValidator {
    debug: bool,
    stack: Vec<String>,
    issues: Vec<ValidationIssue>,
    durations: DurationTracker,
}

impl SchemaValidator {
    pub fn new(debug: bool) -> Self {
        Self {
            debug,
            stack: vec!["replaydata".to_string()],
            issues: Vec::new(),
            durations: DurationTracker::new(),
        }
    }

    fn path(&self, key: &str) -> String {
        let mut path = self.stack.join(".");
        path.push('.');
        path.push_str(key);
        path
    }

    fn report(&mut self, variant: ReplayErrorVariant) -> ReplayResult<()> {
        if self.debug {
            warn!("Ignoring replay validation error: {variant}");
            self.issues.push(ValidationIssue::new(variant));
            Ok(())
        } else {
            ReplayError::new_result(variant)
        }
    }

    fn malformed(
        &self,
        key: &str,
        reason: String,
        value: Option<&Value>,
    ) -> ReplayErrorVariant {
        ReplayErrorVariant::MalformedField {
            field: self.path(key),
            reason,
            text: value.map_or_else(|| "undefined".to_string(), Value::to_string),
        }
    }

    fn range_variant(
        &self,
        key: &str,
        value: i64,
        min: i64,
        max: Option<i64>,
    ) -> ReplayErrorVariant {
        ReplayErrorVariant::OutOfRangeIndex {
            field: self.path(key),
            value,
            min,
            max,
        }
    }

    /// Integer range assertion; absent or non-integer values violate it too.
    fn key_range(
        &mut self,
        value: Option<&Value>,
        key: &str,
        min: i64,
        max: Option<i64>,
    ) -> ReplayResult<Option<i64>> {
        match value.and_then(Value::as_i64) {
            Some(found) if found >= min && max.map_or(true, |max| found <= max) => {
                Ok(Some(found))
            }
            Some(found) => {
                let variant = self.range_variant(key, found, min, max);
                self.report(variant)?;
                Ok(Some(found))
            }
            None => {
                let variant = self.malformed(key, "should be an integer".to_string(), value);
                self.report(variant)?;
                Ok(None)
            }
        }
    }

    /// Structural range assertion that tolerant mode does not relax.
    fn key_range_fatal(
        &self,
        value: Option<&Value>,
        key: &str,
        min: i64,
        max: i64,
    ) -> ReplayResult<i64> {
        match value.and_then(Value::as_i64) {
            Some(found) if found >= min && found <= max => Ok(found),
            Some(found) => {
                ReplayError::new_result(self.range_variant(key, found, min, Some(max)))
            }
            None => ReplayError::new_result(self.malformed(
                key,
                "should be an integer".to_string(),
                value,
            )),
        }
    }

    fn check_length(
        &mut self,
        key: &str,
        length: usize,
        min: usize,
        max: Option<usize>,
        value: &Value,
    ) -> ReplayResult<()> {
        if length < min || max.is_some_and(|max| length > max) {
            let bounds = max.map_or(String::new(), |max| max.to_string());
            let variant = self.malformed(
                key,
                format!("length should be within [{min} .. {bounds}], but was {length}"),
                Some(value),
            );
            self.report(variant)?;
        }
        Ok(())
    }

    /// Array type-and-length assertion. In tolerant mode a value of the wrong
    /// type yields `None`.
    fn key_array<'v>(
        &mut self,
        value: Option<&'v Value>,
        key: &str,
        min: usize,
        max: Option<usize>,
    ) -> ReplayResult<Option<&'v Vec<Value>>> {
        match value {
            Some(whole @ Value::Array(items)) => {
                self.check_length(key, items.len(), min, max, whole)?;
                Ok(Some(items))
            }
            _ => {
                let variant = self.malformed(key, "should be an array".to_string(), value);
                self.report(variant)?;
                Ok(None)
            }
        }
    }

    fn key_string<'v>(
        &mut self,
        value: Option<&'v Value>,
        key: &str,
        min: usize,
        max: Option<usize>,
    ) -> ReplayResult<Option<&'v str>> {
        match value {
            Some(whole @ Value::String(text)) => {
                self.check_length(key, text.chars().count(), min, max, whole)?;
                Ok(Some(text))
            }
            _ => {
                let variant = self.malformed(key, "should be a string".to_string(), value);
                self.report(variant)?;
                Ok(None)
            }
        }
    }

    fn key_eq(&mut self, value: Option<&Value>, key: &str, expected: i64) -> ReplayResult<()> {
        if value.and_then(Value::as_i64) != Some(expected) {
            let variant = self.malformed(key, format!("should be {expected}"), value);
            self.report(variant)?;
        }
        Ok(())
    }

    pub fn validate(mut self, document: Value) -> ReplayResult<ReplayDocument> {
        let mut replay = match document {
            Value::Object(replay) => replay,
            other => {
                return ReplayError::new_result(ReplayErrorVariant::MalformedField {
                    field: "replaydata".to_string(),
                    reason: "should be an object".to_string(),
                    text: other.to_string(),
                });
            }
        };

        let revision = self.key_range_fatal(
            replay.get("revision"),
            "revision",
            MIN_REVISION as i64,
            MAX_REVISION as i64,
        )? as u64;
        let players =
            self.key_range_fatal(replay.get("players"), "players", 1, MAX_PLAYERS as i64)?
                as usize;

        let (rows, cols, map_data, walls) = self.validate_map(replay.get("map"), revision)?;

        let treasures = self.top_level_collection(&replay, "treasures", revision)?;
        let powerups = self.top_level_collection(&replay, "powerups", revision)?;
        let scripts = self.top_level_collection(&replay, "scripts", revision)?;
        let anti_scripts = self.top_level_collection(&replay, "anti_scripts", revision)?;
        let bermuda_zones = self.top_level_collection(&replay, "bermuda_zones", revision)?;

        let entities =
            self.validate_entities(replay.get("pirates"), revision, players, rows, cols)?;

        let zones = match replay.get("zones") {
            Some(value) => {
                let zones = self
                    .key_array(Some(value), "zones", 0, None)?
                    .unwrap_or(&EMPTY)
                    .clone();
                self.stack.push("zones".to_string());
                for (index, zone) in zones.iter().enumerate() {
                    self.key_array(Some(zone), &index.to_string(), 0, None)?;
                }
                self.stack.pop();
                zones
            }
            None => Vec::new(),
        };
        let rejected = match replay.get("rejected") {
            Some(value) => self
                .key_array(Some(value), "rejected", 0, None)?
                .unwrap_or(&EMPTY)
                .clone(),
            None => Vec::new(),
        };

        let score_history = self.validate_scores(replay.get("scores"), players)?;
        let bonus = match replay.get("bonus") {
            Some(Value::Null) | None => None,
            Some(value) => self
                .key_array(Some(value), "bonus", players, Some(players))?
                .map(|bonus| bonus.iter().map(|b| b.as_f64().unwrap_or(0.0)).collect()),
        };

        let duration = self.durations.duration();
        if duration > MAX_DURATION {
            return ReplayError::new_result(ReplayErrorVariant::OutOfRangeIndex {
                field: self
                    .durations
                    .established_by()
                    .unwrap_or("replaydata")
                    .to_string(),
                value: i64::try_from(duration).unwrap_or(i64::MAX),
                min: 0,
                max: Some(MAX_DURATION as i64),
            });
        }
        for conflict in self.durations.conflicts() {
            self.report(conflict)?;
        }

        let scores = build_score_table(&score_history, duration, players);
        let counts = build_count_table(&entities, duration, players);

        for key in KNOWN_KEYS {
            replay.remove(key);
        }

        Ok(ReplayDocument {
            revision,
            players,
            rows,
            cols,
            map_data,
            walls,
            entities,
            treasures,
            powerups,
            scripts,
            anti_scripts,
            bermuda_zones,
            zones,
            rejected,
            score_history,
            bonus,
            extras: replay,
            duration,
            scores,
            counts,
            issues: self.issues,
        })
    }

    /// Reads the map rows. The returned dimensions are the measured ones; a
    /// declared `rows` or `cols` that disagrees is reported.
    fn validate_map(
        &mut self,
        map: Option<&Value>,
        revision: u64,
    ) -> ReplayResult<(usize, usize, Vec<String>, Array2<bool>)> {
        let Some(Value::Object(map)) = map else {
            let variant = self.malformed("map", "should be an object".to_string(), map);
            return ReplayError::new_result(variant);
        };
        self.stack.push("map".to_string());
        let data: Vec<String> = match map.get("data") {
            Some(Value::Array(rows)) if !rows.is_empty() => rows
                .iter()
                .map(|row| row.as_str().map(str::to_string))
                .collect::<Option<_>>()
                .ok_or_else(|| {
                    ReplayError::new(self.malformed(
                        "data",
                        "should only hold strings".to_string(),
                        map.get("data"),
                    ))
                })?,
            other => {
                return ReplayError::new_result(self.malformed(
                    "data",
                    "should be a non-empty array of rows".to_string(),
                    other,
                ));
            }
        };

        let rows = data.len();
        let cols = data[0].chars().count();
        let cells = rows.saturating_mul(cols);
        if cells > MAX_MAP_CELLS {
            return ReplayError::new_result(ReplayErrorVariant::OutOfRangeIndex {
                field: self.path("data"),
                value: i64::try_from(cells).unwrap_or(i64::MAX),
                min: 1,
                max: Some(MAX_MAP_CELLS as i64),
            });
        }
        if let Some(value) = map.get("rows") {
            self.key_eq(Some(value), "rows", rows as i64)?;
        }
        if let Some(value) = map.get("cols") {
            self.key_eq(Some(value), "cols", cols as i64)?;
        }

        let legal = if revision >= 3 {
            MAP_CHARS_REVISION_3
        } else {
            MAP_CHARS_REVISION_2
        };
        self.stack.push("data".to_string());
        let mut walls = Array2::from_elem((rows, cols), false);
        for (row, text) in data.iter().enumerate() {
            let length = text.chars().count();
            if length == 0 {
                let variant = self.malformed(
                    &row.to_string(),
                    "map rows must not be empty".to_string(),
                    Some(&Value::String(String::new())),
                );
                self.report(variant)?;
            } else if length != cols {
                self.report(ReplayErrorVariant::InconsistentMapWidth {
                    row,
                    expected: cols,
                    found: length,
                })?;
            }
            let illegal = text.chars().enumerate().find(|(_, c)| !legal.contains(*c));
            if let Some((col, character)) = illegal {
                self.report(ReplayErrorVariant::InvalidMapCharacter { character, row, col })?;
            }
            for (col, character) in text.chars().enumerate().take(cols) {
                walls[(row, col)] = character == WALL_CHAR;
            }
        }
        self.stack.pop();
        self.stack.pop();
        Ok((rows, cols, data, walls))
    }

    fn top_level_collection(
        &mut self,
        replay: &Map<String, Value>,
        key: &str,
        revision: u64,
    ) -> ReplayResult<Vec<Value>> {
        match replay.get(key) {
            Some(value) if revision >= 3 => Ok(self
                .key_array(Some(value), key, 0, None)?
                .unwrap_or(&EMPTY)
                .clone()),
            _ => Ok(Vec::new()),
        }
    }

    /// Entity ids are record indices, so a record that cannot be read keeps
    /// its slot as `None`.
    fn validate_entities(
        &mut self,
        pirates: Option<&Value>,
        revision: u64,
        players: usize,
        rows: usize,
        cols: usize,
    ) -> ReplayResult<Vec<Option<EntityRecord>>> {
        let Some(pirates) = self.key_array(pirates, "pirates", 0, None)? else {
            return Ok(Vec::new());
        };
        self.stack.push("pirates".to_string());
        let mut entities = Vec::with_capacity(pirates.len());
        for (index, record) in pirates.iter().enumerate() {
            let key = index.to_string();
            let fields =
                self.key_array(Some(record), &key, MIN_ENTITY_FIELDS, Some(MAX_ENTITY_FIELDS))?;
            let entity = match fields {
                Some(fields) if fields.len() >= MIN_ENTITY_FIELDS => {
                    self.stack.push(key);
                    let entity = self.validate_entity(fields, revision, players, rows, cols);
                    self.stack.pop();
                    entity?
                }
                _ => None,
            };
            if entity.is_none() {
                debug!("Entity record {index} is unreadable and will not spawn");
            }
            entities.push(entity);
        }
        self.stack.pop();
        Ok(entities)
    }

    fn validate_entity(
        &mut self,
        fields: &[Value],
        revision: u64,
        players: usize,
        rows: usize,
        cols: usize,
    ) -> ReplayResult<Option<EntityRecord>> {
        let row = self.key_range(fields.first(), "0", 0, Some(rows as i64 - 1))?;
        let col = self.key_range(fields.get(1), "1", 0, Some(cols as i64 - 1))?;
        let activation = self.key_range(fields.get(2), "2", 0, None)?;
        let (Some(row), Some(col), Some(activation)) = (row, col, activation) else {
            return Ok(None);
        };

        let (conversion, k) = if revision <= 2 {
            let min = if activation == 0 {
                0
            } else {
                activation.saturating_add(1)
            };
            (self.key_range(fields.get(3), "3", min, None)?, 4)
        } else {
            (None, 3)
        };
        let previous = if revision <= 2 {
            conversion
        } else {
            Some(activation)
        };
        let Some(previous) = previous else {
            return Ok(None);
        };
        let source = self.stack.join(".");

        let mut record = EntityRecord {
            row,
            col,
            activation: to_turn(activation),
            conversion: conversion.map(to_turn),
            end: None,
            owner: None,
            orders: None,
            game_id: None,
            death_cause: None,
            histories: EntityHistories::default(),
        };

        if fields.len() > k + 1 || (revision <= 2 && fields.len() > k) {
            let end_key = k.to_string();
            let end = self.key_range(fields.get(k), &end_key, previous.saturating_add(1), None)?;
            let owner = match fields.get(k + 1) {
                Some(owner) => {
                    let max = Some(players as i64 - 1);
                    self.key_range(Some(owner), &(k + 1).to_string(), 0, max)?
                }
                None => None,
            };
            let Some(end) = end else {
                return Ok(None);
            };
            record.end = Some(to_turn(end));
            record.owner = owner.and_then(|owner| usize::try_from(owner).ok());

            let lifespan = end.saturating_sub(previous);
            let orders = self.orders_field(fields.get(k + 2), k + 2)?;
            if let Some(orders) = &orders {
                let length = i64::try_from(orders.len()).unwrap_or(i64::MAX);
                let shortest = lifespan.saturating_sub(1);
                if length < shortest || length > lifespan {
                    let variant = self.malformed(
                        &(k + 2).to_string(),
                        format!("length should be within [{shortest} .. {lifespan}], but was {length}"),
                        fields.get(k + 2),
                    );
                    self.report(variant)?;
                }
                if end >= 1 {
                    self.durations
                        .record_lifespan(to_turn(end - 1), length != lifespan, &source);
                }
            } else if end >= 1 {
                self.durations.record_lifespan(to_turn(end - 1), false, &source);
            }
            record.orders = orders;
        } else {
            // Records without an owner end at their last numeric field.
            let end = fields.get(3).and_then(Value::as_i64).unwrap_or(0);
            if revision >= 3 {
                let end = self
                    .key_range(fields.get(3), "3", activation.saturating_add(1), None)?
                    .unwrap_or(end);
                record.end = Some(to_turn(end));
            }
            if end >= 1 {
                self.durations.record_lifespan(to_turn(end - 1), false, &source);
            }
        }

        if revision >= 3 {
            read_histories(&mut record, fields);
        }
        Ok(Some(record))
    }

    /// Orders are a list of per-turn action strings; a single string is read
    /// as one action per character.
    fn orders_field(
        &mut self,
        value: Option<&Value>,
        index: usize,
    ) -> ReplayResult<Option<Vec<String>>> {
        match value {
            Some(Value::Array(turns)) => Ok(Some(
                turns
                    .iter()
                    .map(|turn| match turn {
                        Value::String(actions) => actions.clone(),
                        _ => String::new(),
                    })
                    .collect(),
            )),
            Some(Value::String(actions)) => Ok(Some(actions.chars().map(String::from).collect())),
            None | Some(Value::Null) => Ok(None),
            _ => {
                let variant =
                    self.malformed(&index.to_string(), "should be an array".to_string(), value);
                self.report(variant)?;
                Ok(None)
            }
        }
    }

    fn validate_scores(
        &mut self,
        scores: Option<&Value>,
        players: usize,
    ) -> ReplayResult<Vec<Vec<f64>>> {
        let Some(lists) = self.key_array(scores, "scores", players, Some(players))? else {
            return Ok(vec![vec![0.0]; players]);
        };
        self.stack.push("scores".to_string());
        let mut history = Vec::with_capacity(players);
        for player in 0..players {
            let key = player.to_string();
            let list = match self.key_array(lists.get(player), &key, 1, None)? {
                Some(list) => list.clone(),
                None => Vec::new(),
            };
            let mut values = Vec::with_capacity(list.len());
            for (turn, score) in list.iter().enumerate() {
                match score.as_f64() {
                    Some(value) => values.push(value),
                    None => {
                        let variant = self.malformed(
                            &format!("{key}.{turn}"),
                            "score is not a number".to_string(),
                            Some(score),
                        );
                        self.report(variant)?;
                        values.push(0.0);
                    }
                }
            }
            if !values.is_empty() {
                let source = self.path(&key);
                self.durations.record_lifespan(values.len() - 1, false, &source);
            }
            history.push(values);
        }
        self.stack.pop();
        Ok(history)
    }
}

/// Clamps a validated turn into an index. Negative turns only survive in
/// tolerant mode and read as turn 0.
fn to_turn(turn: i64) -> usize {
    usize::try_from(turn.max(0)).unwrap_or(usize::MAX)
}

fn read_histories(record: &mut EntityRecord, fields: &[Value]) {
    let text = |index: usize| fields.get(index).and_then(Value::as_str).map(str::to_string);
    let raw = |index: usize| fields.get(index).filter(|v| !v.is_null()).cloned();
    record.game_id = fields.get(6).and_then(Value::as_i64);
    record.death_cause = text(7);
    record.histories = EntityHistories {
        treasure: text(8),
        attack: raw(9),
        defense: raw(10),
        drink: text(11),
        attack_radius: raw(12),
        rob_powerup: text(13),
        speed_powerup: text(14),
    };
}

/// Per-turn scores; a history shorter than the replay holds its last value.
fn build_score_table(history: &[Vec<f64>], duration: usize, players: usize) -> Array2<f64> {
    let mut table = Array2::zeros((duration + 1, players));
    for (player, scores) in history.iter().enumerate().take(players) {
        let last = scores.last().copied().unwrap_or(0.0);
        for turn in 0..=duration {
            table[(turn, player)] = scores.get(turn).copied().unwrap_or(last);
        }
    }
    table
}

fn build_count_table(
    entities: &[Option<EntityRecord>],
    duration: usize,
    players: usize,
) -> Array2<u32> {
    let mut table = Array2::zeros((duration + 1, players));
    let spans = entities.iter().flatten().filter_map(EntityRecord::owned_span);
    for (from, to, owner) in spans {
        if owner >= players {
            continue;
        }
        for turn in from..to.min(duration + 1) {
            table[(turn, owner)] += 1;
        }
    }
    table
}
