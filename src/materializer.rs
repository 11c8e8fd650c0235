use std::collections::BTreeMap;
use std::sync::Arc;

use glam::DVec2;
use log::{debug, trace};

use crate::*;

/// Lazily derives the live entities of each turn, together with their
/// animation tracks.
///
/// Turns are materialized strictly in order: the per-entity tracks written
/// while processing turn `n - 1` are the starting point for turn `n`. A turn
/// that has been materialized is cached and never recomputed.
#[derive(Debug, Clone)]
pub struct TurnMaterializer {
    tracks: Vec<Option<AnimationTrack>>,
    turns: Vec<Arc<[EntityId]>>,
    live: Vec<EntityId>,
    spawn_schedule: BTreeMap<usize, Vec<EntityId>>,
}

impl TurnMaterializer {
    pub fn new(document: &ReplayDocument) -> Self {
        let mut spawn_schedule: BTreeMap<usize, Vec<EntityId>> = BTreeMap::new();
        for (id, record) in document.entities.iter().enumerate() {
            let Some(record) = record else {
                continue;
            };
            spawn_schedule.entry(record.activation).or_default().push(id);
        }
        Self {
            tracks: vec![None; document.entities.len()],
            turns: Vec::new(),
            live: Vec::new(),
            spawn_schedule,
        }
    }

    pub fn track(&self, id: EntityId) -> Option<&AnimationTrack> {
        self.tracks.get(id).and_then(Option::as_ref)
    }

    pub fn materialized_turns(&self) -> usize {
        self.turns.len()
    }

    /// Entities alive during turn `n`. Every earlier turn is materialized
    /// first if it has not been already.
    pub fn get_turn(
        &mut self,
        document: &ReplayDocument,
        colors: &[Rgb],
        n: usize,
    ) -> ReplayResult<Arc<[EntityId]>> {
        if n > document.duration {
            return ReplayError::new_result(ReplayErrorVariant::OutOfRangeIndex {
                field: "turn".to_string(),
                value: n as i64,
                min: 0,
                max: Some(document.duration as i64),
            });
        }
        while self.turns.len() <= n {
            self.materialize_next(document, colors);
        }
        Ok(self.turns[n].clone())
    }

    fn materialize_next(&mut self, document: &ReplayDocument, colors: &[Rgb]) {
        let n = self.turns.len();

        let spawns = self.spawn_schedule.get(&n).cloned().unwrap_or_default();
        for id in spawns {
            let Some(record) = document.entity(id) else {
                continue;
            };
            if record.death_turn() <= n {
                trace!("Entity {id} dies before it spawns, skipping it");
                continue;
            }
            self.tracks[id] = Some(spawn_track(id, record, colors));
            self.live.push(id);
        }

        for &id in &self.live {
            let (Some(record), Some(track)) = (document.entity(id), self.tracks[id].as_mut()) else {
                continue;
            };
            if let Some(owner) = record.owner {
                if record.conversion == Some(n) && n != record.activation {
                    let time = n as f64;
                    let color = color_to_vec(owner_color(colors, Some(owner)));
                    track.fade_color(color, time - CONVERSION_FADE, time);
                    track.set_owner_from(time, Some(owner));
                }
            }
            if let Some(actions) = record.actions_at(n) {
                apply_actions(track, id, actions, n);
            }
            if record.death_turn() == n + 1 {
                apply_death(track, record, colors);
            }
        }

        let alive: Arc<[EntityId]> = Arc::from(self.live.clone());
        self.live
            .retain(|&id| document.entity(id).is_some_and(|record| record.death_turn() > n + 1));
        debug!("Materialized turn {n} with {} live entities", alive.len());
        self.turns.push(alive);
    }
}

fn owner_color(colors: &[Rgb], owner: Option<usize>) -> Rgb {
    owner
        .and_then(|owner| colors.get(owner).copied())
        .unwrap_or(NEUTRAL_COLOR)
}

fn spawn_track(id: EntityId, record: &EntityRecord, colors: &[Rgb]) -> AnimationTrack {
    let owner = record.spawn_owner();
    let orientation = record
        .actions_at(record.orders_start())
        .and_then(|actions| {
            Order::parse_lenient(actions)
                .into_iter()
                .find(Order::is_movement)
        })
        .unwrap_or(Order::West);
    let activation = record.activation as f64;
    let start = activation - SPAWN_LEAD_IN;
    let mut track = AnimationTrack::new(
        id,
        Keyframe {
            time: start,
            position: DVec2::new(record.col as f64, record.row as f64),
            color: color_to_vec(owner_color(colors, owner)),
            size: 1.0,
            owner,
            orientation,
            game_id: record.game_id,
            death_cause: record.death_cause.clone(),
        },
    );
    if record.activation != 0 {
        let mut previous = start;
        for (offset, size) in SPAWN_SIZE_STEPS {
            track.fade(Channel::Size, size, previous, start + offset);
            previous = start + offset;
        }
        track.fade(Channel::Size, 1.0, previous, start + SPAWN_SETTLE);
    }
    track
}

/// Spreads the actions recorded for one turn evenly across it.
fn apply_actions(track: &mut AnimationTrack, id: EntityId, actions: &str, n: usize) {
    let count = actions.chars().count();
    for (j, symbol) in actions.chars().enumerate() {
        let Some(order) = Order::from_symbol(symbol) else {
            trace!("Skipping unknown action {symbol:?} of entity {id} in turn {n}");
            continue;
        };
        if !order.is_movement() {
            continue;
        }
        let start = n as f64 + j as f64 / count as f64;
        let end = n as f64 + (j + 1) as f64 / count as f64;
        let target = track.frame_at(start).position + order.offset();
        track.fade(Channel::X, target.x, start, end);
        track.fade(Channel::Y, target.y, start, end);
        track.set_orientation_from(start, order);
    }
}

fn apply_death(track: &mut AnimationTrack, record: &EntityRecord, colors: &[Rgb]) {
    let death = record.death_turn() as f64;
    let owner = track.last().owner;
    track.fade_color(color_to_vec(DEATH_TINT), death - DEATH_FLASH.0, death - DEATH_FLASH.1);
    track.fade_color(
        color_to_vec(owner_color(colors, owner)),
        death - DEATH_REVERT.0,
        death - DEATH_REVERT.1,
    );
    track.fade_color(color_to_vec(BACKGROUND_COLOR), death - DEATH_DARKEN, death);
    let shrink = match record.death_cause.as_deref() {
        Some(cause) if cause == ZONE_DEATH_CAUSE => ZONE_DEATH_SHRINK,
        _ => DEATH_SHRINK,
    };
    track.fade(Channel::Size, 0.0, death - shrink, death);
    track.kill(death);
}
