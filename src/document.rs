use float_ord::FloatOrd;
use ndarray::Array2;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::*;

/// Per-turn history strings and lists attached to revision-3 entity records.
/// They are passed through to consumers without interpretation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityHistories {
    pub treasure: Option<String>,
    pub attack: Option<Value>,
    pub defense: Option<Value>,
    pub drink: Option<String>,
    pub attack_radius: Option<Value>,
    pub rob_powerup: Option<String>,
    pub speed_powerup: Option<String>,
}

/// A raw entity record after validation, before materialization.
///
/// Revision 2 records carry a conversion turn between activation and end:
/// the entity exists unowned from `activation` and belongs to `owner` from
/// `conversion` on. Revision 3 records have no conversion turn.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub row: i64,
    pub col: i64,
    pub activation: usize,
    pub conversion: Option<usize>,
    pub end: Option<usize>,
    pub owner: Option<usize>,
    /// Action string per turn, starting at [`EntityRecord::orders_start`].
    pub orders: Option<Vec<String>>,
    pub game_id: Option<i64>,
    pub death_cause: Option<String>,
    pub histories: EntityHistories,
}

impl EntityRecord {
    /// First turn the recorded orders apply to.
    pub fn orders_start(&self) -> usize {
        self.conversion.unwrap_or(self.activation)
    }

    /// Turn at which the entity stops being alive.
    pub fn death_turn(&self) -> usize {
        self.end
            .or(self.conversion)
            .unwrap_or(self.activation)
    }

    /// Owner at spawn time. Revision 2 entities are unowned until converted.
    pub fn spawn_owner(&self) -> Option<usize> {
        match self.conversion {
            Some(conversion) if conversion != self.activation => None,
            _ => self.owner,
        }
    }

    pub fn actions_at(&self, turn: usize) -> Option<&str> {
        let start = self.orders_start();
        if turn < start {
            return None;
        }
        self.orders
            .as_ref()
            .and_then(|orders| orders.get(turn - start))
            .map(String::as_str)
    }

    /// Turns `[from, to)` during which the entity counts for its owner.
    pub fn owned_span(&self) -> Option<(usize, usize, usize)> {
        let owner = self.owner?;
        let end = self.end?;
        Some((self.orders_start(), end, owner))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerInfo {
    pub name: String,
    pub color: Rgb,
    pub turns: Option<usize>,
}

/// A validation failure that was reported but not raised because the
/// validator ran in tolerant mode.
#[derive(Debug, Clone, PartialEq, new)]
pub struct ValidationIssue {
    pub variant: ReplayErrorVariant,
}

/// The validated, canonical form of a replay.
#[derive(Debug, Clone)]
pub struct ReplayDocument {
    pub revision: u64,
    pub players: usize,
    pub rows: usize,
    pub cols: usize,
    pub map_data: Vec<String>,
    pub walls: Array2<bool>,
    /// Entity records by id. A record that could not be read in tolerant mode
    /// keeps its slot as `None` and never spawns.
    pub entities: Vec<Option<EntityRecord>>,
    pub treasures: Vec<Value>,
    pub powerups: Vec<Value>,
    pub scripts: Vec<Value>,
    pub anti_scripts: Vec<Value>,
    pub bermuda_zones: Vec<Value>,
    pub zones: Vec<Value>,
    pub rejected: Vec<Value>,
    pub score_history: Vec<Vec<f64>>,
    pub bonus: Option<Vec<f64>>,
    /// Header parameters without a dedicated field, such as `turns` or `cutoff`.
    pub extras: Map<String, Value>,
    pub duration: usize,
    /// Score of each player per turn, shape `(duration + 1, players)`.
    pub scores: Array2<f64>,
    /// Owned entities alive per player per turn, shape `(duration + 1, players)`.
    pub counts: Array2<u32>,
    pub issues: Vec<ValidationIssue>,
}

impl ReplayDocument {
    pub fn entity(&self, id: EntityId) -> Option<&EntityRecord> {
        self.entities.get(id).and_then(Option::as_ref)
    }

    pub fn declared_turns(&self) -> Option<u64> {
        self.extras.get("turns").and_then(Value::as_u64)
    }

    pub fn has_duration(&self) -> bool {
        self.duration > 0 || self.declared_turns().is_some_and(|turns| turns > 0)
    }

    pub fn is_wall(&self, row: usize, col: usize) -> bool {
        self.walls.get((row, col)).copied().unwrap_or(false)
    }

    pub fn score_at(&self, turn: usize, player: usize) -> Option<f64> {
        self.scores.get((turn, player)).copied()
    }

    pub fn live_count(&self, turn: usize, player: usize) -> Option<u32> {
        self.counts.get((turn, player)).copied()
    }

    /// Player with the highest score at `turn`, the lowest index on ties.
    pub fn leader_at(&self, turn: usize) -> Option<usize> {
        if turn >= self.scores.nrows() {
            return None;
        }
        self.scores
            .row(turn)
            .iter()
            .enumerate()
            .max_by_key(|(index, score)| (FloatOrd(**score), std::cmp::Reverse(*index)))
            .map(|(index, _)| index)
    }

    /// Reads the availability flag of a revision-3 treasure record
    /// `[id, [row, col], value, "0110..."]` for one turn.
    pub fn treasure_available(&self, index: usize, turn: usize) -> Option<bool> {
        let history = self.treasures.get(index)?.get(3)?.as_str()?;
        match history.as_bytes().get(turn)? {
            b'0' => Some(false),
            b'1' => Some(true),
            _ => None,
        }
    }
}

fn color_map(players: usize) -> Vec<usize> {
    match COLOR_MAPS.get(players) {
        Some(map) => map.to_vec(),
        None => (0..players).map(|i| i % (PLAYER_COLORS.len() - 1) + 1).collect(),
    }
}

/// Assigns display colors to players. A highlighted player takes the reserved
/// highlight color and the others share the map for one fewer player. With a
/// rank list, colors are handed out in rank order instead of player order.
pub fn assign_player_colors(
    players: usize,
    highlight: Option<usize>,
    rank: Option<&[f64]>,
) -> Vec<Rgb> {
    let map = if highlight.is_some() {
        color_map(players.saturating_sub(1))
    } else {
        color_map(players)
    };
    let pick = |slot: usize| {
        let index = map.get(slot).copied().unwrap_or(slot % PLAYER_COLORS.len());
        PLAYER_COLORS[index % PLAYER_COLORS.len()]
    };
    let rank: Option<Vec<f64>> = rank.filter(|rank| rank.len() >= players).map(|rank| {
        rank.iter()
            .take(players)
            .enumerate()
            .filter(|(i, _)| Some(*i) != highlight)
            .map(|(_, r)| *r)
            .collect()
    });
    let mut sorted: Option<Vec<Option<f64>>> = rank.as_ref().map(|rank| {
        let mut sorted = rank.clone();
        sorted.sort_by_key(|r| FloatOrd(*r));
        sorted.into_iter().map(Some).collect()
    });

    let mut adjust = 0;
    (0..players)
        .map(|i| {
            if Some(i) == highlight {
                adjust = 1;
                return PLAYER_COLORS[HIGHLIGHT_COLOR_INDEX];
            }
            let slot = i - adjust;
            match (&rank, sorted.as_mut()) {
                (Some(rank), Some(sorted)) => {
                    let position = sorted
                        .iter()
                        .position(|r| *r == Some(rank[slot]))
                        .unwrap_or(slot);
                    sorted[position] = None;
                    pick(position)
                }
                _ => pick(slot),
            }
        })
        .collect()
}
