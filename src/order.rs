use glam::DVec2;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A single per-turn action recorded for an entity. Movement symbols carry a
/// unit offset on the grid, where x points right and y points down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Order {
    North,
    East,
    South,
    West,
    Attack,
    Defend,
    SummonZone,
    NoOp,
}

impl Order {
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol.to_ascii_lowercase() {
            'n' => Some(Order::North),
            'e' => Some(Order::East),
            's' => Some(Order::South),
            'w' => Some(Order::West),
            'a' => Some(Order::Attack),
            'd' => Some(Order::Defend),
            'f' => Some(Order::SummonZone),
            '-' => Some(Order::NoOp),
            _ => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Order::North => 'n',
            Order::East => 'e',
            Order::South => 's',
            Order::West => 'w',
            Order::Attack => 'a',
            Order::Defend => 'd',
            Order::SummonZone => 'f',
            Order::NoOp => '-',
        }
    }

    pub fn offset(&self) -> DVec2 {
        match self {
            Order::North => DVec2::new(0.0, -1.0),
            Order::East => DVec2::new(1.0, 0.0),
            Order::South => DVec2::new(0.0, 1.0),
            Order::West => DVec2::new(-1.0, 0.0),
            _ => DVec2::ZERO,
        }
    }

    pub fn is_movement(&self) -> bool {
        matches!(
            self,
            Order::North | Order::East | Order::South | Order::West
        )
    }

    /// Parses a per-turn action string, dropping symbols that are not orders.
    pub fn parse_lenient(actions: &str) -> Vec<Order> {
        actions.chars().filter_map(Order::from_symbol).collect()
    }
}
