use std::sync::Arc;

use log::debug;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::*;

/// Raw replay input in one of its two encodings.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplaySource {
    /// Line-oriented text from before replays were stored as JSON.
    Legacy(String),
    /// Either a `{"replayformat": ..., "replaydata": ...}` envelope or a bare
    /// canonical document.
    Structured(Value),
}

impl ReplaySource {
    /// Text starting with `{` is parsed as JSON, anything else is legacy text.
    pub fn from_text(text: &str) -> ReplayResult<Self> {
        if text.trim_start().starts_with('{') {
            Ok(ReplaySource::Structured(serde_json::from_str(text)?))
        } else {
            Ok(ReplaySource::Legacy(text.to_string()))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, new)]
#[serde(default)]
pub struct ReplayOptions {
    /// Report recoverable validation errors instead of failing on them.
    pub debug: bool,
    /// Entry of the envelope's `user_ids` whose player gets the highlight color.
    pub highlight_user: Option<Value>,
}

/// A loaded replay: the validated document, per-player metadata and the
/// lazily materialized turns.
#[derive(Debug, Clone)]
pub struct Replay {
    pub document: ReplayDocument,
    /// Envelope fields other than the replay data itself.
    pub meta: Map<String, Value>,
    pub players_info: Vec<PlayerInfo>,
    colors: Vec<Rgb>,
    materializer: TurnMaterializer,
}

impl Replay {
    pub fn load(text: &str, options: &ReplayOptions) -> ReplayResult<Self> {
        Self::from_source(ReplaySource::from_text(text)?, options)
    }

    pub fn from_source(source: ReplaySource, options: &ReplayOptions) -> ReplayResult<Self> {
        let (meta, replaydata) = match source {
            ReplaySource::Legacy(text) => {
                let mut meta = Map::new();
                meta.insert("replayformat".to_string(), REPLAY_FORMAT_JSON.into());
                (meta, convert_legacy(&text)?)
            }
            ReplaySource::Structured(Value::Object(mut meta)) => match meta.remove("replaydata") {
                Some(replaydata) => {
                    let (format, replaydata) = match replaydata {
                        Value::String(text) => (REPLAY_FORMAT_STORAGE, convert_legacy(&text)?),
                        other => (REPLAY_FORMAT_JSON, other),
                    };
                    let found = meta.get("replayformat").and_then(Value::as_str);
                    if found != Some(format) {
                        return ReplayError::new_result(
                            ReplayErrorVariant::UnsupportedFormatVersion {
                                expected: format.to_string(),
                                found: found.unwrap_or("undefined").to_string(),
                            },
                        );
                    }
                    (meta, replaydata)
                }
                None => (Map::new(), Value::Object(meta)),
            },
            ReplaySource::Structured(other) => (Map::new(), other),
        };

        let document = SchemaValidator::new(options.debug).validate(replaydata)?;
        let highlight = highlighted_player(&meta, options.highlight_user.as_ref());
        let players_info = build_players_info(&meta, &document, highlight);
        let colors = players_info.iter().map(|player| player.color).collect();
        debug!(
            "Loaded replay revision {} with {} players on a {}x{} map lasting {} turns ({} issues)",
            document.revision,
            document.players,
            document.rows,
            document.cols,
            document.duration,
            document.issues.len()
        );
        let materializer = TurnMaterializer::new(&document);
        Ok(Self {
            document,
            meta,
            players_info,
            colors,
            materializer,
        })
    }

    pub fn duration(&self) -> usize {
        self.document.duration
    }

    pub fn player_colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn get_turn(&mut self, n: usize) -> ReplayResult<Arc<[EntityId]>> {
        self.materializer
            .get_turn(&self.document, &self.colors, n)
    }

    pub fn track(&self, id: EntityId) -> Option<&AnimationTrack> {
        self.materializer.track(id)
    }

    pub fn interpolate(&self, id: EntityId, time: f64) -> Option<AttributeSnapshot> {
        self.track(id)?.interpolate(time)
    }
}

fn highlighted_player(meta: &Map<String, Value>, user: Option<&Value>) -> Option<usize> {
    let user = user?;
    meta.get("user_ids")?
        .as_array()?
        .iter()
        .position(|id| id == user)
}

fn array_entry<'a>(meta: &'a Map<String, Value>, key: &str, index: usize) -> Option<&'a Value> {
    meta.get(key)?.as_array()?.get(index)
}

fn parse_color(value: &Value) -> Option<Rgb> {
    let channels = value.as_array()?;
    if channels.len() != 3 {
        return None;
    }
    let mut color = [0u8; 3];
    for (slot, channel) in color.iter_mut().zip(channels) {
        *slot = u8::try_from(channel.as_u64()?).ok()?;
    }
    Some(color)
}

fn build_players_info(
    meta: &Map<String, Value>,
    document: &ReplayDocument,
    highlight: Option<usize>,
) -> Vec<PlayerInfo> {
    // Older envelopes list the player names under "players".
    let names_key = if meta.get("playernames").is_some_and(Value::is_array) {
        "playernames"
    } else {
        "players"
    };
    let rank: Option<Vec<f64>> = meta
        .get("challenge_rank")
        .and_then(Value::as_array)
        .map(|rank| rank.iter().map(|r| r.as_f64().unwrap_or(0.0)).collect());
    let assigned = assign_player_colors(document.players, highlight, rank.as_deref());

    (0..document.players)
        .map(|i| {
            let name = array_entry(meta, names_key, i)
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty())
                .map_or_else(|| format!("player {}", i + 1), str::to_string);
            let turns = array_entry(meta, "playerturns", i)
                .and_then(Value::as_u64)
                .filter(|turns| *turns > 0)
                .map(|turns| turns as usize)
                .or_else(|| {
                    document
                        .score_history
                        .get(i)
                        .and_then(|scores| scores.len().checked_sub(1))
                });
            let color = array_entry(meta, "playercolors", i)
                .and_then(parse_color)
                .unwrap_or(assigned[i]);
            PlayerInfo { name, color, turns }
        })
        .collect()
}
