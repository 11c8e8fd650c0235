use pirates_replay::{Replay, ReplayOptions};
use wasm_bindgen::prelude::*;

macro_rules! console_log {
    ($($t:tt)*) => (web_sys::console::log_1(&JsValue::from_str(&format!($($t)*))))
}

#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    console_log!("pirates-replay WASM bindings loaded");
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Failed to convert to JS: {e}")))
}

/// A loaded replay held on the Rust side. Turns are materialized on demand.
#[wasm_bindgen]
pub struct ReplayHandle {
    replay: Replay,
}

#[wasm_bindgen]
impl ReplayHandle {
    /// Loads a JSON or legacy text replay. `highlight_user` selects the
    /// player whose `user_ids` entry matches it.
    #[wasm_bindgen(constructor)]
    pub fn new(
        text: &str,
        debug: Option<bool>,
        highlight_user: JsValue,
    ) -> Result<ReplayHandle, JsValue> {
        let highlight_user: Option<serde_json::Value> =
            serde_wasm_bindgen::from_value(highlight_user).unwrap_or(None);
        let options = ReplayOptions::new(debug.unwrap_or(false), highlight_user);
        let replay = Replay::load(text, &options)
            .map_err(|e| JsValue::from_str(&format!("Failed to load replay: {e}")))?;
        for issue in &replay.document.issues {
            console_log!("Ignored replay error: {}", issue.variant);
        }
        Ok(ReplayHandle { replay })
    }

    pub fn duration(&self) -> usize {
        self.replay.duration()
    }

    pub fn players(&self) -> usize {
        self.replay.document.players
    }

    pub fn rows(&self) -> usize {
        self.replay.document.rows
    }

    pub fn cols(&self) -> usize {
        self.replay.document.cols
    }

    #[wasm_bindgen(js_name = hasDuration)]
    pub fn has_duration(&self) -> bool {
        self.replay.document.has_duration()
    }

    #[wasm_bindgen(js_name = mapRows)]
    pub fn map_rows(&self) -> Result<JsValue, JsValue> {
        to_js(&self.replay.document.map_data)
    }

    #[wasm_bindgen(js_name = playersInfo)]
    pub fn players_info(&self) -> Result<JsValue, JsValue> {
        to_js(&self.replay.players_info)
    }

    #[wasm_bindgen(js_name = treasures)]
    pub fn treasures(&self) -> Result<JsValue, JsValue> {
        to_js(&self.replay.document.treasures)
    }

    #[wasm_bindgen(js_name = scoresAt)]
    pub fn scores_at(&self, turn: usize) -> Result<JsValue, JsValue> {
        let scores: Vec<Option<f64>> = (0..self.replay.document.players)
            .map(|player| self.replay.document.score_at(turn, player))
            .collect();
        to_js(&scores)
    }

    /// Ids of the entities alive during `turn`.
    #[wasm_bindgen(js_name = getTurn)]
    pub fn get_turn(&mut self, turn: usize) -> Result<Vec<usize>, JsValue> {
        self.replay
            .get_turn(turn)
            .map(|alive| alive.to_vec())
            .map_err(|e| JsValue::from_str(&format!("{e}")))
    }

    /// Attribute snapshot of entity `id` at `time`, or `undefined` when it is
    /// not alive then.
    pub fn interpolate(&self, id: usize, time: f64) -> Result<JsValue, JsValue> {
        match self.replay.interpolate(id, time) {
            Some(snapshot) => to_js(&snapshot),
            None => Ok(JsValue::UNDEFINED),
        }
    }
}
