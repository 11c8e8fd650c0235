use serde_json::{json, Map, Value};

use crate::*;

/// Converts a legacy line-oriented replay (or a bare map) into the canonical
/// structured document consumed by [`SchemaValidator`].
///
/// A replay starts with `v pirates 1`, a map file starts directly with its
/// header parameters. Maps carry no entity or score records, but letters in
/// their rows mark starting positions and are turned into entity records.
pub fn convert_legacy(text: &str) -> ReplayResult<Value> {
    let mut tokens = Tokenizer::new(text);
    let line = tokens.next()?;
    let mut converter = LegacyConverter::new(tokens, line);
    let result = converter.run();
    result.map_err(|e| e.with_line(&converter.line.line))
}

struct LegacyConverter {
    tokens: Tokenizer,
    line: TokenLine,
    is_replay: bool,
    players: Option<u64>,
    header: Map<String, Value>,
    map_header: Map<String, Value>,
    map_rows: Vec<String>,
    entities: Vec<Value>,
    scores: Vec<Value>,
}

impl LegacyConverter {
    fn new(tokens: Tokenizer, line: TokenLine) -> Self {
        let is_replay = line.keyword == "v";
        Self {
            tokens,
            line,
            is_replay,
            players: None,
            header: Map::new(),
            map_header: Map::new(),
            map_rows: Vec::new(),
            entities: Vec::new(),
            scores: Vec::new(),
        }
    }

    fn advance(&mut self) -> ReplayResult<()> {
        self.line = self.tokens.next()?;
        Ok(())
    }

    fn run(&mut self) -> ReplayResult<Value> {
        if self.is_replay {
            self.read_version()?;
            self.advance()?;
            if self.line.keyword == "players" {
                self.read_header_param()?;
                self.advance()?;
            }
        }
        while self.line.keyword != "m" {
            self.read_header_param()?;
            self.advance()?;
        }
        self.read_map()?;
        if self.is_replay {
            while self.line.keyword == "a" {
                self.read_entity()?;
                self.advance()?;
            }
            self.read_scores()?;
        } else {
            let players = self.players.unwrap_or(0);
            self.scores = (0..players).map(|_| json!([0])).collect();
        }
        if self.tokens.has_more() {
            self.advance()?;
            return ReplayError::new_result(ReplayErrorVariant::TrailingData {
                text: self.line.line.clone(),
            });
        }
        Ok(self.build())
    }

    fn read_version(&self) -> ReplayResult<()> {
        let params = self.line.decode(
            &[(DataType::Ident, "game"), (DataType::PosInt, "version")],
            0,
        )?;
        let game = params[0].as_str().unwrap_or_default();
        let version = params[1].as_uint().unwrap_or_default();
        if game != GAME_NAME || version != LEGACY_FORMAT_VERSION {
            return ReplayError::new_result(ReplayErrorVariant::UnsupportedFormatVersion {
                expected: format!("{GAME_NAME} {LEGACY_FORMAT_VERSION}"),
                found: format!("{game} {version}"),
            });
        }
        Ok(())
    }

    fn read_header_param(&mut self) -> ReplayResult<()> {
        let keyword = self.line.keyword.clone();
        let numeric = matches!(keyword.as_str(), "rows" | "cols" | "players" | "turns");
        let data_type = if numeric {
            DataType::UInt
        } else {
            DataType::String
        };
        let value = self
            .line
            .decode(&[(data_type, keyword.as_str())], 0)?
            .remove(0);
        if keyword == "rows" || keyword == "cols" {
            self.map_header.insert(keyword, value.into_json());
            return Ok(());
        }
        if let ("players", Some(players)) = (keyword.as_str(), value.as_uint()) {
            if players < 1 || players > MAX_PLAYERS as u64 {
                return ReplayError::new_result(ReplayErrorVariant::OutOfRangeIndex {
                    field: "players".to_string(),
                    value: players as i64,
                    min: 1,
                    max: Some(MAX_PLAYERS as i64),
                });
            }
            self.players = Some(players);
        }
        self.header.insert(keyword, value.into_json());
        Ok(())
    }

    fn read_map(&mut self) -> ReplayResult<()> {
        let mut width = None;
        loop {
            let row_text = match self.line.decode(&[(DataType::String, "map row")], 0)?.remove(0) {
                Param::Str(text) => text,
                _ => String::new(),
            };
            if row_text.is_empty() {
                return ReplayError::new_result(ReplayErrorVariant::MalformedField {
                    field: format!("map.data.{}", self.map_rows.len()),
                    reason: "map rows must not be empty".to_string(),
                    text: row_text,
                });
            }
            let found = row_text.chars().count();
            match width {
                None => width = Some(found),
                Some(expected) if expected != found => {
                    return ReplayError::new_result(ReplayErrorVariant::InconsistentMapWidth {
                        row: self.map_rows.len(),
                        expected,
                        found,
                    });
                }
                Some(_) => {}
            }
            if !self.is_replay {
                self.extract_starting_positions(&row_text);
            }
            self.map_rows.push(row_text);
            if self.is_replay || self.tokens.has_more() {
                self.advance()?;
            } else {
                break;
            }
            if self.line.keyword != "m" {
                break;
            }
        }
        Ok(())
    }

    fn extract_starting_positions(&mut self, row_text: &str) {
        let row = self.map_rows.len();
        for (col, c) in row_text.chars().enumerate() {
            let owner = if c.is_ascii_lowercase() {
                c as u32 - 'a' as u32
            } else if c.is_ascii_uppercase() {
                c as u32 - 'A' as u32
            } else {
                continue;
            };
            self.entities.push(json!([row, col, 0, 1, owner, ["-"]]));
        }
    }

    fn map_rows_count(&self) -> u64 {
        self.map_header
            .get("rows")
            .and_then(Value::as_u64)
            .unwrap_or(self.map_rows.len() as u64)
    }

    fn map_cols_count(&self) -> u64 {
        self.map_header.get("cols").and_then(Value::as_u64).unwrap_or_else(|| {
            self.map_rows
                .first()
                .map_or(0, |row| row.chars().count() as u64)
        })
    }

    fn read_entity(&mut self) -> ReplayResult<()> {
        let params = self.line.decode(
            &[
                (DataType::UInt, "row"),
                (DataType::UInt, "col"),
                (DataType::UInt, "activation"),
                (DataType::UInt, "end"),
                (DataType::UInt, "owner"),
                (DataType::Orders, "orders"),
                (DataType::UInt, "game id"),
                (DataType::Ident, "death cause"),
            ],
            4,
        )?;
        let field = |index: usize| params.get(index).and_then(Param::as_uint);
        check_bound("row", field(0), self.map_rows_count())?;
        check_bound("col", field(1), self.map_cols_count())?;
        let activation = field(2).unwrap_or_default() as i64;
        let end = field(3).unwrap_or_default() as i64;
        let owner = field(4);
        if let Some(owner) = owner {
            check_bound("owner", Some(owner), self.players.unwrap_or(0))?;
            let orders_len = match params.get(5) {
                Some(Param::Orders(orders)) => orders.len() as i64,
                _ => 0,
            };
            let lifespan = end - activation;
            if orders_len != lifespan && orders_len + 1 != lifespan {
                return ReplayError::new_result(ReplayErrorVariant::MalformedField {
                    field: "orders".to_string(),
                    reason: format!("number of orders does not match life span {lifespan}"),
                    text: orders_len.to_string(),
                });
            }
        }
        let mut record: Vec<Value> = params.into_iter().map(Param::into_json).collect();
        if owner.is_some() && record.len() == 5 {
            record.push(json!([]));
        }
        self.entities.push(Value::Array(record));
        Ok(())
    }

    fn read_scores(&mut self) -> ReplayResult<()> {
        let players = self.players.ok_or_else(|| {
            ReplayError::new(ReplayErrorVariant::MalformedField {
                field: "players".to_string(),
                reason: "a replay must declare its player count".to_string(),
                text: String::new(),
            })
        })?;
        for player in 0..players {
            self.line.expect_keyword("s")?;
            let field = format!("scores.{player}");
            let scores = self.line.decode(&[(DataType::Scores, field.as_str())], 0)?;
            self.scores.extend(scores.into_iter().map(Param::into_json));
            if player + 1 != players {
                self.advance()?;
            }
        }
        Ok(())
    }

    fn build(&mut self) -> Value {
        let mut map = std::mem::take(&mut self.map_header);
        map.insert(
            "data".to_string(),
            Value::Array(self.map_rows.drain(..).map(Value::String).collect()),
        );
        let mut document = std::mem::take(&mut self.header);
        document.insert("revision".to_string(), LEGACY_REVISION.into());
        document.insert("map".to_string(), Value::Object(map));
        document.insert(
            "pirates".to_string(),
            Value::Array(std::mem::take(&mut self.entities)),
        );
        document.insert(
            "scores".to_string(),
            Value::Array(std::mem::take(&mut self.scores)),
        );
        Value::Object(document)
    }
}

fn check_bound(field: &str, value: Option<u64>, limit: u64) -> ReplayResult<()> {
    match value {
        Some(value) if value >= limit => {
            ReplayError::new_result(ReplayErrorVariant::OutOfRangeIndex {
                field: field.to_string(),
                value: value as i64,
                min: 0,
                max: Some(limit as i64 - 1),
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converts_minimal_replay() {
        let document =
            convert_legacy("v pirates 1\nplayers 1\nm %.\nm .%\na 0 0 0 1 0 n\ns 5.0\n").unwrap();
        assert_eq!(document["revision"], json!(3));
        assert_eq!(document["players"], json!(1));
        assert_eq!(document["map"]["data"], json!(["%.", ".%"]));
        assert_eq!(document["pirates"], json!([[0, 0, 0, 1, 0, ["n"]]]));
        assert_eq!(document["scores"], json!([[5.0]]));
    }

    #[test]
    fn test_header_parameters_are_kept() {
        let document = convert_legacy(
            "v pirates 1\nplayers 2\nrows 1\ncols 3\nturns 10\ncutoff turn limit reached\nm ...\ns 0 1\ns 2\n",
        )
        .unwrap();
        assert_eq!(document["map"]["rows"], json!(1));
        assert_eq!(document["map"]["cols"], json!(3));
        assert_eq!(document["turns"], json!(10));
        assert_eq!(document["cutoff"], json!("turn limit reached"));
        assert_eq!(document["scores"], json!([[0.0, 1.0], [2.0]]));
    }

    #[test]
    fn test_map_file_letters_become_entities() {
        let document = convert_legacy("players 2\nm a.%\nm .B.\n").unwrap();
        assert_eq!(
            document["pirates"],
            json!([[0, 0, 0, 1, 0, ["-"]], [1, 1, 0, 1, 1, ["-"]]])
        );
        assert_eq!(document["scores"], json!([[0], [0]]));
    }

    #[test]
    fn test_wrong_game_name() {
        let error = convert_legacy("v ants 1\nplayers 1\nm .\ns 0\n").unwrap_err();
        assert!(matches!(
            error.variant,
            ReplayErrorVariant::UnsupportedFormatVersion { .. }
        ));
        assert_eq!(error.line.as_deref(), Some("v ants 1"));
    }

    #[test]
    fn test_map_width_mismatch() {
        let error = convert_legacy("v pirates 1\nplayers 1\nm ...\nm ..\ns 0\n").unwrap_err();
        assert_eq!(
            error.variant,
            ReplayErrorVariant::InconsistentMapWidth {
                row: 1,
                expected: 3,
                found: 2
            }
        );
        assert_eq!(error.line.as_deref(), Some("m .."));
    }

    #[test]
    fn test_entity_bounds_are_checked_inline() {
        let error =
            convert_legacy("v pirates 1\nplayers 1\nm ..\na 0 2 0 1 0 n\ns 0\n").unwrap_err();
        assert!(matches!(
            error.variant,
            ReplayErrorVariant::OutOfRangeIndex { ref field, value: 2, .. } if field == "col"
        ));
        let error =
            convert_legacy("v pirates 1\nplayers 1\nm ..\na 0 1 0 1 1 n\ns 0\n").unwrap_err();
        assert!(matches!(
            error.variant,
            ReplayErrorVariant::OutOfRangeIndex { ref field, .. } if field == "owner"
        ));
    }

    #[test]
    fn test_orders_must_cover_lifespan() {
        let error =
            convert_legacy("v pirates 1\nplayers 1\nm ..\na 0 0 0 4 0 n\ns 0\n").unwrap_err();
        assert!(matches!(
            error.variant,
            ReplayErrorVariant::MalformedField { ref field, .. } if field == "orders"
        ));
        assert!(convert_legacy("v pirates 1\nplayers 1\nm ..\na 0 0 0 3 0 nn\ns 0\n").is_ok());
    }

    #[test]
    fn test_trailing_records_fail() {
        let error = convert_legacy("v pirates 1\nplayers 1\nm ..\ns 0\ns 1\n").unwrap_err();
        assert!(matches!(
            error.variant,
            ReplayErrorVariant::TrailingData { .. }
        ));
        assert_eq!(error.line.as_deref(), Some("s 1"));
    }

    #[test]
    fn test_truncated_replay() {
        let error = convert_legacy("v pirates 1\nplayers 2\nm ..\ns 0\n").unwrap_err();
        assert_eq!(error.variant, ReplayErrorVariant::UnexpectedEndOfInput);
        assert_eq!(error.line.as_deref(), Some("s 0"));
    }
}
