use std::backtrace::Backtrace;
use thiserror::Error;

/// [`ReplayErrorVariant`] enumerates everything that can go wrong while turning
/// raw replay text into a validated [`crate::ReplayDocument`]: tokenizing,
/// decoding parameters, converting the legacy line format and checking the
/// canonical document against the schema.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReplayErrorVariant {
    #[error("Replays in the format {found:?} are not supported, expected {expected:?}")]
    UnsupportedFormatVersion { expected: String, found: String },

    #[error("{field} is malformed: {reason} (found {text:?})")]
    MalformedField {
        field: String,
        reason: String,
        text: String,
    },

    #[error("The following unexpected additional data was found: {text:?}")]
    TrailingData { text: String },

    #[error("Invalid character {symbol:?} in orders line")]
    InvalidOrderSymbol { symbol: char },

    #[error("Map row {row} has {found} columns, but previous rows have {expected}")]
    InconsistentMapWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error(
        "Replay duration {duration} was established by {established_by:?}, but {source_field:?} fixes it at {declared}"
    )]
    DurationConflict {
        duration: usize,
        established_by: String,
        declared: usize,
        source_field: String,
    },

    #[error("{field} should be within [{min} .. {}], but was found to be {value}", .max.map_or(String::new(), |m| m.to_string()))]
    OutOfRangeIndex {
        field: String,
        value: i64,
        min: i64,
        max: Option<i64>,
    },

    #[error("Tried to read past the end of the input. Is it truncated?")]
    UnexpectedEndOfInput,

    #[error("Expected keyword {expected:?}, but {found:?} found")]
    UnexpectedKeyword { expected: String, found: String },

    #[error("Invalid character {character:?} in map. Zero based row/col: {row}/{col}")]
    InvalidMapCharacter { character: char, row: usize, col: usize },

    #[error("Structured replay is not valid JSON: {message}")]
    Json { message: String },
}

impl From<serde_json::Error> for ReplayErrorVariant {
    fn from(error: serde_json::Error) -> Self {
        ReplayErrorVariant::Json {
            message: error.to_string(),
        }
    }
}

/// [`ReplayError`] pairs a [`ReplayErrorVariant`] with its backtrace and, for
/// errors raised while reading the line format, the raw line that caused it.
#[derive(Debug)]
pub struct ReplayError {
    pub backtrace: Backtrace,
    pub variant: ReplayErrorVariant,
    pub line: Option<String>,
}

impl ReplayError {
    pub fn new(variant: ReplayErrorVariant) -> Self {
        Self {
            backtrace: Backtrace::capture(),
            variant,
            line: None,
        }
    }

    pub fn new_result<T>(variant: ReplayErrorVariant) -> Result<T, Self> {
        Err(Self::new(variant))
    }

    /// Attaches the offending source line unless an inner call already did.
    pub fn with_line(mut self, line: &str) -> Self {
        if self.line.is_none() {
            self.line = Some(line.to_string());
        }
        self
    }
}

impl From<ReplayErrorVariant> for ReplayError {
    fn from(variant: ReplayErrorVariant) -> Self {
        Self::new(variant)
    }
}

impl From<serde_json::Error> for ReplayError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(error.into())
    }
}

impl std::fmt::Display for ReplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.line {
            Some(line) => write!(f, "{}\n{}", line, self.variant),
            None => write!(f, "{}", self.variant),
        }
    }
}

impl std::error::Error for ReplayError {}

#[allow(clippy::result_large_err)]
pub type ReplayResult<T> = Result<T, ReplayError>;
