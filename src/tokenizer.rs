use crate::*;

/// One non-empty, non-comment line of legacy replay text, split into a
/// lowercase keyword and the unsplit parameter remainder.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenLine {
    pub line: String,
    pub keyword: String,
    pub params: String,
}

impl TokenLine {
    pub fn new(line: &str) -> Self {
        let (keyword, params) = split_token(line);
        Self {
            line: line.to_string(),
            keyword: keyword.to_lowercase(),
            params: params.to_string(),
        }
    }

    pub fn expect_keyword(&self, keyword: &str) -> ReplayResult<&Self> {
        if self.keyword != keyword {
            return ReplayError::new_result(ReplayErrorVariant::UnexpectedKeyword {
                expected: keyword.to_string(),
                found: self.keyword.clone(),
            })
            .map_err(|e| e.with_line(&self.line));
        }
        Ok(self)
    }

    /// Runs the decoders over the parameter remainder; see [`apply_all`].
    pub fn decode(&self, fields: &[(DataType, &str)], optional: usize) -> ReplayResult<Vec<Param>> {
        apply_all(&self.params, fields, optional).map_err(|e| e.with_line(&self.line))
    }
}

/// Splits at the first whitespace run, returning the leading token and the
/// rest with its leading whitespace removed.
pub fn split_token(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(index) => (&text[..index], text[index..].trim_start()),
        None => (text, ""),
    }
}

fn is_ignored(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Forward-only cursor over the [`TokenLine`]s of a legacy replay or map.
#[derive(Debug)]
pub struct Tokenizer {
    lines: std::vec::IntoIter<TokenLine>,
}

impl Tokenizer {
    pub fn new(text: &str) -> Self {
        let lines: Vec<_> = text
            .lines()
            .filter(|line| !is_ignored(line))
            .map(|line| TokenLine::new(line.trim()))
            .collect();
        Self {
            lines: lines.into_iter(),
        }
    }

    pub fn next(&mut self) -> ReplayResult<TokenLine> {
        self.lines
            .next()
            .ok_or_else(|| ReplayError::new(ReplayErrorVariant::UnexpectedEndOfInput))
    }

    pub fn has_more(&self) -> bool {
        self.lines.len() > 0
    }

    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}
