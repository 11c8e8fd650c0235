use crate::*;

/// A decoded value together with the parameter text left unconsumed.
pub type Decoded<'a, T> = (T, &'a str);

fn malformed(field: &str, reason: &str, text: &str) -> ReplayError {
    ReplayError::new(ReplayErrorVariant::MalformedField {
        field: field.to_string(),
        reason: reason.to_string(),
        text: text.to_string(),
    })
}

/// Takes the whole remainder verbatim.
pub fn decode_string<'a>(params: &'a str, _field: &str) -> ReplayResult<Decoded<'a, String>> {
    Ok((params.to_string(), ""))
}

pub fn decode_ident<'a>(params: &'a str, _field: &str) -> ReplayResult<Decoded<'a, String>> {
    let (token, rest) = split_token(params);
    Ok((token.to_string(), rest))
}

pub fn decode_uint<'a>(params: &'a str, field: &str) -> ReplayResult<Decoded<'a, u64>> {
    let (token, rest) = split_token(params);
    let value = token
        .parse::<u64>()
        .map_err(|_| malformed(field, "must be an unsigned integer", token))?;
    Ok((value, rest))
}

pub fn decode_posint<'a>(params: &'a str, field: &str) -> ReplayResult<Decoded<'a, u64>> {
    let (value, rest) = decode_uint(params, field)?;
    if value == 0 {
        return Err(malformed(field, "must be a positive integer", "0"));
    }
    Ok((value, rest))
}

pub fn decode_number<'a>(params: &'a str, field: &str) -> ReplayResult<Decoded<'a, f64>> {
    let (token, rest) = split_token(params);
    match token.parse::<f64>() {
        Ok(value) if !value.is_nan() => Ok((value, rest)),
        _ => Err(malformed(field, "is not a number", token)),
    }
}

/// Decodes one token into a per-turn order list, one symbol per turn.
pub fn decode_orders<'a>(params: &'a str, _field: &str) -> ReplayResult<Decoded<'a, Vec<Order>>> {
    let (token, rest) = split_token(params);
    let orders = token
        .chars()
        .map(|symbol| {
            Order::from_symbol(symbol)
                .ok_or_else(|| ReplayError::new(ReplayErrorVariant::InvalidOrderSymbol { symbol }))
        })
        .collect::<ReplayResult<Vec<_>>>()?;
    Ok((orders, rest))
}

/// Consumes the whole remainder as a whitespace separated list of scores.
pub fn decode_scores<'a>(params: &'a str, field: &str) -> ReplayResult<Decoded<'a, Vec<f64>>> {
    let mut tokens: Vec<&str> = params.split_whitespace().collect();
    if tokens.is_empty() {
        tokens.push("");
    }
    let scores = tokens
        .iter()
        .enumerate()
        .map(|(index, token)| match token.parse::<f64>() {
            Ok(value) if !value.is_nan() => Ok(value),
            _ => Err(malformed(
                &format!("{field}.{index}"),
                "score is not a number",
                token,
            )),
        })
        .collect::<ReplayResult<Vec<_>>>()?;
    Ok((scores, ""))
}

/// Which decoder to run for a parameter position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    String,
    Ident,
    UInt,
    PosInt,
    Number,
    Orders,
    Scores,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Str(String),
    UInt(u64),
    Number(f64),
    Orders(Vec<Order>),
    Scores(Vec<f64>),
}

impl Param {
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Param::UInt(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Param::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_json(self) -> serde_json::Value {
        match self {
            Param::Str(value) => value.into(),
            Param::UInt(value) => value.into(),
            Param::Number(value) => value.into(),
            Param::Orders(orders) => orders
                .iter()
                .map(|order| order.symbol().to_string())
                .collect::<Vec<_>>()
                .into(),
            Param::Scores(scores) => scores.into(),
        }
    }
}

impl DataType {
    pub fn decode<'a>(self, params: &'a str, field: &str) -> ReplayResult<Decoded<'a, Param>> {
        Ok(match self {
            DataType::String => {
                let (value, rest) = decode_string(params, field)?;
                (Param::Str(value), rest)
            }
            DataType::Ident => {
                let (value, rest) = decode_ident(params, field)?;
                (Param::Str(value), rest)
            }
            DataType::UInt => {
                let (value, rest) = decode_uint(params, field)?;
                (Param::UInt(value), rest)
            }
            DataType::PosInt => {
                let (value, rest) = decode_posint(params, field)?;
                (Param::UInt(value), rest)
            }
            DataType::Number => {
                let (value, rest) = decode_number(params, field)?;
                (Param::Number(value), rest)
            }
            DataType::Orders => {
                let (value, rest) = decode_orders(params, field)?;
                (Param::Orders(value), rest)
            }
            DataType::Scores => {
                let (value, rest) = decode_scores(params, field)?;
                (Param::Scores(value), rest)
            }
        })
    }
}

/// Applies `fields` left to right, each consuming a prefix of `params`. The
/// last `optional` decoders are skipped once the text runs out. Text left over
/// after every decoder ran is an error.
pub fn apply_all(
    params: &str,
    fields: &[(DataType, &str)],
    optional: usize,
) -> ReplayResult<Vec<Param>> {
    let mut work = params;
    let mut decoded = Vec::with_capacity(fields.len());
    for (index, (data_type, field)) in fields.iter().enumerate() {
        if !work.is_empty() || fields.len() - index > optional {
            let (value, rest) = data_type.decode(work, field)?;
            decoded.push(value);
            work = rest;
        }
    }
    if !work.is_empty() {
        return ReplayError::new_result(ReplayErrorVariant::TrailingData {
            text: work.to_string(),
        });
    }
    Ok(decoded)
}
