//! JSON rendering of site operation results.
//!
//! The table hands numbers back as decimal strings. They are normalized here:
//! integral values become JSON integers, everything else a JSON float.

use aws_sdk_dynamodb::types::AttributeValue;
use serde_json::{json, Map, Number, Value};
use thiserror::Error;

use crate::sites::Outcome;
use crate::store::Item;

/// Decimal exponents past this are rejected; the table itself stops at 10^126.
const MAX_EXPONENT: i64 = 1_000;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CodecError {
    #[error("invalid number: {0}")]
    InvalidNumber(String),
    #[error("unsupported attribute type: {0}")]
    UnsupportedType(&'static str),
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Converts a store decimal into a JSON number.
///
/// Integral values keep every digit, whatever their size or notation
/// (`5.0`, `1E3`, 30-digit counters). Only values with a real fractional
/// part go through `f64`.
pub fn normalize_number(raw: &str) -> Result<Number, CodecError> {
    let raw = raw.trim();
    let invalid = || CodecError::InvalidNumber(raw.to_string());

    match parse_decimal(raw).ok_or_else(invalid)? {
        Decimal::Integral(digits) => digits.parse::<Number>().map_err(|_| invalid()),
        Decimal::Fractional => {
            let float: f64 = raw.parse().map_err(|_| invalid())?;
            Number::from_f64(float).ok_or_else(invalid)
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Decimal {
    /// Exact integer text, optionally signed, without leading zeros.
    Integral(String),
    Fractional,
}

/// Reads `[sign] digits [. digits] [e exponent]`, or `None` if `raw` is not
/// a decimal literal.
fn parse_decimal(raw: &str) -> Option<Decimal> {
    let (negative, unsigned) = match raw.as_bytes().first()? {
        b'-' => (true, &raw[1..]),
        b'+' => (false, &raw[1..]),
        _ => (false, raw),
    };

    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(at) => (&unsigned[..at], unsigned[at + 1..].parse::<i64>().ok()?),
        None => (unsigned, 0),
    };
    if !(-MAX_EXPONENT..=MAX_EXPONENT).contains(&exponent) {
        return None;
    }

    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part
        .bytes()
        .chain(frac_part.bytes())
        .all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let digits = format!("{int_part}{frac_part}");
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Some(Decimal::Integral("0".to_string()));
    }

    // value = digits * 10^scale
    let scale = exponent - frac_part.len() as i64;
    let integer = if scale >= 0 {
        format!("{digits}{}", "0".repeat(scale as usize))
    } else {
        let cut = scale.unsigned_abs() as usize;
        let trailing_zeros = digits.len() - digits.trim_end_matches('0').len();
        if trailing_zeros < cut {
            return Some(Decimal::Fractional);
        }
        digits[..digits.len() - cut].to_string()
    };

    Some(Decimal::Integral(if negative {
        format!("-{integer}")
    } else {
        integer
    }))
}

/// Converts one attribute. Only the scalar types a site record uses are accepted.
pub fn attribute_to_json(value: &AttributeValue) -> Result<Value, CodecError> {
    match value {
        AttributeValue::S(s) => Ok(Value::String(s.clone())),
        AttributeValue::N(n) => normalize_number(n).map(Value::Number),
        AttributeValue::Bool(b) => Ok(Value::Bool(*b)),
        AttributeValue::Null(_) => Ok(Value::Null),
        AttributeValue::B(_) => Err(CodecError::UnsupportedType("B")),
        AttributeValue::Bs(_) => Err(CodecError::UnsupportedType("BS")),
        AttributeValue::Ns(_) => Err(CodecError::UnsupportedType("NS")),
        AttributeValue::Ss(_) => Err(CodecError::UnsupportedType("SS")),
        AttributeValue::L(_) => Err(CodecError::UnsupportedType("L")),
        AttributeValue::M(_) => Err(CodecError::UnsupportedType("M")),
        _ => Err(CodecError::UnsupportedType("unknown")),
    }
}

pub fn item_to_json(item: &Item) -> Result<Map<String, Value>, CodecError> {
    item.iter()
        .map(|(name, value)| Ok((name.clone(), attribute_to_json(value)?)))
        .collect()
}

/// What a successful operation contributes to the response body.
pub trait Payload {
    fn write_into(&self, body: &mut Map<String, Value>) -> Result<(), CodecError>;
}

/// Create reports success with a message and no record.
impl Payload for () {
    fn write_into(&self, body: &mut Map<String, Value>) -> Result<(), CodecError> {
        body.insert("message".to_string(), json!("Item Added"));
        Ok(())
    }
}

impl Payload for Item {
    fn write_into(&self, body: &mut Map<String, Value>) -> Result<(), CodecError> {
        body.insert("data".to_string(), Value::Object(item_to_json(self)?));
        Ok(())
    }
}

/// Renders an operation outcome as the response body text.
pub fn encode<T: Payload>(outcome: &Outcome<T>) -> Result<String, CodecError> {
    let mut body = Map::new();
    match outcome {
        Outcome::Done(payload) => {
            body.insert("code".to_string(), json!("Success"));
            payload.write_into(&mut body)?;
        }
        Outcome::Miss(miss) => {
            body.insert("code".to_string(), json!("Error"));
            body.insert("message".to_string(), json!(miss.message()));
        }
    }
    serde_json::to_string(&body).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Body for requests rejected before any store call.
pub fn error_body(message: &str) -> String {
    json!({ "code": "Error", "message": message }).to_string()
}
