//! Structured data parser
//!
//! Turns a sanitized model response into validated expense fields. Every
//! failure is a `ParseFailure` value; nothing in here panics on bad input.

use serde_json::{Map, Value};

use super::{ParseFailure, RequiredField};
use crate::models::{Category, ExpenseRecord, TextRequest, MAX_PRICE};

/// Currency markers models tend to glue onto amounts ("Rs 20", "₹20", "$4.50")
const CURRENCY_MARKERS: &[&str] = &["rs.", "rs", "inr", "usd", "eur", "gbp", "₹", "$", "€", "£"];

/// Price and category as extracted from the model output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpenseFields {
    pub price: f64,
    pub category: Category,
}

impl ExpenseFields {
    /// Attach the request the fields were extracted from
    pub fn into_record(self, request: &TextRequest) -> ExpenseRecord {
        ExpenseRecord {
            description: request.text().to_string(),
            price: self.price,
            category: self.category,
            sender_id: request.sender_id().map(str::to_string),
        }
    }
}

/// Parse a sanitized payload into expense fields.
///
/// Unknown categories are not an error: they normalize to `Miscellaneous`.
pub fn parse(sanitized: &str) -> Result<ExpenseFields, ParseFailure> {
    let object = decode_object(sanitized)?;

    let price = match object.get("price") {
        None | Some(Value::Null) => return Err(ParseFailure::MissingField(RequiredField::Price)),
        Some(value) => coerce_price(value)?,
    };

    let category = match object.get("category") {
        None | Some(Value::Null) => {
            return Err(ParseFailure::MissingField(RequiredField::Category))
        }
        Some(Value::String(s)) => Category::normalize(s),
        Some(_) => Category::Miscellaneous,
    };

    Ok(ExpenseFields { price, category })
}

/// Decode the payload as a JSON object.
///
/// Falls back to the outermost `{...}` slice when the model wrapped the object
/// in prose ("Here is the JSON: {...}").
fn decode_object(payload: &str) -> Result<Map<String, Value>, ParseFailure> {
    let payload = payload.trim();

    let value = match serde_json::from_str::<Value>(payload) {
        Ok(value) => value,
        Err(e) => match (payload.find('{'), payload.rfind('}')) {
            (Some(s), Some(end)) if s < end => serde_json::from_str(&payload[s..=end])
                .map_err(|_| ParseFailure::MalformedPayload(truncate(&e.to_string())))?,
            _ => return Err(ParseFailure::MalformedPayload(truncate(&e.to_string()))),
        },
    };

    match value {
        Value::Object(map) => Ok(map),
        other => Err(ParseFailure::MalformedPayload(format!(
            "expected an object, got {}",
            json_kind(&other)
        ))),
    }
}

fn coerce_price(value: &Value) -> Result<f64, ParseFailure> {
    let invalid = || ParseFailure::InvalidPrice(truncate(&value.to_string()));

    let amount = match value {
        Value::Number(n) => n.as_f64().ok_or_else(invalid)?,
        Value::String(s) => parse_amount(s).ok_or_else(invalid)?,
        _ => return Err(invalid()),
    };

    if !amount.is_finite() || !(0.0..=MAX_PRICE).contains(&amount) {
        return Err(invalid());
    }

    // -0.0 compares >= 0 but shouldn't be stored that way
    Ok(amount + 0.0)
}

/// Parse a numeric string, tolerating currency markers and thousands separators
fn parse_amount(raw: &str) -> Option<f64> {
    let mut s = raw.trim().to_lowercase();

    for marker in CURRENCY_MARKERS {
        if let Some(rest) = s.strip_prefix(marker) {
            s = rest.trim_start().to_string();
            break;
        }
    }
    for marker in CURRENCY_MARKERS {
        if let Some(rest) = s.strip_suffix(marker) {
            s = rest.trim_end().to_string();
            break;
        }
    }

    let s = s.replace(',', "");
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+')) {
        return None;
    }
    s.parse::<f64>().ok()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn truncate(s: &str) -> String {
    if s.chars().count() > 120 {
        format!("{}...", s.chars().take(120).collect::<String>())
    } else {
        s.to_string()
    }
}
