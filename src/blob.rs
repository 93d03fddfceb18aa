use std::io;

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use serde_json::{Map, Value};

use crate::error::PackError;

/// A JSON-bearing action parameter as the host hands it over.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Blob {
    #[default]
    Null,
    Text(String),
    Structured(Value),
}

impl From<&str> for Blob {
    fn from(value: &str) -> Self {
        Blob::Text(value.to_string())
    }
}

impl From<String> for Blob {
    fn from(value: String) -> Self {
        Blob::Text(value)
    }
}

impl From<Option<String>> for Blob {
    fn from(value: Option<String>) -> Self {
        value.map(Blob::Text).unwrap_or(Blob::Null)
    }
}

impl From<Value> for Blob {
    fn from(value: Value) -> Self {
        Blob::Structured(value)
    }
}

impl Blob {
    /// Normalizes the blob to a parsed value. Empty text counts as null.
    ///
    /// Text that is not valid JSON is kept as a JSON string unless `strict` is set,
    /// in which case it fails with [`PackError::InvalidInput`] naming `field`.
    pub fn canonicalize(&self, field: &str, strict: bool) -> Result<Value, PackError> {
        match self {
            Blob::Null => Ok(Value::Null),
            Blob::Text(text) if text.is_empty() => Ok(Value::Null),
            Blob::Text(text) => match serde_json::from_str::<Value>(text) {
                Ok(value) => Ok(value),
                Err(err) if strict => Err(PackError::InvalidInput {
                    field: field.to_string(),
                    message: err.to_string(),
                }),
                Err(_) => Ok(Value::String(text.clone())),
            },
            Blob::Structured(value) => Ok(value.clone()),
        }
    }

    /// True for a missing value or empty text, both of which the host sends for a blank cell.
    pub fn is_empty(&self) -> bool {
        match self {
            Blob::Null => true,
            Blob::Text(text) => text.is_empty(),
            Blob::Structured(_) => false,
        }
    }
}

// Largest integer an ECMAScript number holds exactly.
const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Writes numbers the way `JSON.stringify` does: `1.0` as `1`, `1e2` as `100`,
/// and integers beyond 2^53 rounded through an f64.
struct JsNumberFormatter;

impl Formatter for JsNumberFormatter {
    fn write_i64<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: i64) -> io::Result<()> {
        if value.unsigned_abs() > MAX_SAFE_INTEGER {
            return self.write_f64(writer, value as f64);
        }
        write!(writer, "{value}")
    }

    fn write_u64<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: u64) -> io::Result<()> {
        if value > MAX_SAFE_INTEGER {
            return self.write_f64(writer, value as f64);
        }
        write!(writer, "{value}")
    }

    fn write_f32<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f32) -> io::Result<()> {
        self.write_f64(writer, f64::from(value))
    }

    fn write_f64<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f64) -> io::Result<()> {
        let mut buffer = ryu_js::Buffer::new();
        writer.write_all(buffer.format(value).as_bytes())
    }
}

/// Integer-like keys ("0", "17") that ECMAScript objects enumerate first, ascending.
fn array_index(key: &str) -> Option<u32> {
    let index = key.parse::<u32>().ok()?;
    (index != u32::MAX && index.to_string() == key).then_some(index)
}

/// Reorders object keys into `JSON.parse` enumeration order: array-index keys ascending,
/// then the remaining keys in the order received.
fn js_key_order(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut indexed = Vec::new();
            let mut named = Vec::new();
            for (key, entry) in map {
                match array_index(key) {
                    Some(index) => indexed.push((index, key, entry)),
                    None => named.push((key, entry)),
                }
            }
            indexed.sort_by_key(|(index, _, _)| *index);
            let ordered = indexed
                .into_iter()
                .map(|(_, key, entry)| (key, entry))
                .chain(named)
                .map(|(key, entry)| (key.clone(), js_key_order(entry)))
                .collect::<Map<String, Value>>();
            Value::Object(ordered)
        }
        Value::Array(items) => Value::Array(items.iter().map(js_key_order).collect()),
        other => other.clone(),
    }
}

/// Compact text identical to `JSON.stringify` of the same parsed value.
pub fn canonical_json(value: &Value) -> Result<String, PackError> {
    let invalid = |message: String| PackError::InvalidInput {
        field: "input".to_string(),
        message,
    };
    let mut out = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut out, JsNumberFormatter);
    js_key_order(value)
        .serialize(&mut serializer)
        .map_err(|err| invalid(err.to_string()))?;
    String::from_utf8(out).map_err(|err| invalid(err.to_string()))
}
