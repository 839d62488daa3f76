// Lenient field readers.
//
// The API is loose about types: revision ids arrive as numbers or strings,
// and a "string" field may hold anything. A field with the wrong type is
// treated as absent rather than failing the whole payload.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// JavaScript-style truthiness, used where the API signals with presence.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Accept a string, drop anything else.
pub fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

/// Accept a non-negative integer or a numeric string.
pub fn revision<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(as_revision))
}

pub fn as_revision(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Values of an object (in key order) or elements of an array, keeping
/// only strings.
pub fn string_values<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let strings = match value {
        Some(Value::Object(map)) => {
            map.into_iter().filter_map(|(_, v)| v.as_str().map(str::to_string)).collect()
        }
        Some(Value::Array(items)) => {
            items.into_iter().filter_map(|v| v.as_str().map(str::to_string)).collect()
        }
        _ => Vec::new(),
    };
    Ok(strings)
}
