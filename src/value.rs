//! The plain structured values produced by evaluating a target.

use serde_json::json;

/// The result of a scrape: a scalar, an ordered sequence, or a named
/// mapping. `E` is the driver's element handle type, which surfaces here
/// only through the `Raw` projection mode.
///
/// Mappings preserve insertion order, so a target's declared key order is
/// the key order of its result.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<E> {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Seq(Vec<Value<E>>),
    Map(Vec<(String, Value<E>)>),
    /// An opaque element handle, produced by [`crate::Projection::Raw`].
    Element(E),
}

impl<E> Value<E> {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Looks up a key in a `Map` value.
    pub fn get(&self, key: &str) -> Option<&Value<E>> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Coerces the value to a string, the way scalar results are used as
    /// sub-scrape sources or mapping keys. Sequences, mappings and raw
    /// element handles coerce to the empty string.
    pub fn coerce_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => String::new(),
        }
    }

    /// Splices nested sequences into this one, at most `depth` levels deep.
    /// Non-sequence values are returned unchanged.
    pub fn flattened(self, depth: usize) -> Self {
        match self {
            Value::Seq(items) if depth > 0 => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Seq(inner) => match Value::Seq(inner).flattened(depth - 1) {
                            Value::Seq(spliced) => out.extend(spliced),
                            other => out.push(other),
                        },
                        other => out.push(other),
                    }
                }
                Value::Seq(out)
            }
            other => other,
        }
    }

    /// Rebuilds a sequence of `[key, value]` pairs into a mapping.
    /// Items that are not pairs are dropped; keys are string-coerced.
    pub fn into_entries(self) -> Self {
        match self {
            Value::Seq(items) => {
                let mut map = Vec::with_capacity(items.len());
                for item in items {
                    if let Value::Seq(pair) = item {
                        let mut parts = pair.into_iter();
                        let key = parts.next().map(|k| k.coerce_string()).unwrap_or_default();
                        let value = parts.next().unwrap_or(Value::Null);
                        map.push((key, value));
                    }
                }
                Value::Map(map)
            }
            other => other,
        }
    }

    /// Converts into a `serde_json::Value`. Lossy: raw element handles
    /// become null and mapping key order follows `serde_json`'s map type.
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => json!(b),
            Value::Number(n) => json!(n),
            Value::String(s) => json!(s),
            Value::Seq(items) => {
                serde_json::Value::Array(items.into_iter().map(Value::into_json).collect())
            }
            Value::Map(entries) => serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, v.into_json()))
                    .collect(),
            ),
            Value::Element(_) => serde_json::Value::Null,
        }
    }
}

impl<E> From<serde_json::Value> for Value<E> {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Seq(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl<E> From<&str> for Value<E> {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl<E> From<String> for Value<E> {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<E> From<bool> for Value<E> {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<E> From<f64> for Value<E> {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl<E> From<i64> for Value<E> {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl<E> From<Vec<Value<E>>> for Value<E> {
    fn from(items: Vec<Value<E>>) -> Self {
        Value::Seq(items)
    }
}
