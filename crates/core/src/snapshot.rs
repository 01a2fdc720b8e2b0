//! Telemetry snapshots: one immutable capture of game or aircraft state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A scalar telemetry value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    /// The numeric value, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// One capture of telemetry fields at a point in time.
///
/// Fields are keyed by name and kept in sorted order so serialized context is
/// stable between ticks. Nested JSON objects flatten into dotted keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    captured_at: DateTime<Utc>,
    fields: BTreeMap<String, Value>,
}

impl Snapshot {
    /// Capture the given fields, stamped with the current time.
    pub fn new<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::at(Utc::now(), fields)
    }

    /// Capture the given fields with an explicit timestamp.
    pub fn at<K, I>(captured_at: DateTime<Utc>, fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self {
            captured_at,
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// A snapshot with no fields (nothing captured yet).
    pub fn empty() -> Self {
        Self::new(Vec::<(String, Value)>::new())
    }

    /// Build a snapshot from a JSON document.
    ///
    /// Objects flatten into dotted keys (`player.health`); arrays and nulls are
    /// kept as their JSON text. A non-object root is stored under `value`.
    pub fn from_json(json: &serde_json::Value) -> Self {
        let mut fields = BTreeMap::new();
        match json {
            serde_json::Value::Object(_) => flatten_into(&mut fields, None, json),
            other => flatten_into(&mut fields, Some("value"), other),
        }
        Self {
            captured_at: Utc::now(),
            fields,
        }
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Numeric value of `key`, or `None` if absent or not a number.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(Value::as_f64)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The fields as a flat JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.fields).unwrap_or_default()
    }
}

fn flatten_into(out: &mut BTreeMap<String, Value>, prefix: Option<&str>, json: &serde_json::Value) {
    use serde_json::Value as Json;

    match json {
        Json::Object(map) => {
            for (key, child) in map {
                let path = match prefix {
                    Some(p) => format!("{p}.{key}"),
                    None => key.clone(),
                };
                flatten_into(out, Some(&path), child);
            }
        }
        leaf => {
            let Some(key) = prefix else { return };
            let value = match leaf {
                Json::Bool(b) => Value::Bool(*b),
                Json::Number(n) => match n.as_f64() {
                    Some(f) => Value::Number(f),
                    None => Value::Text(n.to_string()),
                },
                Json::String(s) => Value::Text(s.clone()),
                other => Value::Text(other.to_string()),
            };
            out.insert(key.to_string(), value);
        }
    }
}
