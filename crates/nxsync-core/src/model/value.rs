// # Property Values
//
// Desired values are always concrete (`Value`). Values read back from the
// device are `Observed`: booleans arrive as a tri-state because the device
// may report a flag as not configured at all.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The type a property carries on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Integer,
    Boolean,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::String => "string",
            ValueKind::Integer => "integer",
            ValueKind::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// A concrete property value, as declared or as written to the device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Value {
    /// The kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Boolean,
            Value::Int(_) => ValueKind::Integer,
            Value::Str(_) => ValueKind::String,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Coerce a declared JSON value into the kind a property expects
    ///
    /// Returns `None` when the JSON value cannot represent that kind.
    /// Manifests commonly quote numbers and booleans, so numeric strings
    /// and `"true"`/`"false"` are accepted.
    pub fn from_json(kind: ValueKind, raw: &serde_json::Value) -> Option<Value> {
        use serde_json::Value as Json;

        match (kind, raw) {
            (ValueKind::String, Json::String(s)) => Some(Value::Str(s.clone())),
            (ValueKind::String, Json::Number(n)) => Some(Value::Str(n.to_string())),
            (ValueKind::Integer, Json::Number(n)) => n.as_i64().map(Value::Int),
            (ValueKind::Integer, Json::String(s)) => s.trim().parse().ok().map(Value::Int),
            (ValueKind::Boolean, Json::Bool(b)) => Some(Value::Bool(*b)),
            (ValueKind::Boolean, Json::String(s)) => match s.as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Whether the device already holds this value
    ///
    /// `Unset` and an unknown flag never match a concrete value.
    pub fn matches(&self, observed: &Observed) -> bool {
        match (self, observed) {
            (Value::Str(want), Observed::Str(have)) => want == have,
            (Value::Int(want), Observed::Int(have)) => want == have,
            (Value::Bool(want), Observed::Flag(state)) => state.as_bool() == Some(*want),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

/// A boolean as the device reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriState {
    True,
    False,
    #[default]
    Unknown,
}

impl TriState {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            TriState::True => Some(true),
            TriState::False => Some(false),
            TriState::Unknown => None,
        }
    }
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value { TriState::True } else { TriState::False }
    }
}

impl From<Option<bool>> for TriState {
    fn from(value: Option<bool>) -> Self {
        value.map_or(TriState::Unknown, TriState::from)
    }
}

impl fmt::Display for TriState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TriState::True => "true",
            TriState::False => "false",
            TriState::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A property value as read from the device
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Observed {
    Str(String),
    Int(i64),
    Flag(TriState),
    /// The device reports no value for a non-boolean property
    #[default]
    Unset,
}

impl Observed {
    /// Normalize a raw provider read for a property of the given kind
    pub fn normalize(kind: ValueKind, raw: Option<Value>) -> Observed {
        match (kind, raw) {
            (ValueKind::Boolean, Some(Value::Bool(b))) => Observed::Flag(b.into()),
            (ValueKind::Boolean, _) => Observed::Flag(TriState::Unknown),
            (ValueKind::Integer, Some(Value::Str(s))) => match s.trim().parse() {
                Ok(n) => Observed::Int(n),
                Err(_) => Observed::Str(s),
            },
            (_, Some(Value::Int(n))) => Observed::Int(n),
            (_, Some(Value::Str(s))) => Observed::Str(s),
            (_, Some(Value::Bool(b))) => Observed::Str(b.to_string()),
            (_, None) => Observed::Unset,
        }
    }

    /// The concrete value, if the device reported one
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Observed::Str(s) => Some(Value::Str(s.clone())),
            Observed::Int(n) => Some(Value::Int(*n)),
            Observed::Flag(state) => state.as_bool().map(Value::Bool),
            Observed::Unset => None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.to_value().is_some()
    }
}

impl fmt::Display for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observed::Str(s) => f.write_str(s),
            Observed::Int(n) => write!(f, "{n}"),
            Observed::Flag(state) => write!(f, "{state}"),
            Observed::Unset => Ok(()),
        }
    }
}
