//! Native values handed back to callers.

use std::collections::HashMap;

use base64::Engine;
use serde_json::{Map, Value};

/// A decoded datum in caller-facing form.
///
/// Integers widen to `i64` and floats to `f64`; enums become their symbol
/// text. Record fields keep their declared order, map entries do not.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
    Text(String),
    /// Record fields as (name, value) pairs in declared order.
    Record(Vec<(String, NativeValue)>),
    Array(Vec<NativeValue>),
    Map(HashMap<String, NativeValue>),
    /// Union value labelled with its branch type, produced when type tracking is on.
    Tagged {
        type_name: String,
        value: Box<NativeValue>,
    },
}

impl NativeValue {
    /// Convert to a `serde_json::Value`.
    ///
    /// Bytes are rendered as standard base64 strings. Non-finite floats
    /// become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            NativeValue::Null => Value::Null,
            NativeValue::Bool(b) => Value::Bool(*b),
            NativeValue::Int(i) => Value::Number((*i).into()),
            NativeValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            NativeValue::Bytes(b) => {
                Value::String(base64::engine::general_purpose::STANDARD.encode(b))
            }
            NativeValue::Text(s) => Value::String(s.clone()),
            NativeValue::Record(fields) => {
                let mut map = Map::new();
                for (name, value) in fields {
                    map.insert(name.clone(), value.to_json());
                }
                Value::Object(map)
            }
            NativeValue::Array(items) => Value::Array(items.iter().map(|v| v.to_json()).collect()),
            NativeValue::Map(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(key.clone(), value.to_json());
                }
                Value::Object(map)
            }
            NativeValue::Tagged { type_name, value } => {
                let mut map = Map::new();
                map.insert(type_name.clone(), value.to_json());
                Value::Object(map)
            }
        }
    }

    /// Record field or map entry called `key`.
    pub fn get(&self, key: &str) -> Option<&NativeValue> {
        match self {
            NativeValue::Record(fields) => fields.iter().find(|(n, _)| n == key).map(|(_, v)| v),
            NativeValue::Map(entries) => entries.get(key),
            NativeValue::Tagged { value, .. } => value.get(key),
            _ => None,
        }
    }

    /// The value with any union tag removed.
    pub fn untagged(&self) -> &NativeValue {
        match self {
            NativeValue::Tagged { value, .. } => value.untagged(),
            other => other,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.untagged(), NativeValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.untagged() {
            NativeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.untagged() {
            NativeValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.untagged() {
            NativeValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.untagged() {
            NativeValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self.untagged() {
            NativeValue::Bytes(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[NativeValue]> {
        match self.untagged() {
            NativeValue::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Branch type name of a tagged union value.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            NativeValue::Tagged { type_name, .. } => Some(type_name.as_str()),
            _ => None,
        }
    }
}
