use std::collections::BTreeMap;

use zbus::zvariant::{self, ObjectPath};

/// Holds a dynamically-typed property value.
///
/// This is the value model of the property table: everything a getter can produce and a setter
/// can receive. It converts losslessly into D-Bus variants.
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Value is a boolean.
    Bool(bool),

    /// Value is a 64-bit float.
    F64(f64),

    /// Value is a 64-bit integer (e.g. microsecond counts).
    I64(i64),

    /// Value is a string.
    String(String),

    /// Value is a D-Bus object path.
    ObjectPath(String),

    /// Value is a list of strings.
    Strings(Vec<String>),

    /// Value is a string-keyed map of other values.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Returns the value as a `Some(f64)` if it is a number, or `None` otherwise.
    ///
    /// Integers are widened, since D-Bus callers are not always careful about sending doubles.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::F64(val) => Some(val),
            Value::I64(val) => Some(val as f64),
            _ => None,
        }
    }

    /// Returns the value as a `Some(i64)` if it is a `Value::I64`, or `None` otherwise.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I64(val) => Some(val),
            _ => None,
        }
    }

    /// Returns the value as a `Some(&str)` if it is a string or an object path.
    pub fn as_str(&self) -> Option<&str> {
        match *self {
            Value::String(ref val) | Value::ObjectPath(ref val) => Some(val),
            _ => None,
        }
    }

    /// Returns the value as a `Some(&BTreeMap<String, Value>)` if it is a `Value::Map`.
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match *self {
            Value::Map(ref val) => Some(val),
            _ => None,
        }
    }

    /// Consumes `self` and returns the inner map if it is a `Value::Map`.
    pub fn into_map(self) -> Option<BTreeMap<String, Value>> {
        match self {
            Value::Map(val) => Some(val),
            _ => None,
        }
    }

    /// Convert a D-Bus variant into a `Value`.
    ///
    /// Returns `None` for types the property table never deals with (structs, dicts, fds, ...).
    pub fn from_variant(value: &zvariant::Value<'_>) -> Option<Value> {
        match value {
            zvariant::Value::Bool(v) => Some(Value::Bool(*v)),
            zvariant::Value::F64(v) => Some(Value::F64(*v)),
            zvariant::Value::U8(v) => Some(Value::I64(i64::from(*v))),
            zvariant::Value::I16(v) => Some(Value::I64(i64::from(*v))),
            zvariant::Value::U16(v) => Some(Value::I64(i64::from(*v))),
            zvariant::Value::I32(v) => Some(Value::I64(i64::from(*v))),
            zvariant::Value::U32(v) => Some(Value::I64(i64::from(*v))),
            zvariant::Value::I64(v) => Some(Value::I64(*v)),
            zvariant::Value::U64(v) => i64::try_from(*v).ok().map(Value::I64),
            zvariant::Value::Str(v) => Some(Value::String(v.to_string())),
            zvariant::Value::ObjectPath(v) => Some(Value::ObjectPath(v.to_string())),
            zvariant::Value::Value(v) => Value::from_variant(v),
            _ => None,
        }
    }

    /// Convert into a D-Bus variant.
    ///
    /// Object paths that are not valid D-Bus paths are sent as plain strings.
    pub fn to_variant(&self) -> zvariant::Value<'static> {
        match self {
            Value::Bool(v) => zvariant::Value::from(*v),
            Value::F64(v) => zvariant::Value::from(*v),
            Value::I64(v) => zvariant::Value::from(*v),
            Value::String(v) => zvariant::Value::from(v.clone()),
            Value::ObjectPath(v) => match ObjectPath::try_from(v.clone()) {
                Ok(path) => zvariant::Value::from(path),
                Err(_) => zvariant::Value::from(v.clone()),
            },
            Value::Strings(v) => zvariant::Value::from(v.clone()),
            Value::Map(map) => {
                let entries: std::collections::HashMap<String, zvariant::Value<'static>> = map
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_variant()))
                    .collect();
                zvariant::Value::from(entries)
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Value {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Value {
        Value::F64(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Value {
        Value::I64(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Value {
        Value::String(value)
    }
}

impl<'a> From<&'a str> for Value {
    fn from(string: &'a str) -> Value {
        Value::String(String::from(string))
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(value: BTreeMap<String, Value>) -> Value {
        Value::Map(value)
    }
}
