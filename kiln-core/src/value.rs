//! Typed values handed to constructors
//!
//! Loaders turn raw input (plain nested maps and sequences) into `Value`s.
//! Besides the JSON-like scalars and containers a value can hold a reference
//! to an object compiled earlier in the session.

use crate::ObjectRef;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Raw user input as produced by the file-format pre-pass
pub type Raw = serde_json::Value;

/// Typed constructor argument
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Object(ObjectRef),
}

impl Value {
    /// Convert raw input without interpretation.
    ///
    /// Integers that fit in `i64` become `Int`, every other number `Float`.
    pub fn from_raw(raw: &Raw) -> Self {
        match raw {
            Raw::Null => Value::Null,
            Raw::Bool(b) => Value::Bool(*b),
            Raw::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Raw::String(s) => Value::Text(s.clone()),
            Raw::Array(items) => Value::List(items.iter().map(Value::from_raw).collect()),
            Raw::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_raw(v)))
                    .collect(),
            ),
        }
    }

    // ========== Safe Accessors (never panic) ==========

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers widen to float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Text(_) => "Text",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Object(_) => "Object",
        }
    }

    /// Type name of a raw value, matching the names used for `Value`
    pub fn raw_type_name(raw: &Raw) -> &'static str {
        match raw {
            Raw::Null => "Null",
            Raw::Bool(_) => "Bool",
            Raw::Number(n) if n.is_i64() => "Int",
            Raw::Number(_) => "Float",
            Raw::String(_) => "Text",
            Raw::Array(_) => "List",
            Raw::Object(_) => "Map",
        }
    }
}

impl PartialEq for Value {
    /// Structural equality; objects compare by identity
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => ObjectRef::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Text(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            // Objects are opaque; only their identity is exported
            Value::Object(obj) => {
                let mut out = serializer.serialize_map(Some(2))?;
                out.serialize_entry("kind", obj.kind())?;
                out.serialize_entry("name", &obj.name())?;
                out.end()
            }
        }
    }
}

// ========== Conversions ==========

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
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

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_raw_numbers() {
        assert_eq!(Value::from_raw(&json!(3)), Value::Int(3));
        assert_eq!(Value::from_raw(&json!(2.5)), Value::Float(2.5));
    }

    #[test]
    fn test_from_raw_nested() {
        let v = Value::from_raw(&json!({"a": [1, "x", null], "b": true}));
        let map = v.as_map().unwrap();
        assert_eq!(map["b"], Value::Bool(true));
        let list = map["a"].as_list().unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[1].as_text(), Some("x"));
        assert!(list[2].is_null());
    }

    #[test]
    fn test_int_widens_to_float() {
        assert_eq!(Value::Int(4).as_float(), Some(4.0));
        assert_eq!(Value::Text("4".into()).as_float(), None);
    }

    #[test]
    fn test_raw_type_names_match_value_type_names() {
        for raw in [json!(null), json!(true), json!(1), json!(1.5), json!("s"), json!([]), json!({})] {
            assert_eq!(Value::raw_type_name(&raw), Value::from_raw(&raw).type_name());
        }
    }

    #[test]
    fn test_serialize_object_as_identity() {
        let obj = crate::Object::new("coordinate", ()).with_name("x").into_ref();
        let v = Value::List(vec![Value::Int(1), Value::Object(obj)]);
        let out = serde_json::to_value(&v).unwrap();
        assert_eq!(out, json!([1, {"kind": "coordinate", "name": "x"}]));
    }
}
