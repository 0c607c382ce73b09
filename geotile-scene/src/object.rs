use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A value held in an object's attribute store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Double(f64),
    DoubleArray(Vec<f64>),
    Integer(i64),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_f64_slice(&self) -> Option<&[f64]> {
        match self {
            Value::DoubleArray(v) => Some(v),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(value: Vec<f64>) -> Self {
        Value::DoubleArray(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

/// Ordered string keyed attribute map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, Value>);

impl Attributes {
    pub fn new() -> Self {
        Attributes::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Anything carrying a generic attribute store.
pub trait Object {
    fn attributes(&self) -> &Attributes;
    fn attributes_mut(&mut self) -> &mut Attributes;

    /// Stores a string attribute, replacing any previous value for `key`.
    fn set_value(&mut self, key: &str, value: &str) {
        self.attributes_mut().insert(key, value);
    }

    fn set_object(&mut self, key: &str, value: Value) {
        self.attributes_mut().insert(key, value);
    }

    fn get_value(&self, key: &str) -> Option<&str> {
        self.attributes().get(key).and_then(Value::as_str)
    }

    fn get_object(&self, key: &str) -> Option<&Value> {
        self.attributes().get(key)
    }
}

impl Object for Attributes {
    fn attributes(&self) -> &Attributes {
        self
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        self
    }
}
