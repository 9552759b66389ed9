//! Keyword arguments for raw constructors

use crate::{BuildError, ObjectRef, Value};
use std::collections::btree_map::{self, BTreeMap};

/// Resolved keyword arguments, ordered by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kwargs {
    inner: BTreeMap<String, Value>,
}

impl Kwargs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.inner.insert(key.into(), value.into())
    }

    /// Builder: add argument
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.inner.remove(key)
    }

    /// Move an argument to a new key; no-op if `from` is absent
    pub fn rename(&mut self, from: &str, to: impl Into<String>) {
        if let Some(value) = self.inner.remove(from) {
            self.inner.insert(to.into(), value);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    // ========== Typed Accessors ==========

    fn require(&self, key: &str) -> Result<&Value, BuildError> {
        self.inner
            .get(key)
            .ok_or_else(|| BuildError::MissingArgument(key.to_string()))
    }

    fn wrong_type(key: &str, expected: &'static str, got: &Value) -> BuildError {
        BuildError::WrongType {
            arg: key.to_string(),
            expected,
            got: got.type_name(),
        }
    }

    pub fn text(&self, key: &str) -> Result<&str, BuildError> {
        let value = self.require(key)?;
        value.as_text().ok_or_else(|| Self::wrong_type(key, "Text", value))
    }

    pub fn int(&self, key: &str) -> Result<i64, BuildError> {
        let value = self.require(key)?;
        value.as_int().ok_or_else(|| Self::wrong_type(key, "Int", value))
    }

    pub fn float(&self, key: &str) -> Result<f64, BuildError> {
        let value = self.require(key)?;
        value.as_float().ok_or_else(|| Self::wrong_type(key, "Float", value))
    }

    pub fn bool(&self, key: &str) -> Result<bool, BuildError> {
        let value = self.require(key)?;
        value.as_bool().ok_or_else(|| Self::wrong_type(key, "Bool", value))
    }

    pub fn object(&self, key: &str) -> Result<&ObjectRef, BuildError> {
        let value = self.require(key)?;
        value.as_object().ok_or_else(|| Self::wrong_type(key, "Object", value))
    }

    pub fn list(&self, key: &str) -> Result<&[Value], BuildError> {
        let value = self.require(key)?;
        value.as_list().ok_or_else(|| Self::wrong_type(key, "List", value))
    }

    /// A list whose every element is an object
    pub fn objects(&self, key: &str) -> Result<Vec<ObjectRef>, BuildError> {
        self.list(key)?
            .iter()
            .map(|item| {
                item.as_object()
                    .cloned()
                    .ok_or_else(|| Self::wrong_type(key, "List<Object>", item))
            })
            .collect()
    }
}

impl FromIterator<(String, Value)> for Kwargs {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self { inner: iter.into_iter().collect() }
    }
}

impl IntoIterator for Kwargs {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl<'a> IntoIterator for &'a Kwargs {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}
