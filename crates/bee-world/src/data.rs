//! Free-form per-instance data

use bee_core::{BeeError, Result};
use toml::value::{Table, Value};

/// Key/value store objects use for their own per-instance state.
///
/// Values are TOML values, so the whole store can be written out and read
/// back as a TOML table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceData {
    values: Table,
}

impl InstanceData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let values: Table = toml::from_str(text)?;
        Ok(Self { values })
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(&self.values).map_err(|e| BeeError::ConfigError(e.to_string()))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.values.get_mut(key)
    }

    /// Store a value, returning the one it replaced
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(Value::as_integer)
    }

    /// Integers are widened so counters can be read as floats
    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.values
            .get(key)
            .and_then(|v| v.as_float().or_else(|| v.as_integer().map(|i| i as f64)))
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(Value::as_bool)
    }
}
