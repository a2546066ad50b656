/// Validated Tool Arguments
///
/// Arguments reach handlers only after the dispatcher has coerced them
/// against the tool's input schema. Handlers therefore read typed values
/// instead of poking at raw JSON.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::core::error::ToolError;

/// A single coerced argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Str(String),
    Number(f64),
    Integer(i64),
    Bool(bool),
    Object(Map<String, Value>),
    List(Vec<String>),
    Records(Vec<Map<String, Value>>),
}

impl ArgValue {
    /// Convert back to JSON, e.g. for building a request body.
    pub fn to_json(&self) -> Value {
        match self {
            ArgValue::Str(s) => Value::String(s.clone()),
            ArgValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ArgValue::Integer(i) => Value::from(*i),
            ArgValue::Bool(b) => Value::Bool(*b),
            ArgValue::Object(map) => Value::Object(map.clone()),
            ArgValue::List(items) => Value::from(items.clone()),
            ArgValue::Records(items) => {
                Value::Array(items.iter().cloned().map(Value::Object).collect())
            }
        }
    }
}

/// Coerced arguments for one tool call, keyed by argument name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: BTreeMap<String, ArgValue>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ArgValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Optional string argument. Empty strings count as absent.
    pub fn str(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ArgValue::Str(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// Required string argument.
    pub fn required_str(&self, name: &str) -> Result<&str, ToolError> {
        self.str(name)
            .ok_or_else(|| ToolError::MissingArgument(name.to_string()))
    }

    /// Numeric argument; integers widen to `f64`.
    pub fn f64(&self, name: &str) -> Option<f64> {
        match self.values.get(name) {
            Some(ArgValue::Number(n)) => Some(*n),
            Some(ArgValue::Integer(i)) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn required_f64(&self, name: &str) -> Result<f64, ToolError> {
        self.f64(name)
            .ok_or_else(|| ToolError::MissingArgument(name.to_string()))
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ArgValue::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(ArgValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn object(&self, name: &str) -> Option<&Map<String, Value>> {
        match self.values.get(name) {
            Some(ArgValue::Object(map)) => Some(map),
            _ => None,
        }
    }

    pub fn list(&self, name: &str) -> Option<&[String]> {
        match self.values.get(name) {
            Some(ArgValue::List(items)) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn records(&self, name: &str) -> Option<&[Map<String, Value>]> {
        match self.values.get(name) {
            Some(ArgValue::Records(items)) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Copy the named arguments that are present into a JSON object.
    ///
    /// Used to build PATCH/POST bodies where only supplied fields are sent.
    pub fn collect_json(&self, names: &[&str]) -> Map<String, Value> {
        let mut body = Map::new();
        for name in names {
            if let Some(value) = self.values.get(*name) {
                body.insert((*name).to_string(), value.to_json());
            }
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_reads_as_absent() {
        let mut args = Arguments::new();
        args.insert("project_id", ArgValue::Str(String::new()));
        assert_eq!(args.str("project_id"), None);
        assert!(matches!(
            args.required_str("project_id"),
            Err(ToolError::MissingArgument(name)) if name == "project_id"
        ));
    }

    #[test]
    fn collect_json_skips_absent_fields() {
        let mut args = Arguments::new();
        args.insert("name", ArgValue::Str("nightly".into()));
        args.insert("cpu", ArgValue::Integer(2));
        let body = args.collect_json(&["name", "cpu", "memory"]);
        assert_eq!(Value::Object(body), serde_json::json!({"name": "nightly", "cpu": 2}));
    }
}
