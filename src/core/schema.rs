/// Tool Input Schemas
///
/// A tool declares its parameters as an `InputSchema`. The same declaration
/// is rendered to JSON Schema for `tools/list` and used by the dispatcher to
/// validate and coerce incoming arguments before a handler runs.

use serde_json::{Map, Value, json};

use crate::core::args::{ArgValue, Arguments};
use crate::core::error::ToolError;

/// Declared kind of a tool parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    String,
    Number,
    Integer,
    Boolean,
    /// A string restricted to a fixed set of values
    Enum(Vec<&'static str>),
    /// A JSON object, also accepted as a string containing one
    Object,
    /// A list of strings, also accepted as a comma-separated string
    StringList,
    /// A list of JSON objects, also accepted as a string containing one
    ObjectList,
}

impl ParamKind {
    fn label(&self) -> &'static str {
        match self {
            ParamKind::String => "a string",
            ParamKind::Number => "a number",
            ParamKind::Integer => "an integer",
            ParamKind::Boolean => "a boolean",
            ParamKind::Enum(_) => "one of the allowed values",
            ParamKind::Object => "a JSON object",
            ParamKind::StringList => "a list of strings",
            ParamKind::ObjectList => "a list of JSON objects",
        }
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
    pub required: bool,
    pub default: Option<Value>,
}

/// Ordered list of parameters a tool accepts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSchema {
    params: Vec<ParamSpec>,
}

impl InputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required parameter.
    pub fn required(mut self, name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        self.params.push(ParamSpec {
            name,
            kind,
            description,
            required: true,
            default: None,
        });
        self
    }

    /// Add an optional parameter without a default.
    pub fn optional(mut self, name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        self.params.push(ParamSpec {
            name,
            kind,
            description,
            required: false,
            default: None,
        });
        self
    }

    /// Add an optional parameter that takes `default` when omitted.
    pub fn with_default(
        mut self,
        name: &'static str,
        kind: ParamKind,
        description: &'static str,
        default: Value,
    ) -> Self {
        self.params.push(ParamSpec {
            name,
            kind,
            description,
            required: false,
            default: Some(default),
        });
        self
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Render as a JSON Schema object for MCP discovery.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.params {
            let mut prop = match &param.kind {
                ParamKind::String => json!({ "type": "string" }),
                ParamKind::Number => json!({ "type": "number" }),
                ParamKind::Integer => json!({ "type": "integer" }),
                ParamKind::Boolean => json!({ "type": "boolean" }),
                ParamKind::Enum(values) => json!({ "type": "string", "enum": values }),
                ParamKind::Object => json!({ "type": ["object", "string"] }),
                ParamKind::StringList => {
                    json!({ "type": ["array", "string"], "items": { "type": "string" } })
                }
                ParamKind::ObjectList => {
                    json!({ "type": ["array", "string"], "items": { "type": "object" } })
                }
            };
            if let Value::Object(map) = &mut prop {
                map.insert("description".into(), Value::String(param.description.into()));
                if let Some(default) = &param.default {
                    map.insert("default".into(), default.clone());
                }
            }
            properties.insert(param.name.to_string(), prop);
            if param.required {
                required.push(Value::String(param.name.to_string()));
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Validate raw call arguments and coerce them to typed values.
    ///
    /// `null` counts as absent. Undeclared arguments are dropped.
    pub fn validate(&self, raw: &Map<String, Value>) -> Result<Arguments, ToolError> {
        let mut args = Arguments::new();

        for param in &self.params {
            let supplied = raw.get(param.name).filter(|v| !v.is_null());
            let value = match (supplied, &param.default) {
                (Some(v), _) => v,
                (None, Some(default)) => default,
                (None, None) if param.required => {
                    return Err(ToolError::MissingArgument(param.name.to_string()));
                }
                (None, None) => continue,
            };
            args.insert(param.name, coerce(param, value)?);
        }

        for name in raw.keys() {
            if !self.params.iter().any(|p| p.name == name) {
                tracing::debug!(argument = %name, "ignoring undeclared argument");
            }
        }

        Ok(args)
    }
}

fn coerce(param: &ParamSpec, value: &Value) -> Result<ArgValue, ToolError> {
    let mismatch = || {
        ToolError::invalid(
            param.name,
            format!("expected {}, got {}", param.kind.label(), describe(value)),
        )
    };

    match &param.kind {
        ParamKind::String => match value {
            Value::String(s) => Ok(ArgValue::Str(s.clone())),
            Value::Number(n) => Ok(ArgValue::Str(n.to_string())),
            Value::Bool(b) => Ok(ArgValue::Str(b.to_string())),
            _ => Err(mismatch()),
        },
        ParamKind::Number => match value {
            Value::Number(n) => n.as_f64().map(ArgValue::Number).ok_or_else(mismatch),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(ArgValue::Number)
                .ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        ParamKind::Integer => match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(ArgValue::Integer(i))
                } else {
                    match n.as_f64() {
                        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                            Ok(ArgValue::Integer(f as i64))
                        }
                        _ => Err(mismatch()),
                    }
                }
            }
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(ArgValue::Integer)
                .map_err(|_| mismatch()),
            _ => Err(mismatch()),
        },
        ParamKind::Boolean => match value {
            Value::Bool(b) => Ok(ArgValue::Bool(*b)),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(ArgValue::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(ArgValue::Bool(false)),
            _ => Err(mismatch()),
        },
        ParamKind::Enum(allowed) => match value {
            Value::String(s) if allowed.contains(&s.as_str()) => Ok(ArgValue::Str(s.clone())),
            Value::String(s) => Err(ToolError::invalid(
                param.name,
                format!("'{}' is not one of: {}", s, allowed.join(", ")),
            )),
            _ => Err(mismatch()),
        },
        ParamKind::Object => match value {
            Value::Object(map) => Ok(ArgValue::Object(map.clone())),
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                Ok(Value::Object(map)) => Ok(ArgValue::Object(map)),
                _ => Err(ToolError::invalid(param.name, "expected a JSON object string")),
            },
            _ => Err(mismatch()),
        },
        ParamKind::StringList => match value {
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.trim().to_string()),
                    Value::Number(n) => Ok(n.to_string()),
                    _ => Err(mismatch()),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(ArgValue::List),
            Value::String(s) => Ok(ArgValue::List(
                s.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(String::from)
                    .collect(),
            )),
            _ => Err(mismatch()),
        },
        ParamKind::ObjectList => {
            let parsed;
            let items = match value {
                Value::Array(items) => items,
                Value::String(s) => {
                    parsed = serde_json::from_str::<Value>(s)
                        .map_err(|_| ToolError::invalid(param.name, "expected a JSON array string"))?;
                    match &parsed {
                        Value::Array(items) => items,
                        _ => return Err(ToolError::invalid(param.name, "expected a JSON array string")),
                    }
                }
                _ => return Err(mismatch()),
            };
            items
                .iter()
                .map(|item| match item {
                    Value::Object(map) => Ok(map.clone()),
                    _ => Err(ToolError::invalid(param.name, "every entry must be a JSON object")),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(ArgValue::Records)
        }
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test arguments must be an object"),
        }
    }

    fn schema() -> InputSchema {
        InputSchema::new()
            .required("a", ParamKind::Number, "first")
            .required("op", ParamKind::Enum(vec!["+", "-"]), "operator")
            .optional("tags", ParamKind::StringList, "tags")
            .with_default("cpu", ParamKind::Integer, "cores", json!(1))
    }

    #[test]
    fn numeric_strings_are_coerced() {
        let args = schema().validate(&raw(json!({"a": " 2.5 ", "op": "+"}))).unwrap();
        assert_eq!(args.f64("a"), Some(2.5));
        assert_eq!(args.i64("cpu"), Some(1));
    }

    #[test]
    fn object_lists_accept_json_strings() {
        let schema = InputSchema::new().required("runs", ParamKind::ObjectList, "runs");
        let args = schema.validate(&raw(json!({"runs": "[{\"id\": \"r1\"}]"}))).unwrap();
        assert_eq!(args.records("runs").map(|r| r.len()), Some(1));

        let err = schema.validate(&raw(json!({"runs": [1, 2]}))).unwrap_err();
        assert_eq!(err.to_string(), "Invalid argument 'runs': every entry must be a JSON object");
    }

    #[test]
    fn missing_required_argument_is_named() {
        let err = schema().validate(&raw(json!({"op": "+"}))).unwrap_err();
        assert_eq!(err.to_string(), "Missing required argument: a");
    }

    #[test]
    fn null_counts_as_missing() {
        let err = schema().validate(&raw(json!({"a": null, "op": "+"}))).unwrap_err();
        assert!(matches!(err, ToolError::MissingArgument(name) if name == "a"));
    }

    #[test]
    fn unparseable_number_names_the_argument() {
        let err = schema().validate(&raw(json!({"a": "two", "op": "+"}))).unwrap_err();
        assert!(err.to_string().contains("'a'"));
        assert!(err.to_string().contains("expected a number"));
    }

    #[test]
    fn enum_rejects_unknown_value() {
        let err = schema().validate(&raw(json!({"a": 1, "op": "%"}))).unwrap_err();
        assert!(err.to_string().contains("'%' is not one of: +, -"));
    }

    #[test]
    fn comma_separated_list_is_split() {
        let args = schema()
            .validate(&raw(json!({"a": 1, "op": "-", "tags": "x, y,,z"})))
            .unwrap();
        assert_eq!(args.list("tags"), Some(&["x".to_string(), "y".into(), "z".into()][..]));
    }

    #[test]
    fn object_accepts_json_string() {
        let schema = InputSchema::new().required("env", ParamKind::Object, "env");
        let args = schema.validate(&raw(json!({"env": "{\"A\": \"1\"}"}))).unwrap();
        assert_eq!(args.object("env").and_then(|m| m.get("A")), Some(&json!("1")));

        let err = schema.validate(&raw(json!({"env": "not json"}))).unwrap_err();
        assert!(err.to_string().contains("'env'"));
    }

    #[test]
    fn integer_accepts_whole_floats_only() {
        let schema = InputSchema::new().required("n", ParamKind::Integer, "n");
        assert_eq!(schema.validate(&raw(json!({"n": 4.0}))).unwrap().i64("n"), Some(4));
        assert!(schema.validate(&raw(json!({"n": 4.5}))).is_err());
    }

    #[test]
    fn json_schema_lists_required_fields() {
        let rendered = schema().to_json_schema();
        assert_eq!(rendered["type"], "object");
        assert_eq!(rendered["required"], json!(["a", "op"]));
        assert_eq!(rendered["properties"]["op"]["enum"], json!(["+", "-"]));
        assert_eq!(rendered["properties"]["cpu"]["default"], json!(1));
    }
}
