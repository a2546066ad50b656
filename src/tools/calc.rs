/// Calculator Tool
///
/// Basic addition, subtraction, multiplication and division on two numbers.
/// Operators may be given as symbols or as words.

use serde_json::Value;

use crate::core::args::Arguments;
use crate::core::error::{RegistryError, ToolError};
use crate::core::registry::{Content, ToolDescriptor, ToolRegistry, sync_handler};
use crate::core::schema::{InputSchema, ParamKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operator {
    pub const NAMES: [&'static str; 8] = ["+", "-", "*", "/", "add", "subtract", "multiply", "divide"];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "+" | "add" => Some(Operator::Add),
            "-" | "subtract" => Some(Operator::Subtract),
            "*" | "multiply" => Some(Operator::Multiply),
            "/" | "divide" => Some(Operator::Divide),
            _ => None,
        }
    }
}

/// Apply `op` to `a` and `b`. Division by zero is an error.
pub fn calculate(a: f64, b: f64, op: Operator) -> Result<f64, ToolError> {
    match op {
        Operator::Add => Ok(a + b),
        Operator::Subtract => Ok(a - b),
        Operator::Multiply => Ok(a * b),
        Operator::Divide if b == 0.0 => {
            Err(ToolError::Execution("Division by zero is not allowed".to_string()))
        }
        Operator::Divide => Ok(a / b),
    }
}

fn handle(args: Arguments) -> Result<Content, ToolError> {
    let a = args.required_f64("a")?;
    let b = args.required_f64("b")?;
    let op = args.required_str("operator")?;
    let op = Operator::parse(op).ok_or_else(|| ToolError::invalid("operator", format!("unsupported operator '{}'", op)))?;

    let result = calculate(a, b, op)?;
    serde_json::Number::from_f64(result)
        .map(|n| Content::Json(Value::Number(n)))
        .ok_or_else(|| ToolError::Execution(format!("result is not a finite number: {}", result)))
}

/// Register the calculator tool with the tool registry.
pub fn register(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    let tool = ToolDescriptor::new(
        "calculator_tool",
        "Calculator tool which can do basic addition, subtraction, multiplication, and division. \
         Division by 0 is not allowed.",
        InputSchema::new()
            .required("a", ParamKind::Number, "first number")
            .required("b", ParamKind::Number, "second number")
            .required("operator", ParamKind::Enum(Operator::NAMES.to_vec()), "operator"),
    );

    registry.register(tool, sync_handler(handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::ToolResult;
    use serde_json::json;

    async fn call(args: Value) -> ToolResult {
        let mut registry = ToolRegistry::new();
        register(&mut registry).unwrap();
        registry.invoke("calculator_tool", args.as_object().unwrap()).await
    }

    #[tokio::test]
    async fn basic_arithmetic() {
        let cases = [
            ("+", 2.0, 3.0, 5.0),
            ("subtract", 2.0, 3.0, -1.0),
            ("*", 1.5, 4.0, 6.0),
            ("divide", 7.0, 2.0, 3.5),
        ];
        for (op, a, b, expected) in cases {
            let result = call(json!({"a": a, "b": b, "operator": op})).await;
            assert_eq!(result, ToolResult::Success { content: Content::Json(json!(expected)) }, "{}", op);
        }
    }

    #[tokio::test]
    async fn numeric_strings_are_accepted() {
        let result = call(json!({"a": "10", "b": "4", "operator": "-"})).await;
        assert_eq!(result, ToolResult::Success { content: Content::Json(json!(6.0)) });
    }

    #[tokio::test]
    async fn division_by_zero_fails_cleanly() {
        let result = call(json!({"a": 1, "b": 0, "operator": "/"})).await;
        assert_eq!(result, ToolResult::failure("Division by zero is not allowed"));
    }

    #[tokio::test]
    async fn unknown_operator_is_a_validation_failure() {
        match call(json!({"a": 1, "b": 2, "operator": "^"})).await {
            ToolResult::Failure { message } => assert!(message.contains("'operator'")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn non_numeric_operand_names_the_argument() {
        match call(json!({"a": "x", "b": 2, "operator": "+"})).await {
            ToolResult::Failure { message } => {
                assert_eq!(message, "Invalid argument 'a': expected a number, got a string")
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }
}
