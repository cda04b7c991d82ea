//! Calculator tool

use crate::error::ToolError;
use crate::server::Tool;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Basic arithmetic on two operands
#[derive(Debug, Default)]
pub struct CalculatorTool;

impl CalculatorTool {
    pub const NAME: &'static str = "calculator";
}

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Provides results of basic math calculations"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "num1": {
                    "type": "number",
                    "description": "First operand"
                },
                "num2": {
                    "type": "number",
                    "description": "Second operand"
                },
                "operation": {
                    "type": "string",
                    "description": "Operation to perform",
                    "enum": ["add", "subtract", "multiply", "divide"]
                }
            },
            "required": ["num1", "num2", "operation"]
        })
    }

    async fn execute(&self, arguments: &Value) -> Result<String, ToolError> {
        let num1 = operand(arguments, "num1")?;
        let num2 = operand(arguments, "num2")?;
        let operation = arguments
            .get("operation")
            .ok_or_else(|| ToolError::new("Missing required argument: 'operation'"))?
            .as_str()
            .ok_or_else(|| ToolError::new("Invalid argument value: 'operation' must be a string"))?;

        let result = match operation {
            "add" => num1 + num2,
            "subtract" => num1 - num2,
            "multiply" => num1 * num2,
            "divide" => {
                if num2 == 0.0 {
                    return Err(ToolError::new("Division by zero"));
                }
                num1 / num2
            }
            other => return Err(ToolError::new(format!("Unknown operation '{}'", other))),
        };

        // Debug formatting keeps the fractional part: 9.0, not 9
        Ok(format!("Result: {:?}", result))
    }
}

/// Read a numeric operand; numeric strings are accepted too.
fn operand(arguments: &Value, key: &str) -> Result<f64, ToolError> {
    let value = arguments
        .get(key)
        .ok_or_else(|| ToolError::new(format!("Missing required argument: '{}'", key)))?;

    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| ToolError::new(format!("Invalid argument value: '{}' = {}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(arguments: Value) -> Result<String, ToolError> {
        CalculatorTool.execute(&arguments).await
    }

    #[tokio::test]
    async fn test_add_keeps_float_formatting() {
        let out = run(json!({"num1": 4, "num2": 5, "operation": "add"})).await;
        assert_eq!(out.unwrap(), "Result: 9.0");
    }

    #[tokio::test]
    async fn test_operations() {
        assert_eq!(
            run(json!({"num1": 10, "num2": 4, "operation": "subtract"})).await.unwrap(),
            "Result: 6.0"
        );
        assert_eq!(
            run(json!({"num1": 2.5, "num2": 4, "operation": "multiply"})).await.unwrap(),
            "Result: 10.0"
        );
        assert_eq!(
            run(json!({"num1": 1, "num2": 4, "operation": "divide"})).await.unwrap(),
            "Result: 0.25"
        );
    }

    #[tokio::test]
    async fn test_divide_by_zero() {
        let err = run(json!({"num1": 1, "num2": 0, "operation": "divide"}))
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::new("Division by zero"));
    }

    #[tokio::test]
    async fn test_numeric_strings_are_accepted() {
        let out = run(json!({"num1": "4", "num2": "0.5", "operation": "add"})).await;
        assert_eq!(out.unwrap(), "Result: 4.5");
    }

    #[tokio::test]
    async fn test_argument_errors() {
        let err = run(json!({"num2": 1, "operation": "add"})).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing required argument: 'num1'");

        let err = run(json!({"num1": "x", "num2": 1, "operation": "add"}))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Invalid argument value: 'num1'"));

        let err = run(json!({"num1": 1, "num2": 1, "operation": "pow"}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown operation 'pow'");
    }
}
