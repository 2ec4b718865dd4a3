//! Arithmetic tools: add, subtract, multiply, divide
//!
//! Each takes two numbers `a` and `b`. Integral results are returned as JSON
//! integers so transcripts read `4444` rather than `4444.0`.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::tools::{Tool, ToolExecutionResult};

const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn operands_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "a": {
                "type": "number",
                "description": "The first number"
            },
            "b": {
                "type": "number",
                "description": "The second number"
            }
        },
        "required": ["a", "b"],
        "additionalProperties": false
    })
}

fn operands(arguments: &Value) -> Result<(f64, f64), ToolExecutionResult> {
    let operand = |name: &str| {
        arguments
            .get(name)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| ToolExecutionResult::tool_error(format!("`{name}` must be a number")))
    };
    Ok((operand("a")?, operand("b")?))
}

fn number(value: f64) -> Value {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER {
        json!(value as i64)
    } else {
        json!(value)
    }
}

fn binary(arguments: &Value, operation: &str, apply: fn(f64, f64) -> f64) -> ToolExecutionResult {
    match operands(arguments) {
        Ok((a, b)) => ToolExecutionResult::success(json!({
            "result": number(apply(a, b)),
            "operation": operation,
            "a": number(a),
            "b": number(b)
        })),
        Err(err) => err,
    }
}

// ============================================================================
// Tool: add
// ============================================================================

/// Tool that adds two numbers
pub struct AddTool;

#[async_trait]
impl Tool for AddTool {
    fn name(&self) -> &str {
        "add"
    }

    fn description(&self) -> &str {
        "Add two numbers together and return the result."
    }

    fn parameters_schema(&self) -> Value {
        operands_schema()
    }

    async fn execute(&self, arguments: Value) -> ToolExecutionResult {
        binary(&arguments, "add", |a, b| a + b)
    }
}

// ============================================================================
// Tool: subtract
// ============================================================================

/// Tool that subtracts `b` from `a`
pub struct SubtractTool;

#[async_trait]
impl Tool for SubtractTool {
    fn name(&self) -> &str {
        "subtract"
    }

    fn description(&self) -> &str {
        "Subtract the second number from the first and return the result."
    }

    fn parameters_schema(&self) -> Value {
        operands_schema()
    }

    async fn execute(&self, arguments: Value) -> ToolExecutionResult {
        binary(&arguments, "subtract", |a, b| a - b)
    }
}

// ============================================================================
// Tool: multiply
// ============================================================================

/// Tool that multiplies two numbers
pub struct MultiplyTool;

#[async_trait]
impl Tool for MultiplyTool {
    fn name(&self) -> &str {
        "multiply"
    }

    fn description(&self) -> &str {
        "Multiply two numbers together and return the result."
    }

    fn parameters_schema(&self) -> Value {
        operands_schema()
    }

    async fn execute(&self, arguments: Value) -> ToolExecutionResult {
        binary(&arguments, "multiply", |a, b| a * b)
    }
}

// ============================================================================
// Tool: divide
// ============================================================================

/// Tool that divides `a` by `b`
pub struct DivideTool;

#[async_trait]
impl Tool for DivideTool {
    fn name(&self) -> &str {
        "divide"
    }

    fn description(&self) -> &str {
        "Divide the first number by the second and return the result."
    }

    fn parameters_schema(&self) -> Value {
        operands_schema()
    }

    async fn execute(&self, arguments: Value) -> ToolExecutionResult {
        if arguments.get("b").and_then(|v| v.as_f64()) == Some(0.0) {
            return ToolExecutionResult::tool_error("Division by zero");
        }
        binary(&arguments, "divide", |a, b| a / b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn result_of(tool: &dyn Tool, arguments: Value) -> Value {
        match tool.execute(arguments).await {
            ToolExecutionResult::Success(value) => value["result"].clone(),
            other => panic!("Expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_integral_results_are_integers() {
        assert_eq!(result_of(&AddTool, json!({"a": 2123, "b": 2321})).await, json!(4444));
        assert_eq!(
            result_of(&MultiplyTool, json!({"a": 4444, "b": 312})).await,
            json!(1386528)
        );
        assert_eq!(result_of(&SubtractTool, json!({"a": 3, "b": 5})).await, json!(-2));
    }

    #[tokio::test]
    async fn test_fractional_results() {
        assert_eq!(result_of(&DivideTool, json!({"a": 1, "b": 4})).await, json!(0.25));
        assert_eq!(result_of(&AddTool, json!({"a": 0.5, "b": 0.25})).await, json!(0.75));
    }

    #[tokio::test]
    async fn test_divide_by_zero_is_tool_error() {
        let result = DivideTool.execute(json!({"a": 1, "b": 0})).await;
        assert!(matches!(result, ToolExecutionResult::ToolError(ref msg) if msg == "Division by zero"));
    }

    #[tokio::test]
    async fn test_missing_operand_is_tool_error() {
        let result = AddTool.execute(json!({"a": 1})).await;
        assert!(matches!(result, ToolExecutionResult::ToolError(ref msg) if msg == "`b` must be a number"));
    }
}
