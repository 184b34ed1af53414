//! Common utilities shared across Stable Diffusion tools.
//!
//! This module provides the lenient number coercion used by tool parameters,
//! range-check helpers for validation, and result-envelope constructors.

use rmcp::model::{CallToolResult, Content};
use schemars::JsonSchema;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::domains::tools::error::ToolError;

/// Parameters for tools that take no arguments.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct EmptyParams {}

/// A JSON value that should be treated as a number even when the caller
/// sent it as a string (`"20"` instead of `20`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberOrString {
    Number(f64),
    String(String),
}

/// Deserialize an optional numeric field, coercing numeric strings.
///
/// Accepts a JSON number, a string that parses as one, `null`, or an absent
/// field. Anything else is a deserialization error, which surfaces as an
/// invalid-parameters rejection before the tool body runs.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) => match s.trim().parse::<f64>() {
            Ok(n) => Ok(Some(n)),
            Err(_) => Err(de::Error::custom(format!("expected a number, got {s:?}"))),
        },
    }
}

/// Reject values outside `[min, max]` or not finite.
pub fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<(), ToolError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ToolError::invalid_arguments(format!(
            "{name} must be a number between {min} and {max}"
        )));
    }
    Ok(())
}

/// Reject values below `min` or not finite.
pub fn check_min(name: &str, value: f64, min: f64) -> Result<(), ToolError> {
    if !value.is_finite() || value < min {
        return Err(ToolError::invalid_arguments(format!(
            "{name} must be a number greater than or equal to {min}"
        )));
    }
    Ok(())
}

/// Build a success result carrying `value` both as pretty-printed JSON text
/// and as structured content.
pub fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, ToolError> {
    let structured = serde_json::to_value(value)
        .map_err(|e| ToolError::internal(format!("Failed to serialize result: {e}")))?;
    let text = serde_json::to_string_pretty(&structured)
        .map_err(|e| ToolError::internal(format!("Failed to serialize result: {e}")))?;
    Ok(CallToolResult {
        content: vec![Content::text(text)],
        structured_content: Some(structured),
        is_error: Some(false),
        meta: None,
    })
}

/// Build a success result with a plain text message.
pub fn text_result(message: String) -> CallToolResult {
    CallToolResult::success(vec![Content::text(message)])
}
