use crate::citation::Citation;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Uniform envelope every tool returns from `execute`.
///
/// A failed result always carries a non-empty `error`; its `citations`
/// are empty or reason-only. `metadata` conventionally carries `tool`
/// (the producing tool's name) and `confidence` (a `[0,1]` string-encoded
/// float consumed by conditional gating and answer-header selection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub data: Value,
    pub error: Option<String>,
    pub metadata: HashMap<String, String>,
    pub citations: Vec<Citation>,
}

impl ToolResult {
    pub fn success(data: Value) -> Self {
        Self {
            success: true,
            data,
            error: None,
            metadata: HashMap::new(),
            citations: Vec::new(),
        }
    }

    pub fn failure(tool: &str, error: impl Into<String>) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("tool".to_string(), tool.to_string());
        Self {
            success: false,
            data: Value::Null,
            error: Some(error.into()),
            metadata,
            citations: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.citations = citations;
        self
    }

    pub fn tool_name(&self) -> Option<&str> {
        self.metadata.get("tool").map(String::as_str)
    }

    /// `metadata.confidence`, defaulting to 1.0 when absent — matches the
    /// conditional-predicate default in the execution engine.
    pub fn confidence(&self) -> f64 {
        self.metadata
            .get("confidence")
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_carries_tool_name_and_error() {
        let r = ToolResult::failure("calculator", "could not parse expression");
        assert!(!r.success);
        assert_eq!(r.tool_name(), Some("calculator"));
        assert!(r.error.is_some());
    }

    #[test]
    fn confidence_defaults_to_one_when_absent() {
        let r = ToolResult::success(Value::Null);
        assert_eq!(r.confidence(), 1.0);
    }
}
