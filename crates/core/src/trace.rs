use serde::{Deserialize, Serialize};

/// One record in the reasoning trace. Tagged by `step` so the JSON shape
/// stays self-describing across the wire (`{"step": "skip_tool", "tool":
/// "web_search", "reason": "..."}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum TraceEvent {
    QueryAnalysis {
        complexity: String,
        intent: String,
        entities: Vec<String>,
    },
    ToolSelection {
        tools: Vec<String>,
    },
    LlmToolSelection {
        tools: Vec<String>,
    },
    ExecutionPlan {
        strategy: String,
        tools: Vec<String>,
    },
    SubmitTool {
        tool: String,
    },
    ExecuteTool {
        tool: String,
    },
    ToolSuccess {
        tool: String,
        citations: usize,
    },
    ToolFailure {
        tool: String,
        error: String,
    },
    ToolError {
        tool: String,
        error: String,
    },
    SkipTool {
        tool: String,
        reason: String,
    },
    ToolComplete {
        tool: String,
    },
    ConversationalResponse {
        reply: String,
    },
}

impl TraceEvent {
    pub fn step(&self) -> &'static str {
        match self {
            TraceEvent::QueryAnalysis { .. } => "query_analysis",
            TraceEvent::ToolSelection { .. } => "tool_selection",
            TraceEvent::LlmToolSelection { .. } => "llm_tool_selection",
            TraceEvent::ExecutionPlan { .. } => "execution_plan",
            TraceEvent::SubmitTool { .. } => "submit_tool",
            TraceEvent::ExecuteTool { .. } => "execute_tool",
            TraceEvent::ToolSuccess { .. } => "tool_success",
            TraceEvent::ToolFailure { .. } => "tool_failure",
            TraceEvent::ToolError { .. } => "tool_error",
            TraceEvent::SkipTool { .. } => "skip_tool",
            TraceEvent::ToolComplete { .. } => "tool_complete",
            TraceEvent::ConversationalResponse { .. } => "conversational_response",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_step_discriminator() {
        let ev = TraceEvent::SkipTool {
            tool: "web_search".to_string(),
            reason: "confidence 0.800 >= 0.5".to_string(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["step"], "skip_tool");
        assert_eq!(json["reason"], "confidence 0.800 >= 0.5");
    }
}
