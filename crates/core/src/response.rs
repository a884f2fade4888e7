use crate::citation::Citation;
use crate::trace::TraceEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// The final shape returned to the caller for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgenticResponse {
    pub answer: String,
    pub sources: Vec<Citation>,
    pub reasoning_trace: Vec<TraceEvent>,
    pub metadata: HashMap<String, Value>,
    pub mode: String,
}

impl AgenticResponse {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            sources: Vec::new(),
            reasoning_trace: Vec::new(),
            metadata: HashMap::new(),
            mode: "agentic".to_string(),
        }
    }

    pub fn with_sources(mut self, sources: Vec<Citation>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_trace(mut self, trace: Vec<TraceEvent>) -> Self {
        self.reasoning_trace = trace;
        self
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}
