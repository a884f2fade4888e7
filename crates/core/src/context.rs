use crate::citation::Citation;
use crate::collaborators::{AnswerChain, LanguageModelHandler, Retriever};
use crate::query_analysis::Analysis;
use crate::tool_result::ToolResult;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// The heterogeneous context map passed to every tool invocation.
///
/// Modeled as a struct of optional typed fields — the shape the engine
/// itself populates — plus an open string-keyed extension map for
/// session-supplied data (chat history, user preferences) that no tool
/// in this crate interprets directly. Tools must treat unknown keys as
/// absent rather than erroring.
///
/// Cheap to clone: collaborators are held behind `Arc`, and cloning is
/// how the Parallel strategy gives every task an immutable snapshot
/// instead of sharing one context across concurrent tool executions.
#[derive(Clone, Default)]
pub struct ToolContext {
    pub query: String,
    pub analysis: Option<Analysis>,

    pub retriever: Option<Arc<dyn Retriever>>,
    pub llm_handler: Option<Arc<dyn LanguageModelHandler>>,
    pub qa_chain: Option<Arc<dyn AnswerChain>>,

    pub previous_result: Option<Value>,
    pub previous_citations: Vec<Citation>,
    pub skip_reason: Option<String>,

    pub internal_confidence: Option<f64>,
    pub internal_results_count: Option<usize>,

    pub extra: HashMap<String, Value>,
}

impl ToolContext {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_analysis(mut self, analysis: Analysis) -> Self {
        self.analysis = Some(analysis);
        self
    }

    pub fn complexity_str(&self) -> Option<String> {
        self.analysis
            .as_ref()
            .map(|a| format!("{:?}", a.complexity).to_lowercase())
    }

    pub fn intent_str(&self) -> Option<String> {
        self.analysis.as_ref().map(|a| a.intent.as_str().to_string())
    }

    /// Carries forward a prior successful result's data, citations, and
    /// derived confidence/result-count signals — the Sequential/
    /// Conditional context-propagation contract. `internal_confidence`
    /// and `internal_results_count` are what `web_search.can_handle`
    /// reads to decide whether internal retrieval was weak enough to
    /// warrant falling back to the web.
    pub fn propagate(&mut self, result: &ToolResult) {
        self.internal_confidence = Some(result.confidence());
        self.internal_results_count = Some(result.citations.len());
        self.previous_result = Some(result.data.clone());
        self.previous_citations = result.citations.clone();
    }
}
