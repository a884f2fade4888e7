use async_trait::async_trait;
use magray_core::{Retriever, RetrievedChunk, Tool, ToolContext, ToolResult};
use regex::Regex;
use serde_json::json;
use std::time::Duration;

const HIGH_CONFIDENCE_KEYWORDS: &[&str] = &[
    "compare",
    "comparison",
    "versus",
    " vs ",
    " vs.",
    "difference between",
    "differences between",
    "contrast",
    "contrasting",
];
const MEDIUM_CONFIDENCE_KEYWORDS: &[&str] = &[
    "differ",
    "similar",
    "similarities",
    "against",
    "relative to",
    "compared to",
    "better than",
    "worse than",
];

const ENTITY_TOP_K: usize = 3;
const FALLBACK_TOP_K: usize = 5;

/// Side-by-side comparison of two or more entities, delegating synthesis
/// to the injected answer chain once supporting documents are gathered.
pub struct ComparisonTool;

impl ComparisonTool {
    pub fn new() -> Self {
        Self
    }

    /// Four patterns tried in priority order; the first that matches
    /// wins. Falls back to an empty list (whole-query retrieval) if none
    /// match.
    fn extract_comparison_entities(query: &str) -> Vec<String> {
        let patterns = [
            r"(?i)compare\s+([^,]+?)\s+and\s+([^,]+?)(?:\s|$|\.)",
            r"(?i)([^,]+?)\s+(?:versus|vs\.?|vs)\s+([^,]+?)(?:\s|$|\.)",
            r"(?i)difference(?:s)?\s+between\s+([^,]+?)\s+and\s+([^,]+?)(?:\s|$|\.)",
            r"([A-Z][a-zA-Z0-9\s]+?)\s+and\s+([A-Z][a-zA-Z0-9\s]+)",
        ];
        for pattern in patterns {
            let re = Regex::new(pattern).expect("static regex");
            if let Some(caps) = re.captures(query) {
                let a = caps.get(1).map(|m| m.as_str().trim().to_string());
                let b = caps.get(2).map(|m| m.as_str().trim().to_string());
                if let (Some(a), Some(b)) = (a, b) {
                    if !a.is_empty() && !b.is_empty() {
                        return vec![a, b];
                    }
                }
            }
        }
        Vec::new()
    }

    async fn gather_documents(
        retriever: &dyn Retriever,
        query: &str,
        entities: &[String],
    ) -> anyhow::Result<Vec<RetrievedChunk>> {
        if entities.is_empty() {
            return retriever.retrieve(query, FALLBACK_TOP_K).await;
        }
        let mut docs = Vec::new();
        for entity in entities {
            docs.extend(retriever.semantic_search(entity, ENTITY_TOP_K).await?);
        }
        Ok(docs)
    }
}

impl Default for ComparisonTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ComparisonTool {
    fn name(&self) -> &str {
        "comparison"
    }

    fn description(&self) -> &str {
        "Compare two or more documents, sections, or concepts side-by-side (e.g., 'Compare Policy A and Policy B', 'Differences between X and Y')"
    }

    fn can_handle(&self, query: &str, _context: &ToolContext) -> f64 {
        let q = query.to_lowercase();
        if HIGH_CONFIDENCE_KEYWORDS.iter().any(|k| q.contains(k)) {
            return 0.95;
        }
        if MEDIUM_CONFIDENCE_KEYWORDS.iter().any(|k| q.contains(k)) {
            return 0.75;
        }
        let words: Vec<&str> = query.split_whitespace().collect();
        if q.contains(" and ") && words.len() > 3 {
            return 0.6;
        }
        0.2
    }

    async fn execute(&self, query: &str, context: &ToolContext) -> ToolResult {
        let Some(retriever) = &context.retriever else {
            return ToolResult::failure(self.name(), "retriever not configured");
        };
        let Some(qa_chain) = &context.qa_chain else {
            return ToolResult::failure(self.name(), "answer chain not configured");
        };

        let entities = Self::extract_comparison_entities(query);

        let documents = match Self::gather_documents(retriever.as_ref(), query, &entities).await {
            Ok(docs) => docs,
            Err(e) => return ToolResult::failure(self.name(), format!("retrieval failed: {e}")),
        };

        let chain_answer = match qa_chain.comparison_chain(query, &documents).await {
            Ok(answer) => answer,
            Err(e) => return ToolResult::failure(self.name(), format!("comparison chain failed: {e}")),
        };

        ToolResult::success(json!({ "answer": chain_answer.answer, "entities": entities }))
            .with_metadata("tool", self.name())
            .with_metadata("confidence", chain_answer.confidence.to_string())
            .with_citations(chain_answer.sources)
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(15)
    }
}
