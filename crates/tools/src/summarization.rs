use async_trait::async_trait;
use magray_core::{RetrievedChunk, Tool, ToolContext, ToolResult};
use serde_json::json;
use std::time::Duration;

const HIGH_CONFIDENCE_KEYWORDS: &[&str] = &[
    "summarize",
    "summary",
    "overview",
    "sum up",
    "key points",
    "main points",
    "highlights",
    "brief",
    "in short",
    "tldr",
    "tl;dr",
];
const MEDIUM_CONFIDENCE_KEYWORDS: &[&str] = &[
    "main", "important", "significant", "notable", "essential", "critical", "primary", "core", "gist", "essence", "outline",
];

/// Condenses retrieved or supplied documents via the injected answer
/// chain. Requires both a chain and at least one supporting document.
pub struct SummarizationTool;

impl SummarizationTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SummarizationTool {
    fn default() -> Self {
        Self::new()
    }
}

fn citations_to_chunks(citations: &[magray_core::Citation]) -> Vec<RetrievedChunk> {
    citations
        .iter()
        .map(|c| RetrievedChunk {
            id: c.document.clone(),
            content: c.content.clone(),
            metadata: c.metadata.clone(),
            semantic_score: c.similarity_score,
            cross_encoder_score: if c.cross_encoder_score > 0.0 {
                Some(c.cross_encoder_score)
            } else {
                None
            },
        })
        .collect()
}

#[async_trait]
impl Tool for SummarizationTool {
    fn name(&self) -> &str {
        "summarization"
    }

    fn description(&self) -> &str {
        "Summarize documents or extract key points (e.g., 'Summarize the main findings', 'Give me an overview')"
    }

    fn can_handle(&self, query: &str, _context: &ToolContext) -> f64 {
        let q = query.to_lowercase();
        if HIGH_CONFIDENCE_KEYWORDS.iter().any(|k| q.contains(k)) {
            return 0.95;
        }
        if MEDIUM_CONFIDENCE_KEYWORDS.iter().any(|k| q.contains(k)) {
            return 0.7;
        }
        0.2
    }

    async fn execute(&self, query: &str, context: &ToolContext) -> ToolResult {
        let Some(qa_chain) = &context.qa_chain else {
            return ToolResult::failure(self.name(), "answer chain not configured");
        };
        if context.previous_citations.is_empty() {
            return ToolResult::failure(self.name(), "no documents available to summarize");
        }

        let docs = citations_to_chunks(&context.previous_citations);
        let chain_answer = match qa_chain.summarization_chain(query, &docs).await {
            Ok(answer) => answer,
            Err(e) => return ToolResult::failure(self.name(), format!("summarization chain failed: {e}")),
        };

        ToolResult::success(json!({ "answer": chain_answer.answer, "num_documents": docs.len() }))
            .with_metadata("tool", self.name())
            .with_metadata("confidence", chain_answer.confidence.to_string())
            .with_citations(chain_answer.sources)
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(15)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarize_keyword_scores_highest() {
        let tool = SummarizationTool::new();
        let ctx = ToolContext::new("q");
        assert_eq!(tool.can_handle("Summarize the main findings", &ctx), 0.95);
    }

    #[tokio::test]
    async fn execute_fails_without_documents() {
        struct StubChain;
        #[async_trait]
        impl magray_core::AnswerChain for StubChain {
            async fn process_query(
                &self,
                _q: &str,
                _docs: &[RetrievedChunk],
                _h: &[String],
            ) -> anyhow::Result<magray_core::ChainAnswer> {
                unreachable!()
            }
            async fn summarization_chain(
                &self,
                _q: &str,
                _docs: &[RetrievedChunk],
            ) -> anyhow::Result<magray_core::ChainAnswer> {
                unreachable!()
            }
            async fn comparison_chain(
                &self,
                _q: &str,
                _docs: &[RetrievedChunk],
            ) -> anyhow::Result<magray_core::ChainAnswer> {
                unreachable!()
            }
        }
        let tool = SummarizationTool::new();
        let mut ctx = ToolContext::new("summarize this");
        ctx.qa_chain = Some(std::sync::Arc::new(StubChain));
        let result = tool.execute("summarize this", &ctx).await;
        assert!(!result.success);
    }
}
