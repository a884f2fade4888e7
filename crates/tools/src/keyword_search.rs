use async_trait::async_trait;
use magray_core::{Citation, Tool, ToolContext, ToolResult};
use regex::Regex;
use serde_json::json;
use std::time::Duration;

const FIND_COMMANDS: &[&str] = &["find", "search for", "locate", "look for", "show me"];
const KEYWORD_INDICATORS: &[&str] = &[
    "named",
    "called",
    "titled",
    "specifically",
    "exactly",
    "term",
    "word",
    "phrase",
    "mentions",
    "references",
];

const DEFAULT_TOP_K: usize = 5;

/// Exact-match retrieval for quoted text, proper nouns, and dates.
/// Requires the retriever to expose a dedicated keyword index.
pub struct KeywordSearchTool;

impl KeywordSearchTool {
    pub fn new() -> Self {
        Self
    }

    fn has_proper_noun(query: &str) -> bool {
        let words: Vec<&str> = query.split_whitespace().collect();
        if words.len() <= 1 {
            return false;
        }
        words.iter().skip(1).any(|w| {
            let trimmed = w.trim_matches(|c: char| !c.is_alphanumeric());
            trimmed != "I" && trimmed.chars().next().is_some_and(|c| c.is_uppercase())
        })
    }

    fn has_date_pattern(query: &str) -> bool {
        let date_re = Regex::new(
            r"(?i)\b\d{4}\b|\b\d{1,2}/\d{1,2}/\d{2,4}\b|\b(january|february|march|april|may|june|july|august|september|october|november|december)\b",
        )
        .expect("static regex");
        date_re.is_match(query)
    }
}

impl Default for KeywordSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for KeywordSearchTool {
    fn name(&self) -> &str {
        "keyword_search"
    }

    fn description(&self) -> &str {
        "Search documents using exact keyword matching for names, dates, technical terms, and quoted text"
    }

    fn can_handle(&self, query: &str, _context: &ToolContext) -> f64 {
        if query.contains('"') || query.contains('\'') {
            return 0.95;
        }
        let q = query.to_lowercase();
        if FIND_COMMANDS.iter().any(|c| q.starts_with(c)) {
            return 0.9;
        }
        if Self::has_proper_noun(query) {
            return 0.85;
        }
        if Self::has_date_pattern(query) {
            return 0.8;
        }
        if KEYWORD_INDICATORS.iter().any(|k| q.contains(k)) {
            return 0.75;
        }
        0.5
    }

    async fn execute(&self, query: &str, context: &ToolContext) -> ToolResult {
        let Some(retriever) = &context.retriever else {
            return ToolResult::failure(self.name(), "retriever not configured");
        };
        if !retriever.has_keyword_index() {
            return ToolResult::failure(self.name(), "Keyword search index not available");
        }

        let top_k = context
            .extra
            .get("top_k")
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_TOP_K);

        let chunks = match retriever.keyword_search(query, top_k).await {
            Ok(chunks) => chunks,
            Err(e) => return ToolResult::failure(self.name(), format!("keyword search failed: {e}")),
        };

        if chunks.is_empty() {
            return ToolResult::success(json!([]))
                .with_metadata("tool", self.name())
                .with_metadata("message", "No documents found");
        }

        let citations: Vec<Citation> = chunks
            .iter()
            .enumerate()
            .map(|(idx, chunk)| {
                let doc_name = chunk
                    .metadata
                    .get("title")
                    .or_else(|| chunk.metadata.get("original_filename"))
                    .or_else(|| chunk.metadata.get("display_name"))
                    .cloned()
                    .unwrap_or_else(|| {
                        if chunk.id.is_empty() {
                            format!("document_{idx}")
                        } else {
                            chunk.id.clone()
                        }
                    });
                let page_number = chunk
                    .metadata
                    .get("page_number")
                    .or_else(|| chunk.metadata.get("page"))
                    .and_then(|v| v.parse::<u32>().ok())
                    .unwrap_or(0);

                let mut citation = Citation::new(doc_name, chunk.content.clone());
                citation.page_number = page_number;
                citation.similarity_score = chunk.semantic_score;
                citation.rank_position = (idx + 1) as u32;
                citation
            })
            .collect();

        ToolResult::success(json!({ "num_results": chunks.len() }))
            .with_metadata("tool", self.name())
            .with_metadata("method", "keyword")
            .with_citations(citations)
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(15)
    }
}
