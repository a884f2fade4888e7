//! Reference tool roster plus the registry that holds it.
//!
//! Every tool here is an opaque conformant of `magray_core::Tool` —
//! nothing outside this crate inspects a tool's internals, only its
//! `{name, description, can_handle, execute}` surface.

mod calculator;
mod comparison;
mod expr;
mod keyword_search;
mod registry;
mod semantic_search;
mod summarization;
mod url_ingestion;
mod web_search;

pub use calculator::CalculatorTool;
pub use comparison::ComparisonTool;
pub use keyword_search::KeywordSearchTool;
pub use registry::ToolRegistry;
pub use semantic_search::SemanticSearchTool;
pub use summarization::SummarizationTool;
pub use url_ingestion::UrlIngestionTool;
pub use web_search::WebSearchTool;

/// Builds a registry with all seven reference tools registered, using
/// `base_url` as the webhook host for the two HTTP-backed tools.
pub fn reference_registry(base_url: impl Into<String>) -> ToolRegistry {
    let base_url = base_url.into();
    let mut registry = ToolRegistry::new();
    registry.register(std::sync::Arc::new(SemanticSearchTool::new()));
    registry.register(std::sync::Arc::new(KeywordSearchTool::new()));
    registry.register(std::sync::Arc::new(ComparisonTool::new()));
    registry.register(std::sync::Arc::new(CalculatorTool::new()));
    registry.register(std::sync::Arc::new(SummarizationTool::new()));
    registry.register(std::sync::Arc::new(WebSearchTool::new(base_url.clone())));
    registry.register(std::sync::Arc::new(UrlIngestionTool::new(base_url)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_registry_has_seven_tools() {
        let registry = reference_registry("http://localhost:5678");
        assert_eq!(registry.len(), 7);
        assert!(registry.get("semantic_search").is_some());
        assert!(registry.get("url_ingestion").is_some());
    }
}
