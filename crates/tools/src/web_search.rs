use async_trait::async_trait;
use magray_core::{Citation, Tool, ToolContext, ToolResult};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const EXTERNAL_KEYWORDS: &[&str] = &[
    "current", "latest", "recent", "today", "now", "this year", "2024", "2025", "2026", "news",
    "update", "breaking", "what is the current", "as of",
];
const EXTERNAL_ENTITIES: &[&str] = &[
    "weather", "stock price", "exchange rate", "population", "distance", "time zone", "wikipedia",
    "google", "website",
];

#[derive(Debug, Deserialize)]
struct WebSearchResponse {
    #[serde(default)]
    results: Vec<WebResult>,
    help_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebResult {
    title: String,
    url: String,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl WebResult {
    fn text(&self) -> String {
        self.snippet.clone().or_else(|| self.description.clone()).unwrap_or_default()
    }
}

/// External-source lookup via a webhook, used as a fallback when
/// internal retrieval is weak or the query is inherently external
/// (current events, live facts).
pub struct WebSearchTool {
    base_url: String,
    client: reqwest::Client,
}

impl WebSearchTool {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    fn fallback_answer(citations: &[Citation]) -> String {
        let mut answer = String::new();
        for (idx, citation) in citations.iter().take(3).enumerate() {
            answer.push_str(&format!("{}. {}\n{}\n\n", idx + 1, citation.document, citation.excerpt));
        }
        answer.push_str("Source: external web search.");
        answer
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search external web sources for information not found in internal documents (e.g., current events, external facts, recent data)"
    }

    fn can_handle(&self, query: &str, context: &ToolContext) -> f64 {
        let internal_confidence = context.internal_confidence.unwrap_or(1.0);
        let internal_results_count = context.internal_results_count.unwrap_or(1);
        let q = query.to_lowercase();

        if internal_results_count == 0 {
            return 0.85;
        }
        if internal_confidence < 0.5 {
            return 0.8;
        }
        if EXTERNAL_KEYWORDS.iter().any(|k| q.contains(k)) {
            return 0.75;
        }
        if EXTERNAL_ENTITIES.iter().any(|k| q.contains(k)) {
            return 0.7;
        }
        if internal_confidence < 0.7 {
            return 0.5;
        }
        0.3
    }

    async fn execute(&self, query: &str, context: &ToolContext) -> ToolResult {
        let body = json!({ "query": query, "max_results": 5 });
        let response = match self
            .client
            .post(format!("{}/webhook/web-search", self.base_url))
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return ToolResult::failure(self.name(), format!("web search request failed: {e}")),
        };

        if !response.status().is_success() {
            return ToolResult::failure(
                self.name(),
                format!("web search returned status {}", response.status()),
            );
        }

        let parsed: WebSearchResponse = match response.json().await {
            Ok(p) => p,
            Err(e) => return ToolResult::failure(self.name(), format!("could not parse web search response: {e}")),
        };

        if parsed.results.is_empty() {
            let message = parsed
                .help_message
                .unwrap_or_else(|| "No external results found for this query.".to_string());
            return ToolResult::failure(self.name(), message);
        }

        let citations: Vec<Citation> = parsed
            .results
            .iter()
            .enumerate()
            .map(|(idx, r)| {
                let text = r.text();
                let mut citation = Citation::new(format!("{} (External Source)", r.title), text.clone());
                citation.excerpt = text.chars().take(200).collect();
                citation.rank_position = (idx + 1) as u32;
                citation.metadata.insert("source".to_string(), "external_web".to_string());
                citation.metadata.insert("url".to_string(), r.url.clone());
                citation.metadata.insert("title".to_string(), r.title.clone());
                citation
            })
            .collect();

        let answer = if let Some(handler) = &context.llm_handler {
            let context_block = citations
                .iter()
                .map(|c| format!("{}: {}", c.document, c.excerpt))
                .collect::<Vec<_>>()
                .join("\n");
            let prompt = format!(
                "Using these external search results, answer the query \"{query}\" concisely.\n\n{context_block}"
            );
            handler
                .generate(&prompt, 0.3, 400)
                .await
                .unwrap_or_else(|_| Self::fallback_answer(&citations))
        } else {
            Self::fallback_answer(&citations)
        };

        ToolResult::success(json!({ "answer": answer }))
            .with_metadata("tool", self.name())
            .with_citations(citations)
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(30)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_internal_results_scores_highest() {
        let tool = WebSearchTool::new("http://localhost");
        let mut ctx = ToolContext::new("q");
        ctx.internal_results_count = Some(0);
        assert_eq!(tool.can_handle("q", &ctx), 0.85);
    }

    #[test]
    fn low_internal_confidence_scores_high() {
        let tool = WebSearchTool::new("http://localhost");
        let mut ctx = ToolContext::new("q");
        ctx.internal_confidence = Some(0.2);
        assert_eq!(tool.can_handle("q", &ctx), 0.8);
    }

    #[test]
    fn default_context_floors_at_low_confidence() {
        let tool = WebSearchTool::new("http://localhost");
        let ctx = ToolContext::new("q");
        assert_eq!(tool.can_handle("unrelated query text", &ctx), 0.3);
    }

    #[test]
    fn fallback_answer_lists_top_three() {
        let mut a = Citation::new("A (External Source)", "x");
        a.excerpt = "snippet a".to_string();
        let citations = vec![a];
        let answer = WebSearchTool::fallback_answer(&citations);
        assert!(answer.contains("snippet a"));
        assert!(answer.contains("Source: external web search."));
    }

    #[tokio::test]
    async fn execute_returns_cited_answer_on_webhook_success() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/webhook/web-search"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {
                        "title": "Q4 Sales Target Announcement",
                        "url": "https://news.example.com/q4-sales",
                        "snippet": "The company set a Q4 sales target of $50M.",
                    },
                ],
            })))
            .mount(&server)
            .await;

        let tool = WebSearchTool::new(server.uri());
        let ctx = ToolContext::new("q");
        let result = tool.execute("What is our Q4 sales target?", &ctx).await;

        assert!(result.success);
        let answer = result.data["answer"].as_str().unwrap();
        assert!(answer.contains("$50M"));
        assert_eq!(result.citations.len(), 1);
        assert_eq!(result.citations[0].document, "Q4 Sales Target Announcement (External Source)");
        assert_eq!(result.citations[0].metadata.get("source").map(String::as_str), Some("external_web"));
    }

    #[tokio::test]
    async fn execute_fails_when_webhook_returns_no_results() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/webhook/web-search"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(json!({
                "results": [],
                "help_message": "No external results found for this query.",
            })))
            .mount(&server)
            .await;

        let tool = WebSearchTool::new(server.uri());
        let ctx = ToolContext::new("q");
        let result = tool.execute("an obscure query", &ctx).await;

        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("No external results found for this query.")
        );
    }
}
