use crate::citation_enhancer::CitationEnhancer;
use crate::execution_engine::ExecutionEngine;
use analyzer::QueryAnalyzer;
use common::OrchestratorConfig;
use magray_core::{
    AgenticResponse, Analysis, AnswerChain, Complexity, Condition, EmbeddingModel, ExecutionPlan,
    Intent, LanguageModelHandler, Retriever, RetrievedChunk, Strategy, Tool, ToolContext,
    ToolResult, TraceEvent,
};
use regex::Regex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tools::ToolRegistry;
use tracing::{debug, warn};

const CONVERSATIONAL_GREETING: &str =
    "Hello! I'm Cortex. How can I help you today? You can ask me questions about your documents.";
const NO_ANSWER: &str = "No answer available.";
const ALL_FAILED_PREFIX: &str = "I couldn't find an answer to your query.";

/// Confidence recorded for a rule-matched tool-selection step. A rule
/// match is by construction more certain than a heuristic `can_handle`
/// score, so this sits above the usual top end of those scores. See
/// DESIGN.md.
const RULE_MATCH_CONFIDENCE: f64 = 0.8;

const TOOL_SELECTION_PROMPT_HEADER: &str =
    "Given the following available tools and a user query, select the tools needed to answer \
     it. Respond with a bracketed, comma-separated list of tool names, e.g. [semantic_search, \
     web_search].\n\nAvailable tools:\n";

/// Top-level controller: analyzes a query, selects tools, builds an
/// execution plan, runs it, and synthesizes a cited [`AgenticResponse`]
/// with a full reasoning trace.
///
/// Owns one [`ExecutionEngine`] (its trace is cleared and reused per
/// call) and is itself intended to be instantiated once per query, or
/// wrapped behind `Arc` if a caller wants to share the registry and
/// collaborators across concurrent queries — the engine's trace mutex
/// makes that safe, at the cost of serializing concurrent `execute`
/// calls around it.
pub struct Orchestrator {
    registry: ToolRegistry,
    analyzer: QueryAnalyzer,
    engine: ExecutionEngine,
    enhancer: CitationEnhancer,
    config: OrchestratorConfig,
    retriever: Option<Arc<dyn Retriever>>,
    llm_handler: Option<Arc<dyn LanguageModelHandler>>,
    qa_chain: Option<Arc<dyn AnswerChain>>,
    embedding_model: Option<Arc<dyn EmbeddingModel>>,
}

impl Orchestrator {
    pub fn new(registry: ToolRegistry, config: OrchestratorConfig) -> Self {
        Self {
            engine: ExecutionEngine::new(config.max_parallel_workers),
            enhancer: CitationEnhancer::new(&config),
            registry,
            analyzer: QueryAnalyzer::new(),
            config,
            retriever: None,
            llm_handler: None,
            qa_chain: None,
            embedding_model: None,
        }
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn with_llm_handler(mut self, handler: Arc<dyn LanguageModelHandler>) -> Self {
        self.analyzer = self.analyzer.with_llm_handler(handler.clone());
        self.llm_handler = Some(handler);
        self
    }

    pub fn with_qa_chain(mut self, chain: Arc<dyn AnswerChain>) -> Self {
        self.qa_chain = Some(chain);
        self
    }

    pub fn with_embedding_model(mut self, model: Arc<dyn EmbeddingModel>) -> Self {
        self.embedding_model = Some(model);
        self
    }

    /// Runs one query end to end. `session_context` carries caller-
    /// supplied extension data (chat history, user preferences) that no
    /// tool in this crate interprets but that session-aware tools may.
    pub async fn process_query(
        &self,
        query: &str,
        session_context: HashMap<String, Value>,
    ) -> AgenticResponse {
        let analysis = self.analyzer.analyze(query).await;
        let mut trace = vec![TraceEvent::QueryAnalysis {
            complexity: format!("{:?}", analysis.complexity).to_lowercase(),
            intent: analysis.intent.as_str().to_string(),
            entities: analysis.entities.clone(),
        }];

        if analysis.intent == Intent::Conversational {
            return self.conversational_response(query, analysis, trace);
        }

        let mut context = ToolContext::new(query).with_analysis(analysis.clone());
        context.retriever = self.retriever.clone();
        context.llm_handler = self.llm_handler.clone();
        context.qa_chain = self.qa_chain.clone();
        context.extra = session_context;

        let tools = self.select_tools(query, &analysis, &context, &mut trace).await;
        trace.push(TraceEvent::ToolSelection {
            tools: tools.iter().map(|(t, _)| t.name().to_string()).collect(),
        });

        let plan = Self::build_plan(&tools, &analysis);
        trace.push(TraceEvent::ExecutionPlan {
            strategy: format!("{:?}", plan.strategy),
            tools: plan.tool_names(),
        });

        let (results, engine_trace) = self.engine.execute(&plan, &context).await;
        trace.extend(engine_trace);

        self.synthesize(query, &analysis, results, trace).await
    }

    fn conversational_response(
        &self,
        query: &str,
        analysis: Analysis,
        mut trace: Vec<TraceEvent>,
    ) -> AgenticResponse {
        let q = query.to_lowercase();
        let reply = if ["hi", "hello", "hey"].iter().any(|k| q.contains(k)) {
            CONVERSATIONAL_GREETING.to_string()
        } else if ["thanks", "thank you"].iter().any(|k| q.contains(k)) {
            "You're welcome! Let me know if there's anything else I can help with.".to_string()
        } else if ["bye", "goodbye"].iter().any(|k| q.contains(k)) {
            "Goodbye! Feel free to come back if you have more questions.".to_string()
        } else if ["ok", "okay", "got it", "understood", "sure"]
            .iter()
            .any(|k| q.contains(k))
        {
            "Great, let me know if you need anything else.".to_string()
        } else {
            "Happy to help! Ask me anything about your documents.".to_string()
        };

        trace.push(TraceEvent::ConversationalResponse {
            reply: reply.clone(),
        });

        let mut metadata = HashMap::new();
        metadata.insert("complexity".to_string(), json!(format!("{:?}", analysis.complexity).to_lowercase()));
        metadata.insert("intent".to_string(), json!(analysis.intent.as_str()));

        AgenticResponse::new(reply).with_trace(trace).with_metadata(metadata)
    }

    /// Hybrid rule-first-then-model tool selection. Earlier rules
    /// win; a rule only fires if it actually resolves at least one
    /// registered tool, otherwise selection falls through to the next
    /// rule.
    async fn select_tools(
        &self,
        query: &str,
        analysis: &Analysis,
        context: &ToolContext,
        trace: &mut Vec<TraceEvent>,
    ) -> Vec<(Arc<dyn Tool>, f64)> {
        let q = query.to_lowercase();
        let url_re = Regex::new(r"https?://\S+").expect("static regex");

        if url_re.is_match(query)
            && ["ingest", "add", "load", "upload", "import", "fetch", "download", "index", "process"]
                .iter()
                .any(|k| q.contains(k))
        {
            if let Some(tools) = self.resolve(&["url_ingestion"]) {
                return tools;
            }
        }

        if analysis.intent == Intent::Comparison
            || ["compare", "versus", "vs", "difference"].iter().any(|k| q.contains(k))
        {
            if let Some(tools) = self.resolve(&["comparison", "semantic_search"]) {
                return tools;
            }
        }

        if analysis.intent == Intent::Calculation
            || ["calculate", "compute", "%"].iter().any(|k| q.contains(k))
        {
            if let Some(tools) = self.resolve(&["calculator", "semantic_search"]) {
                return tools;
            }
        }

        if analysis.intent == Intent::Summarization
            || ["summarize", "summary", "overview"].iter().any(|k| q.contains(k))
        {
            if let Some(tools) = self.resolve(&["semantic_search", "summarization"]) {
                return tools;
            }
        }

        if analysis.intent == Intent::External
            || ["current", "latest", "today"].iter().any(|k| q.contains(k))
        {
            if let Some(tools) = self.resolve(&["semantic_search", "web_search"]) {
                return tools;
            }
        }

        if analysis.complexity == Complexity::Simple {
            if let Some(tools) = self.resolve(&["semantic_search"]) {
                return tools;
            }
        }

        if analysis.complexity == Complexity::Complex || analysis.requires_multiple_tools {
            if let Some(tools) = self.resolve(&["semantic_search", "keyword_search"]) {
                return tools;
            }
        }

        if analysis.complexity == Complexity::Moderate {
            if let Some(tools) = self.resolve(&["semantic_search", "keyword_search"]) {
                return tools;
            }
        }

        let suitable = self
            .registry
            .get_suitable_tools(query, context, self.config.min_tool_confidence);
        if !suitable.is_empty() {
            return suitable;
        }

        if self.config.use_llm_fallback {
            if let Some(handler) = &self.llm_handler {
                let model_picks = self.model_tool_selection(query, handler.as_ref()).await;
                if !model_picks.is_empty() {
                    trace.push(TraceEvent::LlmToolSelection {
                        tools: model_picks.iter().map(|(t, _)| t.name().to_string()).collect(),
                    });
                    return model_picks;
                }
            }
        }

        self.resolve(&["semantic_search"]).unwrap_or_default()
    }

    /// Resolves a fixed tool-name list against the registry. Returns
    /// `None` (not an empty vec) when nothing resolved, so callers can
    /// distinguish "this rule matched but every named tool is missing"
    /// from "this rule produced an empty but deliberate selection" — in
    /// practice the latter never happens since every rule names at
    /// least one tool.
    fn resolve(&self, names: &[&str]) -> Option<Vec<(Arc<dyn Tool>, f64)>> {
        let owned: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        let resolved = self.registry.get_tools_by_name(&owned, RULE_MATCH_CONFIDENCE);
        if resolved.is_empty() {
            None
        } else {
            Some(resolved)
        }
    }

    /// Advisory model-based fallback: prompts the
    /// model with the tool roster, parses a bracketed tool-name list,
    /// resolves it via the registry. Any failure returns an empty list
    /// so the caller falls through to the final fallback.
    async fn model_tool_selection(
        &self,
        query: &str,
        handler: &dyn LanguageModelHandler,
    ) -> Vec<(Arc<dyn Tool>, f64)> {
        let mut prompt = TOOL_SELECTION_PROMPT_HEADER.to_string();
        for (name, description) in self.registry.get_descriptions() {
            prompt.push_str(&format!("- {name}: {description}\n"));
        }
        prompt.push_str(&format!("\nQuery: {query}\n"));

        let Ok(reply) = handler.generate(&prompt, 0.1, 100).await else {
            return Vec::new();
        };

        let Some(start) = reply.find('[') else {
            return Vec::new();
        };
        let Some(end) = reply[start..].find(']') else {
            return Vec::new();
        };
        let names: Vec<String> = reply[start + 1..start + end]
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if names.is_empty() {
            return Vec::new();
        }
        self.registry.get_tools_by_name(&names, RULE_MATCH_CONFIDENCE)
    }

    /// Plan construction. Bullet order matters — first matching
    /// rule wins.
    fn build_plan(tools: &[(Arc<dyn Tool>, f64)], analysis: &Analysis) -> ExecutionPlan {
        let tool_names: Vec<&str> = tools.iter().map(|(t, _)| t.name()).collect();
        let has_summarization = tool_names.contains(&"summarization");

        let strategy = if analysis.complexity == Complexity::Complex
            && matches!(analysis.intent, Intent::Comparison | Intent::Calculation)
        {
            Strategy::Sequential
        } else if analysis.intent == Intent::Summarization || has_summarization {
            Strategy::Sequential
        } else if tools.len() > 1 && analysis.intent == Intent::Factual {
            Strategy::Parallel
        } else if analysis.intent == Intent::External
            && tools.len() >= 2
            && tools[1].0.name() == "web_search"
        {
            let mut conditions = HashMap::new();
            conditions.insert("web_search".to_string(), Condition::max_confidence(0.5));
            return ExecutionPlan::new(Strategy::Conditional, tools.to_vec()).with_conditions(conditions);
        } else if analysis.requires_multiple_tools && tools.len() >= 2 {
            let mut conditions = HashMap::new();
            conditions.insert(
                tools[1].0.name().to_string(),
                Condition::min_confidence_and_max_citations(0.0, 3),
            );
            return ExecutionPlan::new(Strategy::Conditional, tools.to_vec()).with_conditions(conditions);
        } else {
            Strategy::Sequential
        };

        ExecutionPlan::new(strategy, tools.to_vec())
    }

    /// Response synthesis: separates successes from failures,
    /// merges, enhances citations, extracts an answer, and assembles the
    /// final response with the accumulated reasoning trace.
    async fn synthesize(
        &self,
        query: &str,
        analysis: &Analysis,
        mut results: Vec<ToolResult>,
        trace: Vec<TraceEvent>,
    ) -> AgenticResponse {
        let attempted_tools: Vec<String> = results
            .iter()
            .filter_map(|r| r.tool_name().map(str::to_string))
            .collect();
        let failed_tools: Vec<String> = results
            .iter()
            .filter(|r| !r.success)
            .filter_map(|r| r.tool_name().map(str::to_string))
            .collect();
        let errors: Vec<String> = results
            .iter()
            .filter(|r| !r.success)
            .filter_map(|r| r.error.clone())
            .collect();

        let any_success = results.iter().any(|r| r.success);
        if !any_success {
            warn!(query, errors = ?errors, "all selected tools failed");
            let mut metadata = HashMap::new();
            metadata.insert("all_tools_failed".to_string(), json!(true));
            metadata.insert("attempted_tools".to_string(), json!(attempted_tools));
            metadata.insert("failed_tools".to_string(), json!(failed_tools));
            let answer = if errors.is_empty() {
                ALL_FAILED_PREFIX.to_string()
            } else {
                format!("{ALL_FAILED_PREFIX} Errors: {}", errors.join("; "))
            };
            return AgenticResponse::new(answer).with_trace(trace).with_metadata(metadata);
        }

        for result in results.iter_mut().filter(|r| r.success) {
            let tool_confidence = result.confidence();
            result.citations = self
                .enhancer
                .enhance(
                    &result.citations,
                    query,
                    tool_confidence,
                    self.embedding_model.as_deref(),
                )
                .await;
        }

        let merged = ExecutionEngine::merge_results(&results);

        let kb_confidence = results
            .iter()
            .find(|r| {
                r.success
                    && matches!(r.tool_name(), Some("semantic_search") | Some("keyword_search"))
            })
            .map(|r| r.confidence())
            .unwrap_or(0.0);

        let answer = self.extract_answer(query, &merged, &results, kb_confidence).await;

        let tools_used: Vec<&str> = merged
            .metadata
            .get("tools_used")
            .map(|s| s.split(',').filter(|t| !t.is_empty()).collect())
            .unwrap_or_default();

        let mut metadata = HashMap::new();
        metadata.insert("tools_used".to_string(), json!(tools_used));
        metadata.insert("attempted_tools".to_string(), json!(attempted_tools));
        metadata.insert("failed_tools".to_string(), json!(failed_tools));
        metadata.insert("result_count".to_string(), json!(results.len()));
        metadata.insert(
            "complexity".to_string(),
            json!(format!("{:?}", analysis.complexity).to_lowercase()),
        );
        metadata.insert("intent".to_string(), json!(analysis.intent.as_str()));
        metadata.insert("kb_confidence".to_string(), json!(kb_confidence));

        AgenticResponse::new(answer)
            .with_sources(merged.citations)
            .with_trace(trace)
            .with_metadata(metadata)
    }

    /// Answer extraction table. `answers` came from the engine's merge
    /// step accumulating every tool's `answer` field. If neither `answer`
    /// nor `answers` is present but the merge produced data or citations,
    /// falls through to the answer-generation chain, then to a stringified
    /// `data` dump, matching the ground-truth orchestrator's cascade.
    async fn extract_answer(
        &self,
        query: &str,
        merged: &ToolResult,
        results: &[ToolResult],
        kb_confidence: f64,
    ) -> String {
        if let Value::Object(map) = &merged.data {
            if let Some(answer) = map.get("answer").and_then(Value::as_str) {
                return answer.to_string();
            }
            if let Some(Value::Array(answers)) = map.get("answers") {
                let has_kb = results.iter().any(|r| {
                    r.success
                        && matches!(r.tool_name(), Some("semantic_search") | Some("keyword_search"))
                });
                let has_web = results
                    .iter()
                    .any(|r| r.success && r.tool_name() == Some("web_search"));

                let header = match (has_kb, has_web) {
                    (true, true) if kb_confidence > 0.3 => {
                        Some("Answer synthesized from internal documents and external sources:")
                    }
                    (true, true) => {
                        Some("Answer from external sources (internal documents had low relevance):")
                    }
                    (false, true) => Some("Answer from external sources:"),
                    _ => None,
                };

                let body = answers
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join("\n\n");

                return match header {
                    Some(h) => format!("{h}\n\n{body}"),
                    None => body,
                };
            }
        }

        let has_data_or_citations = merged.data != Value::Null || !merged.citations.is_empty();
        if has_data_or_citations {
            if let Some(qa_chain) = &self.qa_chain {
                let context_documents = Self::citations_to_chunks(&merged.citations);
                match qa_chain.process_query(query, &context_documents, &[]).await {
                    Ok(chain_answer) if !chain_answer.answer.is_empty() => {
                        return chain_answer.answer;
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "qa_chain failed to generate answer from documents"),
                }
            } else {
                debug!("no direct answer field merged and no qa_chain configured; falling back to raw data");
            }
        }

        if merged.data != Value::Null {
            return merged.data.to_string();
        }

        NO_ANSWER.to_string()
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use magray_core::{Citation, RetrievedChunk, Tool};

    struct StubRetriever {
        confidence: f64,
        citations: Vec<Citation>,
    }

    #[async_trait]
    impl Retriever for StubRetriever {
        async fn retrieve(&self, _query: &str, _top_k: usize) -> anyhow::Result<Vec<RetrievedChunk>> {
            Ok(self
                .citations
                .iter()
                .map(|c| RetrievedChunk {
                    id: c.document.clone(),
                    content: c.content.clone(),
                    metadata: HashMap::new(),
                    semantic_score: self.confidence,
                    cross_encoder_score: None,
                })
                .collect())
        }
    }

    fn registry() -> ToolRegistry {
        tools::reference_registry("http://localhost:5678")
    }

    struct StubQaChain;

    #[async_trait]
    impl AnswerChain for StubQaChain {
        async fn process_query(
            &self,
            _query: &str,
            _context_documents: &[RetrievedChunk],
            _history: &[String],
        ) -> anyhow::Result<magray_core::ChainAnswer> {
            Ok(magray_core::ChainAnswer {
                answer: "stub answer".to_string(),
                sources: vec![],
                confidence: 0.9,
            })
        }

        async fn summarization_chain(
            &self,
            _query: &str,
            _docs: &[RetrievedChunk],
        ) -> anyhow::Result<magray_core::ChainAnswer> {
            Ok(magray_core::ChainAnswer {
                answer: "stub summary".to_string(),
                sources: vec![],
                confidence: 0.9,
            })
        }

        async fn comparison_chain(
            &self,
            _query: &str,
            _docs: &[RetrievedChunk],
        ) -> anyhow::Result<magray_core::ChainAnswer> {
            Ok(magray_core::ChainAnswer {
                answer: "Policy A allows remote work; Policy B does not.".to_string(),
                sources: vec![Citation::new("policy_a.pdf", "remote work allowed")],
                confidence: 0.85,
            })
        }
    }

    #[tokio::test]
    async fn conversational_query_short_circuits_without_running_tools() {
        let orchestrator = Orchestrator::new(registry(), OrchestratorConfig::default());
        let response = orchestrator.process_query("hi", HashMap::new()).await;
        assert_eq!(response.answer, CONVERSATIONAL_GREETING);
        assert_eq!(response.reasoning_trace.len(), 2);
        assert!(matches!(
            response.reasoning_trace[1],
            TraceEvent::ConversationalResponse { .. }
        ));
    }

    #[tokio::test]
    async fn simple_factual_query_selects_semantic_search_only() {
        let retriever = Arc::new(StubRetriever {
            confidence: 0.9,
            citations: vec![Citation::new("handbook.pdf", "Remote work is allowed three days a week.")],
        });
        let orchestrator = Orchestrator::new(registry(), OrchestratorConfig::default())
            .with_retriever(retriever);
        let response = orchestrator
            .process_query("What is the remote work policy?", HashMap::new())
            .await;

        let tools_used = response.metadata.get("tools_used").unwrap();
        assert_eq!(tools_used, &json!(["semantic_search"]));
    }

    #[tokio::test]
    async fn simple_factual_query_synthesizes_answer_via_qa_chain() {
        // semantic_search's own data is just `{"num_results": N}` — no
        // `answer`/`answers` key — so this exercises the qa_chain fallback.
        let retriever = Arc::new(StubRetriever {
            confidence: 0.9,
            citations: vec![Citation::new("handbook.pdf", "Remote work is allowed three days a week.")],
        });
        let orchestrator = Orchestrator::new(registry(), OrchestratorConfig::default())
            .with_retriever(retriever)
            .with_qa_chain(Arc::new(StubQaChain));
        let response = orchestrator
            .process_query("What is the remote work policy?", HashMap::new())
            .await;

        assert_eq!(response.answer, "stub answer");
    }

    #[tokio::test]
    async fn simple_factual_query_without_qa_chain_falls_back_to_raw_data() {
        let retriever = Arc::new(StubRetriever {
            confidence: 0.9,
            citations: vec![Citation::new("handbook.pdf", "Remote work is allowed three days a week.")],
        });
        let orchestrator = Orchestrator::new(registry(), OrchestratorConfig::default())
            .with_retriever(retriever);
        let response = orchestrator
            .process_query("What is the remote work policy?", HashMap::new())
            .await;

        assert!(response.answer.contains("num_results"));
    }

    #[tokio::test]
    async fn all_tools_failing_yields_all_tools_failed_metadata() {
        // No retriever configured: semantic_search fails precondition.
        let orchestrator = Orchestrator::new(registry(), OrchestratorConfig::default());
        let response = orchestrator
            .process_query("What is the remote work policy?", HashMap::new())
            .await;
        assert_eq!(response.metadata.get("all_tools_failed"), Some(&json!(true)));
        assert!(response.answer.starts_with(ALL_FAILED_PREFIX));
    }

    #[tokio::test]
    async fn comparison_query_selects_comparison_then_semantic_search_sequentially() {
        let retriever = Arc::new(StubRetriever {
            confidence: 0.8,
            citations: vec![Citation::new("doc", "some content about policies")],
        });
        let orchestrator = Orchestrator::new(registry(), OrchestratorConfig::default())
            .with_retriever(retriever)
            .with_qa_chain(Arc::new(StubQaChain));
        let response = orchestrator
            .process_query("Compare Policy A and Policy B", HashMap::new())
            .await;
        let tools_used = response.metadata.get("tools_used").unwrap().as_array().unwrap();
        let names: Vec<&str> = tools_used.iter().map(|v| v.as_str().unwrap()).collect();
        assert!(names.contains(&"comparison"));
    }

    #[test]
    fn build_plan_picks_sequential_for_summarization() {
        let tools: Vec<(Arc<dyn Tool>, f64)> = registry()
            .get_tools_by_name(&["semantic_search".to_string(), "summarization".to_string()], 0.8);
        let analysis = Analysis {
            complexity: Complexity::Simple,
            intent: Intent::Summarization,
            entities: vec![],
            requires_multiple_tools: false,
            keywords: HashMap::new(),
            query_length: 10,
            word_count: 2,
        };
        let plan = Orchestrator::build_plan(&tools, &analysis);
        assert_eq!(plan.strategy, Strategy::Sequential);
    }

    #[test]
    fn build_plan_picks_conditional_for_external_with_web_search_second() {
        let tools: Vec<(Arc<dyn Tool>, f64)> = registry()
            .get_tools_by_name(&["semantic_search".to_string(), "web_search".to_string()], 0.8);
        let analysis = Analysis {
            complexity: Complexity::Simple,
            intent: Intent::External,
            entities: vec![],
            requires_multiple_tools: false,
            keywords: HashMap::new(),
            query_length: 10,
            word_count: 2,
        };
        let plan = Orchestrator::build_plan(&tools, &analysis);
        assert_eq!(plan.strategy, Strategy::Conditional);
        assert!(plan.conditions.contains_key("web_search"));
    }
}
