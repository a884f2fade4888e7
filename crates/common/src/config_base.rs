use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Process-wide configuration for the orchestration core.
///
/// Every field mirrors one of the configuration knobs named by the
/// orchestration contract. Values can be overridden individually from
/// environment variables via [`OrchestratorConfig::from_env`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub max_parallel_workers: usize,
    pub min_tool_confidence: f64,
    pub use_llm_fallback: bool,

    pub citation_min_confidence: f64,
    pub citation_dedup_threshold: f64,
    pub excerpt_min_len: usize,
    pub excerpt_max_len: usize,
    pub sentence_min_len_chunking: usize,
    pub sentence_min_len_excerpt: usize,

    pub default_tool_timeout_secs: u64,
    pub web_search_timeout_secs: u64,
    pub url_ingestion_timeout_secs: u64,
    pub overall_query_timeout_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_parallel_workers: 3,
            min_tool_confidence: 0.3,
            use_llm_fallback: true,

            citation_min_confidence: 0.3,
            citation_dedup_threshold: 0.9,
            excerpt_min_len: 50,
            excerpt_max_len: 200,
            sentence_min_len_chunking: 20,
            sentence_min_len_excerpt: 10,

            default_tool_timeout_secs: 15,
            web_search_timeout_secs: 30,
            url_ingestion_timeout_secs: 60,
            overall_query_timeout_secs: 120,
        }
    }
}

impl OrchestratorConfig {
    /// Longer timeouts, smaller parallelism. For rate-limited or flaky
    /// collaborator endpoints.
    pub fn conservative() -> Self {
        Self {
            max_parallel_workers: 2,
            default_tool_timeout_secs: 25,
            web_search_timeout_secs: 45,
            url_ingestion_timeout_secs: 90,
            overall_query_timeout_secs: 180,
            ..Self::default()
        }
    }

    /// Shorter timeouts, higher parallelism. For local or low-latency
    /// collaborator endpoints.
    pub fn aggressive() -> Self {
        Self {
            max_parallel_workers: 6,
            default_tool_timeout_secs: 8,
            web_search_timeout_secs: 15,
            url_ingestion_timeout_secs: 30,
            overall_query_timeout_secs: 60,
            ..Self::default()
        }
    }

    /// Overlay environment variables onto a base config. Unset or
    /// unparseable variables leave the existing value untouched.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        macro_rules! overlay {
            ($field:ident, $env:literal) => {
                if let Ok(raw) = std::env::var($env) {
                    if let Ok(parsed) = raw.parse() {
                        cfg.$field = parsed;
                    }
                }
            };
        }
        overlay!(max_parallel_workers, "ORCHESTRATOR_MAX_PARALLEL_WORKERS");
        overlay!(min_tool_confidence, "ORCHESTRATOR_MIN_TOOL_CONFIDENCE");
        overlay!(use_llm_fallback, "ORCHESTRATOR_USE_LLM_FALLBACK");
        overlay!(citation_min_confidence, "ORCHESTRATOR_CITATION_MIN_CONFIDENCE");
        overlay!(citation_dedup_threshold, "ORCHESTRATOR_CITATION_DEDUP_THRESHOLD");
        overlay!(default_tool_timeout_secs, "ORCHESTRATOR_DEFAULT_TOOL_TIMEOUT_SECS");
        overlay!(web_search_timeout_secs, "ORCHESTRATOR_WEB_SEARCH_TIMEOUT_SECS");
        overlay!(url_ingestion_timeout_secs, "ORCHESTRATOR_URL_INGESTION_TIMEOUT_SECS");
        overlay!(overall_query_timeout_secs, "ORCHESTRATOR_OVERALL_QUERY_TIMEOUT_SECS");
        cfg
    }

    pub fn default_tool_timeout(&self) -> Duration {
        Duration::from_secs(self.default_tool_timeout_secs)
    }

    pub fn web_search_timeout(&self) -> Duration {
        Duration::from_secs(self.web_search_timeout_secs)
    }

    pub fn url_ingestion_timeout(&self) -> Duration {
        Duration::from_secs(self.url_ingestion_timeout_secs)
    }

    pub fn overall_query_timeout(&self) -> Duration {
        Duration::from_secs(self.overall_query_timeout_secs)
    }
}
