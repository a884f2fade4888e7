use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// One chunk returned by a retriever, with optional reranker score.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub id: String,
    pub content: String,
    pub metadata: HashMap<String, String>,
    pub semantic_score: f64,
    pub cross_encoder_score: Option<f64>,
}

/// The document retrieval engine. Out of scope for this crate to
/// implement — only the interface every tool and the citation enhancer
/// consume is specified here.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>>;

    async fn semantic_search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>> {
        self.retrieve(query, top_k).await
    }

    async fn keyword_search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>> {
        self.retrieve(query, top_k).await
    }

    /// Whether a dedicated keyword/lexical index backs `keyword_search`,
    /// or it is simulated by falling back to semantic retrieval.
    fn has_keyword_index(&self) -> bool {
        false
    }
}

/// The language-model client used for intent classification, tool-
/// selection fallback, and anything a tool delegates to a model.
#[async_trait]
pub trait LanguageModelHandler: Send + Sync {
    async fn generate(&self, prompt: &str, temperature: f64, max_tokens: u32) -> Result<String>;
}

/// The embedding/reranking model backing excerpt selection and citation
/// dedup in the citation enhancer. Out of scope to implement — only the
/// interface the enhancer consumes is specified here.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Result of handing a query (plus supporting documents) to the answer-
/// generation chain.
#[derive(Debug, Clone)]
pub struct ChainAnswer {
    pub answer: String,
    pub sources: Vec<crate::citation::Citation>,
    pub confidence: f64,
}

/// The answer-synthesis chain. Tools that need a natural-language answer
/// rather than raw citations (summarization, comparison, generic QA)
/// delegate to this collaborator.
#[async_trait]
pub trait AnswerChain: Send + Sync {
    async fn process_query(
        &self,
        query: &str,
        context_documents: &[RetrievedChunk],
        history: &[String],
    ) -> Result<ChainAnswer>;

    async fn summarization_chain(
        &self,
        query: &str,
        docs: &[RetrievedChunk],
    ) -> Result<ChainAnswer>;

    async fn comparison_chain(&self, query: &str, docs: &[RetrievedChunk]) -> Result<ChainAnswer>;
}
