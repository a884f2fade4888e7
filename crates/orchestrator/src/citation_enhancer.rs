use common::OrchestratorConfig;
use magray_core::{Citation, EmbeddingModel};
use std::collections::BTreeMap;

/// Turns the raw citations a tool attaches to a [`ToolResult`] into
/// ranked, excerpted, deduplicated evidence.
///
/// Three independent passes: excerpt extraction (query-aware when an
/// embedding model is available), confidence fusion (deterministic,
/// never needs a model), then re-rank/filter/dedup. The embedding model
/// is optional everywhere — every enhancer operation degrades to a
/// content-only heuristic rather than failing when it is absent.
///
/// [`ToolResult`]: magray_core::ToolResult
pub struct CitationEnhancer {
    min_confidence: f64,
    dedup_threshold: f64,
    excerpt_min_len: usize,
    excerpt_max_len: usize,
    sentence_min_len: usize,
}

impl CitationEnhancer {
    pub fn new(config: &OrchestratorConfig) -> Self {
        Self {
            min_confidence: config.citation_min_confidence,
            dedup_threshold: config.citation_dedup_threshold,
            excerpt_min_len: config.excerpt_min_len,
            excerpt_max_len: config.excerpt_max_len,
            sentence_min_len: config.sentence_min_len_excerpt,
        }
    }

    /// Enhances one tool's citations: excerpt, fuse confidence, re-rank,
    /// filter low-confidence entries, then drop near-duplicate content.
    /// `tool_confidence` is the producing `ToolResult`'s
    /// `metadata.confidence` (defaults to 1.0 upstream when absent).
    pub async fn enhance(
        &self,
        citations: &[Citation],
        query: &str,
        tool_confidence: f64,
        embedding_model: Option<&dyn EmbeddingModel>,
    ) -> Vec<Citation> {
        let mut enhanced = Vec::with_capacity(citations.len());
        for citation in citations {
            let mut c = citation.clone();
            c.excerpt = self.extract_excerpt(&c.content, query, embedding_model).await;
            c.confidence_score = Self::fuse_confidence(
                c.rank_position,
                tool_confidence,
                c.similarity_score,
                c.cross_encoder_score,
            );
            enhanced.push(c);
        }

        enhanced.sort_by(|a, b| {
            b.confidence_score
                .partial_cmp(&a.confidence_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for (idx, c) in enhanced.iter_mut().enumerate() {
            c.rank_position = (idx + 1) as u32;
        }

        let filtered = self.filter_by_confidence(enhanced);
        self.deduplicate_citations(filtered, embedding_model).await
    }

    /// Short content or a missing query: plain truncation. Otherwise
    /// picks the sentence most similar to the query by cosine similarity
    /// of embeddings, falling back to plain truncation when no embedding
    /// model is configured.
    async fn extract_excerpt(
        &self,
        content: &str,
        query: &str,
        embedding_model: Option<&dyn EmbeddingModel>,
    ) -> String {
        if content.chars().count() < self.excerpt_min_len || query.trim().is_empty() {
            return Self::truncate_at_sentence_boundary(content, self.excerpt_max_len);
        }

        let Some(model) = embedding_model else {
            return Self::truncate_at_sentence_boundary(content, self.excerpt_max_len);
        };

        let sentences = Self::split_sentences(content, self.sentence_min_len);
        if sentences.is_empty() {
            return Self::truncate_at_sentence_boundary(content, self.excerpt_max_len);
        }

        let Ok(query_embedding) = model.embed(query).await else {
            return Self::truncate_at_sentence_boundary(content, self.excerpt_max_len);
        };

        let mut best_idx = 0usize;
        let mut best_score = f64::MIN;
        for (idx, sentence) in sentences.iter().enumerate() {
            let Ok(embedding) = model.embed(sentence).await else {
                continue;
            };
            let score = Self::cosine_similarity(&query_embedding, &embedding);
            if score > best_score {
                best_score = score;
                best_idx = idx;
            }
        }

        let mut chosen = sentences[best_idx].clone();
        if chosen.chars().count() < self.excerpt_min_len {
            if let Some(next) = sentences.get(best_idx + 1) {
                chosen.push(' ');
                chosen.push_str(next);
            }
        }

        Self::truncate_at_sentence_boundary(&chosen, self.excerpt_max_len)
    }

    fn split_sentences(content: &str, min_len: usize) -> Vec<String> {
        content
            .split(['.', '!', '?'])
            .map(|s| s.trim().to_string())
            .filter(|s| s.chars().count() > min_len)
            .collect()
    }

    fn truncate_at_sentence_boundary(text: &str, max_len: usize) -> String {
        let trimmed = text.trim();
        if trimmed.chars().count() <= max_len {
            return trimmed.to_string();
        }

        let window: String = trimmed.chars().take(max_len).collect();
        for boundary in [". ", "! ", "? "] {
            if let Some(pos) = window.rfind(boundary) {
                return window[..pos + 1].trim().to_string();
            }
        }
        match window.rfind(' ') {
            Some(pos) => format!("{}...", window[..pos].trim()),
            None => format!("{window}..."),
        }
    }

    /// `r = max(0.1, 1 - 0.1*(rank-1))`; weighted against similarity,
    /// cross-encoder (when present), and tool-reported confidence, then
    /// clamped to `[0, 1]`.
    fn fuse_confidence(rank: u32, tool_confidence: f64, similarity: f64, cross_encoder: f64) -> f64 {
        let r = (1.0 - 0.1 * (rank.saturating_sub(1)) as f64).max(0.1);
        let raw = if cross_encoder > 0.0 {
            0.3 * similarity + 0.4 * cross_encoder + 0.2 * r + 0.1 * tool_confidence
        } else {
            0.5 * similarity + 0.3 * r + 0.2 * tool_confidence
        };
        raw.clamp(0.0, 1.0)
    }

    fn filter_by_confidence(&self, citations: Vec<Citation>) -> Vec<Citation> {
        citations
            .into_iter()
            .filter(|c| c.confidence_score >= self.min_confidence)
            .collect()
    }

    /// Drops citations whose `content` embedding is within
    /// `dedup_threshold` cosine similarity of an already-accepted
    /// citation. Input must already be sorted by confidence descending
    /// so the higher-confidence citation of a near-duplicate pair is the
    /// one kept. With no embedding model, dedup cannot be computed and
    /// the list passes through unchanged.
    async fn deduplicate_citations(
        &self,
        citations: Vec<Citation>,
        embedding_model: Option<&dyn EmbeddingModel>,
    ) -> Vec<Citation> {
        let Some(model) = embedding_model else {
            return citations;
        };

        let mut accepted: Vec<Citation> = Vec::new();
        let mut accepted_embeddings: Vec<Vec<f32>> = Vec::new();

        for citation in citations {
            let Ok(embedding) = model.embed(&citation.content).await else {
                accepted.push(citation);
                continue;
            };
            let is_duplicate = accepted_embeddings
                .iter()
                .any(|existing| Self::cosine_similarity(existing, &embedding) >= self.dedup_threshold);
            if !is_duplicate {
                accepted_embeddings.push(embedding);
                accepted.push(citation);
            }
        }

        accepted
    }

    /// Buckets by document, each bucket ordered by `(page_number,
    /// rank_position)` ascending.
    pub fn group_by_document(citations: &[Citation]) -> BTreeMap<String, Vec<Citation>> {
        let mut grouped: BTreeMap<String, Vec<Citation>> = BTreeMap::new();
        for citation in citations {
            grouped
                .entry(citation.document.clone())
                .or_default()
                .push(citation.clone());
        }
        for bucket in grouped.values_mut() {
            bucket.sort_by_key(|c| (c.page_number, c.rank_position));
        }
        grouped
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
        if a.is_empty() || b.is_empty() || a.len() != b.len() {
            return 0.0;
        }
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            (dot / (norm_a * norm_b)) as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubEmbedder;

    #[async_trait]
    impl EmbeddingModel for StubEmbedder {
        async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            // Deterministic toy embedding: favors overlap with "benefits".
            let hit = if text.to_lowercase().contains("benefit") { 1.0 } else { 0.0 };
            Ok(vec![hit, 1.0 - hit])
        }
    }

    fn citation(document: &str, content: &str, similarity: f64, rank: u32) -> Citation {
        let mut c = Citation::new(document, content);
        c.similarity_score = similarity;
        c.rank_position = rank;
        c
    }

    #[tokio::test]
    async fn confidence_scores_are_clamped_into_unit_interval() {
        let config = OrchestratorConfig::default();
        let enhancer = CitationEnhancer::new(&config);
        let citations = vec![citation("doc", "a".repeat(60).as_str(), 1.5, 1)];
        let enhanced = enhancer.enhance(&citations, "", 1.0, None).await;
        assert!(enhanced[0].confidence_score >= 0.0 && enhanced[0].confidence_score <= 1.0);
    }

    #[tokio::test]
    async fn low_confidence_citations_are_filtered_out() {
        let config = OrchestratorConfig::default();
        let enhancer = CitationEnhancer::new(&config);
        let citations = vec![citation("doc", &"x".repeat(60), 0.0, 5)];
        let enhanced = enhancer.enhance(&citations, "", 0.0, None).await;
        assert!(enhanced.is_empty());
    }

    #[tokio::test]
    async fn rerank_reassigns_rank_position_by_confidence_descending() {
        let config = OrchestratorConfig::default();
        let enhancer = CitationEnhancer::new(&config);
        let citations = vec![
            citation("doc", &"x".repeat(60), 0.2, 1),
            citation("doc2", &"y".repeat(60), 0.9, 2),
        ];
        let enhanced = enhancer.enhance(&citations, "", 1.0, None).await;
        assert_eq!(enhanced[0].document, "doc2");
        assert_eq!(enhanced[0].rank_position, 1);
        assert_eq!(enhanced[1].rank_position, 2);
    }

    #[tokio::test]
    async fn short_content_truncates_without_query() {
        let config = OrchestratorConfig::default();
        let enhancer = CitationEnhancer::new(&config);
        let excerpt = enhancer.extract_excerpt("short", "", None).await;
        assert_eq!(excerpt, "short");
    }

    #[tokio::test]
    async fn excerpt_picks_most_similar_sentence_with_embedding_model() {
        let config = OrchestratorConfig::default();
        let enhancer = CitationEnhancer::new(&config);
        let content = "This paragraph discusses unrelated filler content indeed. \
            The benefits of remote work include flexibility and fewer commutes for everyone involved.";
        let embedder = StubEmbedder;
        let excerpt = enhancer.extract_excerpt(content, "benefits", Some(&embedder)).await;
        assert!(excerpt.to_lowercase().contains("benefit"));
    }

    #[tokio::test]
    async fn dedup_drops_near_duplicate_content_keeping_higher_confidence() {
        let config = OrchestratorConfig::default();
        let enhancer = CitationEnhancer::new(&config);
        let mut high = citation("doc", "the benefits of x", 0.9, 1);
        high.confidence_score = 0.9;
        let mut low = citation("doc2", "the benefits of x again", 0.5, 2);
        low.confidence_score = 0.5;
        let embedder = StubEmbedder;
        let deduped = enhancer
            .deduplicate_citations(vec![high, low], Some(&embedder))
            .await;
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].document, "doc");
    }

    #[tokio::test]
    async fn dedup_passes_through_unchanged_without_embedding_model() {
        let config = OrchestratorConfig::default();
        let enhancer = CitationEnhancer::new(&config);
        let citations = vec![
            citation("doc", "same text", 0.9, 1),
            citation("doc2", "same text", 0.5, 2),
        ];
        let deduped = enhancer.deduplicate_citations(citations, None).await;
        assert_eq!(deduped.len(), 2);
    }

    #[test]
    fn group_by_document_buckets_and_sorts_by_page_then_rank() {
        let mut a = citation("doc", "a", 0.5, 2);
        a.page_number = 3;
        let mut b = citation("doc", "b", 0.5, 1);
        b.page_number = 1;
        let grouped = CitationEnhancer::group_by_document(&[a, b]);
        let doc_citations = grouped.get("doc").unwrap();
        assert_eq!(doc_citations[0].page_number, 1);
        assert_eq!(doc_citations[1].page_number, 3);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn fuse_confidence_stays_in_unit_interval(
                rank in 1u32..1000,
                tool_confidence in -10.0f64..10.0,
                similarity in -10.0f64..10.0,
                cross_encoder in -10.0f64..10.0,
            ) {
                let fused = CitationEnhancer::fuse_confidence(rank, tool_confidence, similarity, cross_encoder);
                prop_assert!((0.0..=1.0).contains(&fused));
            }
        }
    }
}
