use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;

/// One evidence fragment backing part of an answer.
///
/// `content` carries the full source chunk for internal use (excerpt
/// extraction, similarity scoring) but is never serialized into an
/// external response — only `excerpt` is. Score fields round to three
/// decimals on the wire; the unrounded values are kept for internal
/// ranking and dedup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub document: String,
    pub page_number: u32,
    pub excerpt: String,
    #[serde(skip_serializing)]
    pub content: String,
    #[serde(serialize_with = "round3")]
    pub similarity_score: f64,
    #[serde(serialize_with = "round3")]
    pub cross_encoder_score: f64,
    pub rank_position: u32,
    #[serde(serialize_with = "round3")]
    pub confidence_score: f64,
    pub metadata: HashMap<String, String>,
}

fn round3<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64((value * 1000.0).round() / 1000.0)
}

impl Citation {
    pub fn new(document: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            page_number: 0,
            excerpt: String::new(),
            content: content.into(),
            similarity_score: 0.0,
            cross_encoder_score: 0.0,
            rank_position: 1,
            confidence_score: 0.0,
            metadata: HashMap::new(),
        }
    }

    /// Dedup key used by merge and by group-by-document.
    pub fn dedup_key(&self) -> (String, u32) {
        (self.document.clone(), self.page_number)
    }

    pub fn tool_confidence(&self) -> f64 {
        self.metadata
            .get("confidence")
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(1.0)
    }
}
