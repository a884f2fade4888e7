use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Conversational,
    Factual,
    External,
    Comparison,
    Summarization,
    Calculation,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Conversational => "conversational",
            Intent::Factual => "factual",
            Intent::External => "external",
            Intent::Comparison => "comparison",
            Intent::Summarization => "summarization",
            Intent::Calculation => "calculation",
        }
    }

    /// Parses a model reply or a rule-based label. Returns `None` if the
    /// token does not match one of the six intents — callers fall back
    /// to rule-based classification on `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "conversational" => Some(Intent::Conversational),
            "factual" => Some(Intent::Factual),
            "external" => Some(Intent::External),
            "comparison" => Some(Intent::Comparison),
            "summarization" => Some(Intent::Summarization),
            "calculation" => Some(Intent::Calculation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordCategory {
    Comparison,
    Calculation,
    Summarization,
    External,
    Temporal,
    Quantitative,
}

/// Output of the query analyzer: everything downstream tool selection and
/// plan construction need to know about one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub complexity: Complexity,
    pub intent: Intent,
    pub entities: Vec<String>,
    pub requires_multiple_tools: bool,
    pub keywords: HashMap<KeywordCategory, Vec<String>>,
    pub query_length: usize,
    pub word_count: usize,
}

impl Analysis {
    pub fn matched_categories(&self) -> usize {
        self.keywords.values().filter(|v| !v.is_empty()).count()
    }
}
