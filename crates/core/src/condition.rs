use serde::{Deserialize, Serialize};

/// Predicate DSL gating a tool in the Conditional execution strategy. All
/// set fields are combined by logical AND; unset fields are vacuously
/// true. See the execution engine for how each clause reads prior
/// results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Condition {
    pub requires: Option<String>,
    pub min_confidence: Option<f64>,
    pub max_confidence: Option<f64>,
    pub max_citations: Option<usize>,
    pub context_key: Option<String>,
}

impl Condition {
    pub fn max_confidence(threshold: f64) -> Self {
        Self {
            max_confidence: Some(threshold),
            ..Self::default()
        }
    }

    pub fn min_confidence_and_max_citations(min_confidence: f64, max_citations: usize) -> Self {
        Self {
            min_confidence: Some(min_confidence),
            max_citations: Some(max_citations),
            ..Self::default()
        }
    }
}
