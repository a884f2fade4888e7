//! Query classification: complexity, intent, entities, and the
//! multiple-tool heuristic that feeds tool selection downstream.
//!
//! Intent classification is two-tier: an optional language-model pass
//! runs first when a handler is configured, and a deterministic rule
//! table is the fallback — and the only path when no handler is set.
//! The rule table is what the test suite exercises; the model path is
//! advisory and a parse failure simply falls through to it.

mod query_analyzer;

pub use query_analyzer::QueryAnalyzer;
