use magray_core::{Analysis, Complexity, Intent, KeywordCategory, LanguageModelHandler};
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

const CONVERSATIONAL_TOKENS: &[&str] = &[
    "hi", "hello", "hey", "thanks", "thank you", "bye", "goodbye", "ok", "okay", "got it",
    "understood", "sure", "great", "good", "cool", "nice", "awesome", "perfect",
];
const COMPARISON_KEYWORDS: &[&str] = &[
    "compare", "versus", " vs ", " vs.", "difference", "contrast", "similarities", "differ",
];
const SUMMARIZATION_KEYWORDS: &[&str] = &[
    "summarize", "summary", "overview", "key points", "main points", "highlights", "brief",
];
const CALCULATION_KEYWORDS: &[&str] = &[
    "calculate", "compute", " sum ", "total", "average", "%", "percentage",
];
const EXTERNAL_KEYWORDS: &[&str] = &[
    "current", "latest", "recent", "today", "now", "news", "weather", "stock price",
    "exchange rate",
];
const MULTI_STEP_KEYWORDS: &[&str] = &["then", "after", "first", "next", "finally", "also"];
const MULTI_STEP_SEQUENCE_KEYWORDS: &[&str] =
    &["then", "after that", "also", "and then", "followed by"];
const ENTITY_STOPWORDS: &[&str] = &["I", "A", "The", "In", "On", "At"];

const VALID_INTENTS: &[&str] = &[
    "conversational",
    "factual",
    "external",
    "comparison",
    "summarization",
    "calculation",
];

const INTENT_CLASSIFICATION_PROMPT: &str = "Classify the following query into exactly one of \
these intents: conversational, factual, external, comparison, summarization, calculation. \
Reply with only the intent word.\n\nQuery: ";

/// Classifies a raw query into an [`Analysis`]: complexity, intent,
/// entities, keyword hits, and the multiple-tool heuristic.
///
/// Intent classification tries a language-model handler first when one
/// is configured; any unparseable or missing response falls back to the
/// deterministic rule table below.
#[derive(Clone, Default)]
pub struct QueryAnalyzer {
    llm_handler: Option<Arc<dyn LanguageModelHandler>>,
}

impl QueryAnalyzer {
    pub fn new() -> Self {
        Self { llm_handler: None }
    }

    pub fn with_llm_handler(mut self, handler: Arc<dyn LanguageModelHandler>) -> Self {
        self.llm_handler = Some(handler);
        self
    }

    pub async fn analyze(&self, query: &str) -> Analysis {
        let complexity = Self::assess_complexity(query);
        let intent = self.classify_intent(query).await;
        let entities = Self::extract_entities(query);
        let keywords = Self::extract_keywords(query);
        let requires_multiple_tools =
            Self::requires_multiple_tools(query, complexity, intent, &keywords);

        Analysis {
            complexity,
            intent,
            entities,
            requires_multiple_tools,
            keywords,
            query_length: query.chars().count(),
            word_count: query.split_whitespace().count(),
        }
    }

    /// Integer score from word/sentence/question-mark/conjunction/comma
    /// counts plus a multi-step-keyword bonus. `>= 5` complex, `>= 2`
    /// moderate, else simple.
    fn assess_complexity(query: &str) -> Complexity {
        let word_count = query.split_whitespace().count();
        let sentence_count = query
            .trim()
            .split(|c| c == '.' || c == '!' || c == '?')
            .filter(|s| !s.trim().is_empty())
            .count();
        let question_marks = query.matches('?').count();
        let comma_count = query.matches(',').count();

        let and_or_re = Regex::new(r"(?i)\b(and|or)\b").expect("static regex");
        let and_or_count = and_or_re.find_iter(query).count();

        let query_lower = query.to_lowercase();
        let has_multi_step = MULTI_STEP_KEYWORDS
            .iter()
            .any(|kw| query_lower.contains(kw));

        let mut score = 0i32;
        if word_count > 20 {
            score += 2;
        } else if word_count > 10 {
            score += 1;
        }
        if sentence_count > 2 {
            score += 2;
        } else if sentence_count > 1 {
            score += 1;
        }
        if question_marks > 1 {
            score += 2;
        }
        if and_or_count > 2 {
            score += 2;
        } else if and_or_count > 0 {
            score += 1;
        }
        if comma_count > 2 {
            score += 1;
        }
        if has_multi_step {
            score += 3;
        }

        if score >= 5 {
            Complexity::Complex
        } else if score >= 2 {
            Complexity::Moderate
        } else {
            Complexity::Simple
        }
    }

    async fn classify_intent(&self, query: &str) -> Intent {
        if let Some(handler) = &self.llm_handler {
            if let Some(intent) = Self::llm_classify_intent(query, handler.as_ref()).await {
                return intent;
            }
        }
        Self::rule_based_classify_intent(query)
    }

    /// Low-temperature, short-output classification prompt. Parsed by
    /// exact match, then per-line (reverse order), then substring scan.
    /// Any failure to resolve a valid intent returns `None` so the
    /// caller falls back to the rule table.
    async fn llm_classify_intent(query: &str, handler: &dyn LanguageModelHandler) -> Option<Intent> {
        let prompt = format!("{INTENT_CLASSIFICATION_PROMPT}{query}");
        let reply = handler.generate(&prompt, 0.1, 10).await.ok()?;
        let stripped = reply.trim().to_lowercase();

        if let Some(intent) = Intent::parse(&stripped) {
            return Some(intent);
        }
        for line in stripped.lines().rev() {
            if let Some(intent) = Intent::parse(line.trim()) {
                return Some(intent);
            }
        }
        VALID_INTENTS
            .iter()
            .find(|candidate| stripped.contains(*candidate))
            .and_then(|candidate| Intent::parse(candidate))
    }

    fn rule_based_classify_intent(query: &str) -> Intent {
        let query_lower = query.to_lowercase();
        let words: Vec<&str> = query.split_whitespace().collect();

        let is_short_conversational = (words.len() == 1
            && CONVERSATIONAL_TOKENS.contains(&query_lower.as_str()))
            || (words.len() <= 3
                && !query.contains('?')
                && CONVERSATIONAL_TOKENS
                    .iter()
                    .any(|tok| query_lower.contains(tok)));
        if is_short_conversational {
            return Intent::Conversational;
        }

        if COMPARISON_KEYWORDS.iter().any(|kw| query_lower.contains(kw)) {
            return Intent::Comparison;
        }

        // Checked before calculation: "summarize" contains "sum".
        if SUMMARIZATION_KEYWORDS
            .iter()
            .any(|kw| query_lower.contains(kw))
        {
            return Intent::Summarization;
        }

        let has_numbers = query.chars().any(|c| c.is_ascii_digit());
        let has_arithmetic_operator = ['+', '-', '*', '/'].iter().any(|op| query.contains(*op));
        if CALCULATION_KEYWORDS.iter().any(|kw| query_lower.contains(kw))
            || (has_numbers && has_arithmetic_operator)
        {
            return Intent::Calculation;
        }

        if EXTERNAL_KEYWORDS.iter().any(|kw| query_lower.contains(kw)) {
            return Intent::External;
        }

        Intent::Factual
    }

    /// Union of capitalized non-leading words, quoted substrings, date-
    /// like tokens, and consecutive-capital phrases. Deduped case-
    /// insensitively, preserving first-seen order.
    fn extract_entities(query: &str) -> Vec<String> {
        let mut entities = Vec::new();
        let mut seen_lower = std::collections::HashSet::new();
        let mut push = |entities: &mut Vec<String>, candidate: String| {
            let key = candidate.to_lowercase();
            if seen_lower.insert(key) {
                entities.push(candidate);
            }
        };

        let words: Vec<&str> = query.split_whitespace().collect();
        for (idx, word) in words.iter().enumerate() {
            if idx == 0 {
                continue;
            }
            let trimmed: &str = word.trim_matches(|c: char| !c.is_alphanumeric());
            if trimmed.chars().count() <= 1 {
                continue;
            }
            if ENTITY_STOPWORDS.contains(&trimmed) {
                continue;
            }
            if trimmed.chars().next().is_some_and(|c| c.is_uppercase()) {
                push(&mut entities, trimmed.to_string());
            }
        }

        let quoted_re = Regex::new("\"([^\"]+)\"").expect("static regex");
        for cap in quoted_re.captures_iter(query) {
            push(&mut entities, cap[1].to_string());
        }

        let date_re = Regex::new(r"\b\d{4}\b|\b\d{1,2}/\d{1,2}/\d{2,4}\b").expect("static regex");
        for m in date_re.find_iter(query) {
            push(&mut entities, m.as_str().to_string());
        }

        let proper_noun_re =
            Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)+\b").expect("static regex");
        for m in proper_noun_re.find_iter(query) {
            push(&mut entities, m.as_str().to_string());
        }

        entities
    }

    /// Each category keeps only the keywords actually present in the
    /// query. Empty categories are still present in the map with an
    /// empty vector.
    fn extract_keywords(query: &str) -> HashMap<KeywordCategory, Vec<String>> {
        let query_lower = query.to_lowercase();
        let tables: &[(KeywordCategory, &[&str])] = &[
            (
                KeywordCategory::Comparison,
                &["compare", "versus", "vs", "difference", "contrast", "similar"],
            ),
            (
                KeywordCategory::Calculation,
                &["calculate", "compute", "sum", "total", "average", "percentage"],
            ),
            (
                KeywordCategory::Summarization,
                &["summarize", "summary", "overview", "key points", "highlights"],
            ),
            (
                KeywordCategory::External,
                &["current", "latest", "recent", "today", "now", "news"],
            ),
            (
                KeywordCategory::Temporal,
                &["when", "date", "time", "year", "month", "day", "yesterday", "tomorrow"],
            ),
            (
                KeywordCategory::Quantitative,
                &["how many", "how much", "count", "number", "amount", "quantity"],
            ),
        ];

        tables
            .iter()
            .map(|(category, keywords)| {
                let matched = keywords
                    .iter()
                    .filter(|kw| query_lower.contains(**kw))
                    .map(|kw| kw.to_string())
                    .collect();
                (*category, matched)
            })
            .collect()
    }

    fn requires_multiple_tools(
        query: &str,
        complexity: Complexity,
        intent: Intent,
        keywords: &HashMap<KeywordCategory, Vec<String>>,
    ) -> bool {
        if complexity == Complexity::Complex {
            return true;
        }

        let query_lower = query.to_lowercase();
        if MULTI_STEP_SEQUENCE_KEYWORDS
            .iter()
            .any(|kw| query_lower.contains(kw))
        {
            return true;
        }

        if query.matches('?').count() > 1 {
            return true;
        }

        let matched_categories = keywords.values().filter(|v| !v.is_empty()).count();
        if matched_categories >= 2 {
            return true;
        }

        if complexity == Complexity::Moderate
            && matches!(intent, Intent::Comparison | Intent::Calculation)
        {
            return true;
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[tokio::test]
    async fn conversational_short_circuit() {
        let analyzer = QueryAnalyzer::new();
        let analysis = analyzer.analyze("hi").await;
        assert_eq!(analysis.intent, Intent::Conversational);
    }

    #[rstest]
    #[case("What is the remote work policy?", Intent::Factual)]
    #[case("Compare Policy A and Policy B", Intent::Comparison)]
    #[case("Summarize the uploaded report.", Intent::Summarization)]
    #[case("Calculate 15% of 1000", Intent::Calculation)]
    #[case("What is the current weather in Tokyo?", Intent::External)]
    #[tokio::test]
    async fn rule_based_intent_table(#[case] query: &str, #[case] expected: Intent) {
        let analyzer = QueryAnalyzer::new();
        let analysis = analyzer.analyze(query).await;
        assert_eq!(analysis.intent, expected);
    }

    #[test]
    fn summarize_does_not_trigger_calculation_via_sum() {
        let intent = QueryAnalyzer::rule_based_classify_intent("Summarize the key points");
        assert_eq!(intent, Intent::Summarization);
    }

    #[test]
    fn complexity_escalates_with_multi_step_keyword() {
        let simple = QueryAnalyzer::assess_complexity("What is X?");
        assert_eq!(simple, Complexity::Simple);

        let complex =
            QueryAnalyzer::assess_complexity("First find X, then compare it with Y, and also summarize Z.");
        assert_eq!(complex, Complexity::Complex);
    }

    #[test]
    fn entity_extraction_finds_comparison_pair() {
        let entities = QueryAnalyzer::extract_entities("Compare Policy A and Policy B");
        assert!(entities.iter().any(|e| e.contains("Policy")));
    }

    #[test]
    fn entity_extraction_dedups_case_insensitively() {
        let entities = QueryAnalyzer::extract_entities("Find Acme and acme again, Acme.");
        let lower: Vec<String> = entities.iter().map(|e| e.to_lowercase()).collect();
        let count = lower.iter().filter(|e| e.as_str() == "acme").count();
        assert_eq!(count, 1);
    }

    #[test]
    fn multiple_tools_required_for_complex_queries() {
        let keywords = QueryAnalyzer::extract_keywords("Compare Policy A and Policy B");
        let required = QueryAnalyzer::requires_multiple_tools(
            "Compare Policy A and Policy B",
            Complexity::Complex,
            Intent::Comparison,
            &keywords,
        );
        assert!(required);
    }
}
