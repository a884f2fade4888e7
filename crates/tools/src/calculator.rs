use crate::expr;
use async_trait::async_trait;
use magray_core::{Tool, ToolContext, ToolResult};
use regex::Regex;
use serde_json::json;
use std::time::Duration;

const HIGH_CONFIDENCE_KEYWORDS: &[&str] = &["calculate", "computation", "compute", "what is", "what's"];
const MATH_OPERATION_WORDS: &[&str] = &[
    "sum", "total", "add", "subtract", "multiply", "divide", "percentage", "percent", "%",
    "average", "mean", "difference",
];
const OPERATOR_CHARS: &[char] = &['+', '-', '*', '/', '^', '%'];

/// Arithmetic and percentage evaluation, falling back to extracting
/// numbers from retrieved documents when the query has no closed-form
/// expression of its own.
pub struct CalculatorTool;

impl CalculatorTool {
    pub fn new() -> Self {
        Self
    }

    fn has_digit(s: &str) -> bool {
        s.chars().any(|c| c.is_ascii_digit())
    }

    fn count_numbers(query: &str) -> usize {
        let re = Regex::new(r"\d+\.?\d*").expect("static regex");
        re.find_iter(query).count()
    }

    /// Tries a percentage pattern, then a simple binary-arithmetic
    /// pattern, then a general arithmetic substring. Returns the matched
    /// expression text alongside its value.
    fn evaluate_query(query: &str) -> Option<(String, f64)> {
        let percent_re =
            Regex::new(r"(\d+\.?\d*)\s*%\s*(?:of|from)?\s*(\d+\.?\d*)").expect("static regex");
        if let Some(caps) = percent_re.captures(query) {
            let percent: f64 = caps[1].parse().ok()?;
            let value: f64 = caps[2].parse().ok()?;
            let result = percent / 100.0 * value;
            return Some((format!("{percent}% of {value}"), result));
        }

        let simple_re =
            Regex::new(r"(\d+\.?\d*)\s*([\+\-\*/])\s*(\d+\.?\d*)").expect("static regex");
        if let Some(caps) = simple_re.captures(query) {
            let a: f64 = caps[1].parse().ok()?;
            let op = &caps[2];
            let b: f64 = caps[3].parse().ok()?;
            let result = match op {
                "+" => a + b,
                "-" => a - b,
                "*" => a * b,
                "/" if b != 0.0 => a / b,
                _ => return None,
            };
            return Some((format!("{a} {op} {b}"), result));
        }

        let expr_re = Regex::new(r"[\d\s\+\-\*/\(\)\.]+").expect("static regex");
        for m in expr_re.find_iter(query) {
            let candidate = m.as_str().trim();
            if candidate.is_empty() || !candidate.chars().any(|c| OPERATOR_CHARS.contains(&c)) {
                continue;
            }
            if let Ok(result) = expr::evaluate(candidate) {
                return Some((candidate.to_string(), result));
            }
        }

        None
    }

    fn extract_numbers(text: &str) -> Vec<f64> {
        let re = Regex::new(r"\d+\.?\d*").expect("static regex");
        re.find_iter(text)
            .filter_map(|m| m.as_str().parse::<f64>().ok())
            .take(5)
            .collect()
    }

    /// Sum/average/difference over numbers found in prior citations,
    /// chosen by keyword detection in the query.
    fn calculate_from_documents(query: &str, citations: &[magray_core::Citation]) -> Option<(String, f64)> {
        let query_lower = query.to_lowercase();
        let mut all_numbers = Vec::new();
        for citation in citations {
            all_numbers.extend(Self::extract_numbers(&citation.content));
        }
        if all_numbers.is_empty() {
            return None;
        }

        if ["sum", "total", "add", "plus"].iter().any(|k| query_lower.contains(k)) {
            let sum: f64 = all_numbers.iter().sum();
            return Some(("sum of document figures".to_string(), sum));
        }
        if ["average", "mean"].iter().any(|k| query_lower.contains(k)) {
            let mean = all_numbers.iter().sum::<f64>() / all_numbers.len() as f64;
            return Some(("average of document figures".to_string(), mean));
        }
        if ["difference", "subtract"].iter().any(|k| query_lower.contains(k)) {
            if all_numbers.len() >= 2 {
                return Some((
                    "difference of first two document figures".to_string(),
                    all_numbers[0] - all_numbers[1],
                ));
            }
            return None;
        }
        None
    }

    fn format_answer(expression: &str, result: f64) -> String {
        let result_str = if result.fract() == 0.0 {
            format!("{}", result as i64)
        } else {
            format!("{result:.2}")
        };
        format!("The result of {expression} is {result_str}.")
    }
}

impl Default for CalculatorTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Perform mathematical calculations (e.g., 'Calculate 15% of 1000', 'What's the sum of X and Y?')"
    }

    fn can_handle(&self, query: &str, _context: &ToolContext) -> f64 {
        let q = query.to_lowercase();
        let has_digit = Self::has_digit(query);

        if HIGH_CONFIDENCE_KEYWORDS.iter().any(|k| q.contains(k)) && has_digit {
            return 0.95;
        }
        if MATH_OPERATION_WORDS.iter().any(|k| q.contains(k)) && has_digit {
            return 0.85;
        }
        if query.chars().any(|c| OPERATOR_CHARS.contains(&c)) && has_digit {
            return 0.9;
        }
        if Self::count_numbers(query) >= 2 {
            return 0.7;
        }
        0.2
    }

    async fn execute(&self, query: &str, context: &ToolContext) -> ToolResult {
        if let Some((expression, result)) = Self::evaluate_query(query) {
            return ToolResult::success(json!({ "answer": Self::format_answer(&expression, result), "result": result }))
                .with_metadata("tool", self.name());
        }

        if let Some((expression, result)) =
            Self::calculate_from_documents(query, &context.previous_citations)
        {
            return ToolResult::success(json!({ "answer": Self::format_answer(&expression, result), "result": result }))
                .with_metadata("tool", self.name())
                .with_metadata("source", "documents");
        }

        ToolResult::failure(self.name(), "could not evaluate a calculation for this query")
    }

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(15)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_pattern_evaluates() {
        let (_, result) = CalculatorTool::evaluate_query("Calculate 15% of 1000").unwrap();
        assert_eq!(result, 150.0);
    }

    #[test]
    fn simple_arithmetic_pattern_evaluates() {
        let (_, result) = CalculatorTool::evaluate_query("What is 4 + 5?").unwrap();
        assert_eq!(result, 9.0);
    }

    #[test]
    fn format_answer_drops_decimal_for_integers() {
        assert_eq!(
            CalculatorTool::format_answer("4 + 5", 9.0),
            "The result of 4 + 5 is 9."
        );
    }

    #[tokio::test]
    async fn execute_calculates_percentage() {
        let tool = CalculatorTool::new();
        let ctx = ToolContext::new("Calculate 15% of 1000");
        let result = tool.execute("Calculate 15% of 1000", &ctx).await;
        assert!(result.success);
        assert_eq!(result.data["result"], 150.0);
    }

    #[tokio::test]
    async fn execute_falls_back_to_document_numbers() {
        let tool = CalculatorTool::new();
        let mut ctx = ToolContext::new("What is the total of the figures?");
        ctx.previous_citations = vec![
            magray_core::Citation::new("doc", "Revenue was 100 and costs were 40."),
        ];
        let result = tool.execute("What is the total of the figures?", &ctx).await;
        assert!(result.success);
        assert_eq!(result.data["result"], 140.0);
    }
}
