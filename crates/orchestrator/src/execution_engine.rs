use magray_core::{Citation, Condition, ExecutionPlan, Strategy, Tool, ToolContext, ToolResult, TraceEvent};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};

/// Outcome of running one tool under its timeout. `Panicked` is kept
/// distinct from a normal failed `ToolResult` so the caller can emit a
/// `tool_error` trace entry rather than `tool_failure`.
enum RunOutcome {
    Result(ToolResult),
    Panicked { tool: String, error: String },
}

/// Executes an [`ExecutionPlan`] under one of three strategies, keeping
/// a per-call reasoning trace and merging heterogeneous tool outputs.
///
/// One engine instance is owned by the orchestrator and reused across
/// queries; the trace is guarded by an async mutex rather than cloned
/// per query, so concurrent `execute` calls serialize around it but
/// never observe a partially-written trace.
pub struct ExecutionEngine {
    max_parallel_workers: usize,
    trace: Mutex<Vec<TraceEvent>>,
}

impl ExecutionEngine {
    pub fn new(max_parallel_workers: usize) -> Self {
        Self {
            max_parallel_workers: max_parallel_workers.max(1),
            trace: Mutex::new(Vec::new()),
        }
    }

    /// Clears the trace, runs the plan under its strategy, and returns
    /// both the tool results and a copy of the trace produced.
    pub async fn execute(
        &self,
        plan: &ExecutionPlan,
        context: &ToolContext,
    ) -> (Vec<ToolResult>, Vec<TraceEvent>) {
        let mut trace = self.trace.lock().await;
        trace.clear();

        let results = match plan.strategy {
            Strategy::Sequential => self.execute_sequential(plan, context, &mut trace).await,
            Strategy::Parallel => self.execute_parallel(plan, context, &mut trace).await,
            Strategy::Conditional => self.execute_conditional(plan, context, &mut trace).await,
        };

        (results, trace.clone())
    }

    pub async fn get_execution_trace(&self) -> Vec<TraceEvent> {
        self.trace.lock().await.clone()
    }

    async fn execute_sequential(
        &self,
        plan: &ExecutionPlan,
        context: &ToolContext,
        trace: &mut Vec<TraceEvent>,
    ) -> Vec<ToolResult> {
        let mut results = Vec::new();
        let mut ctx = context.clone();

        for (tool, _confidence) in &plan.tools {
            let name = tool.name().to_string();
            trace.push(TraceEvent::ExecuteTool { tool: name.clone() });

            match Self::run_tool(tool.clone(), ctx.query.clone(), ctx.clone()).await {
                RunOutcome::Result(result) => {
                    if result.success {
                        trace.push(TraceEvent::ToolSuccess {
                            tool: name,
                            citations: result.citations.len(),
                        });
                        ctx.propagate(&result);
                    } else {
                        trace.push(TraceEvent::ToolFailure {
                            tool: name,
                            error: result.error.clone().unwrap_or_default(),
                        });
                    }
                    results.push(result);
                }
                RunOutcome::Panicked { tool, error } => {
                    trace.push(TraceEvent::ToolError { tool: tool.clone(), error: error.clone() });
                    results.push(ToolResult::failure(&tool, error));
                }
            }
        }

        results
    }

    /// Fans out immediately onto a bounded worker pool; the *initial*
    /// context is cloned into every task, so tool k+1 never observes
    /// tool k's effects. Results are gathered in completion order.
    async fn execute_parallel(
        &self,
        plan: &ExecutionPlan,
        context: &ToolContext,
        trace: &mut Vec<TraceEvent>,
    ) -> Vec<ToolResult> {
        let semaphore = Arc::new(Semaphore::new(self.max_parallel_workers));
        let mut set = tokio::task::JoinSet::new();

        for (tool, _confidence) in &plan.tools {
            trace.push(TraceEvent::SubmitTool { tool: tool.name().to_string() });
            let tool = tool.clone();
            let query = context.query.clone();
            let ctx = context.clone();
            let sem = semaphore.clone();
            set.spawn(async move {
                let _permit = sem.acquire_owned().await.expect("semaphore never closed");
                Self::run_tool(tool, query, ctx).await
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(RunOutcome::Result(result)) => {
                    let name = result.tool_name().unwrap_or("unknown").to_string();
                    if result.success {
                        trace.push(TraceEvent::ToolComplete { tool: name });
                    } else {
                        trace.push(TraceEvent::ToolFailure {
                            tool: name,
                            error: result.error.clone().unwrap_or_default(),
                        });
                    }
                    results.push(result);
                }
                Ok(RunOutcome::Panicked { tool, error }) => {
                    trace.push(TraceEvent::ToolError { tool: tool.clone(), error: error.clone() });
                    results.push(ToolResult::failure(&tool, error));
                }
                Err(join_err) => {
                    trace.push(TraceEvent::ToolError {
                        tool: "unknown".to_string(),
                        error: join_err.to_string(),
                    });
                }
            }
        }

        results
    }

    async fn execute_conditional(
        &self,
        plan: &ExecutionPlan,
        context: &ToolContext,
        trace: &mut Vec<TraceEvent>,
    ) -> Vec<ToolResult> {
        let mut results: Vec<ToolResult> = Vec::new();
        let mut ctx = context.clone();

        for (tool, _confidence) in &plan.tools {
            let name = tool.name().to_string();
            let condition = plan.conditions.get(&name).cloned().unwrap_or_default();

            if !Self::check_condition(&condition, &results, &mut ctx) {
                let reason = ctx
                    .skip_reason
                    .take()
                    .unwrap_or_else(|| "condition_not_met".to_string());
                trace.push(TraceEvent::SkipTool { tool: name, reason });
                continue;
            }

            trace.push(TraceEvent::ExecuteTool { tool: name.clone() });
            match Self::run_tool(tool.clone(), ctx.query.clone(), ctx.clone()).await {
                RunOutcome::Result(result) => {
                    if result.success {
                        trace.push(TraceEvent::ToolSuccess {
                            tool: name,
                            citations: result.citations.len(),
                        });
                        ctx.propagate(&result);
                    } else {
                        trace.push(TraceEvent::ToolFailure {
                            tool: name,
                            error: result.error.clone().unwrap_or_default(),
                        });
                    }
                    results.push(result);
                }
                RunOutcome::Panicked { tool, error } => {
                    trace.push(TraceEvent::ToolError { tool: tool.clone(), error: error.clone() });
                    results.push(ToolResult::failure(&tool, error));
                }
            }
        }

        results
    }

    /// All set clauses are combined by logical AND. Predicates observe
    /// the *most recent* prior result, except `requires`, which scans
    /// every prior result for a successful run of the named tool.
    fn check_condition(condition: &Condition, results: &[ToolResult], ctx: &mut ToolContext) -> bool {
        if let Some(requires) = &condition.requires {
            let found = results
                .iter()
                .any(|r| r.success && r.tool_name() == Some(requires.as_str()));
            if !found {
                return false;
            }
        }

        if let Some(min_confidence) = condition.min_confidence {
            if let Some(last) = results.last() {
                if last.confidence() < min_confidence {
                    return false;
                }
            }
        }

        if let Some(max_confidence) = condition.max_confidence {
            if let Some(last) = results.last() {
                let confidence = last.confidence();
                if confidence >= max_confidence {
                    ctx.skip_reason = Some(format!("confidence {confidence:.3} >= {max_confidence}"));
                    return false;
                }
            }
        }

        if let Some(max_citations) = condition.max_citations {
            if let Some(last) = results.last() {
                let count = last.citations.len();
                if count >= max_citations {
                    ctx.skip_reason = Some(format!("citations {count} >= {max_citations}"));
                    return false;
                }
            }
        }

        if let Some(key) = &condition.context_key {
            if !ctx.extra.contains_key(key) {
                return false;
            }
        }

        true
    }

    async fn run_tool(tool: Arc<dyn Tool>, query: String, ctx: ToolContext) -> RunOutcome {
        let name = tool.name().to_string();
        let timeout = tool.default_timeout();
        let handle = tokio::spawn(async move { tool.execute(&query, &ctx).await });

        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(result)) => RunOutcome::Result(result),
            Ok(Err(join_err)) => RunOutcome::Panicked { tool: name, error: join_err.to_string() },
            Err(_elapsed) => RunOutcome::Result(ToolResult::failure(
                &name,
                format!("{name} timed out after {timeout:?}"),
            )),
        }
    }

    /// Merges successful results: `answer` values accumulate into
    /// `answers`; any other repeated key becomes a sequence. Citations
    /// are concatenated, deduped by `(document, page_number)` (first
    /// occurrence wins), and sorted by confidence descending.
    pub fn merge_results(results: &[ToolResult]) -> ToolResult {
        if results.is_empty() {
            return ToolResult::failure("merge", "No results to merge");
        }

        let successes: Vec<&ToolResult> = results.iter().filter(|r| r.success).collect();
        if successes.is_empty() {
            return results[0].clone();
        }

        let mut data = serde_json::Map::new();
        let mut answers = Vec::new();
        let mut tools_used = Vec::new();
        let mut citations: Vec<Citation> = Vec::new();

        for result in &successes {
            if let Some(name) = result.tool_name() {
                tools_used.push(name.to_string());
            }
            citations.extend(result.citations.iter().cloned());

            if let Value::Object(map) = &result.data {
                for (key, value) in map {
                    if key == "answer" {
                        answers.push(value.clone());
                        continue;
                    }
                    match data.get_mut(key) {
                        Some(Value::Array(arr)) => arr.push(value.clone()),
                        Some(existing) => {
                            let prior = existing.clone();
                            *existing = Value::Array(vec![prior, value.clone()]);
                        }
                        None => {
                            data.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
        }

        if !answers.is_empty() {
            data.insert("answers".to_string(), Value::Array(answers));
        }

        let mut seen = std::collections::HashSet::new();
        let mut deduped = Vec::new();
        for citation in citations {
            if seen.insert(citation.dedup_key()) {
                deduped.push(citation);
            }
        }
        deduped.sort_by(|a, b| {
            b.confidence_score
                .partial_cmp(&a.confidence_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut metadata = HashMap::new();
        metadata.insert("tools_used".to_string(), tools_used.join(","));
        metadata.insert("merge_count".to_string(), successes.len().to_string());

        ToolResult {
            success: true,
            data: Value::Object(data),
            error: None,
            metadata,
            citations: deduped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use magray_core::{ExecutionPlan, ToolContext};
    use serde_json::json;

    struct EchoTool {
        name: &'static str,
        success: bool,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "echo"
        }
        fn can_handle(&self, _query: &str, _context: &ToolContext) -> f64 {
            1.0
        }
        async fn execute(&self, _query: &str, _context: &ToolContext) -> ToolResult {
            if self.success {
                ToolResult::success(json!({ "answer": self.name }))
                    .with_metadata("tool", self.name)
                    .with_metadata("confidence", "0.8")
            } else {
                ToolResult::failure(self.name, "boom")
            }
        }
    }

    #[tokio::test]
    async fn sequential_runs_all_tools_in_order_and_traces_each() {
        let engine = ExecutionEngine::new(3);
        let tools: Vec<(Arc<dyn Tool>, f64)> = vec![
            (Arc::new(EchoTool { name: "a", success: true }), 0.9),
            (Arc::new(EchoTool { name: "b", success: true }), 0.8),
        ];
        let plan = ExecutionPlan::new(Strategy::Sequential, tools);
        let context = ToolContext::new("q");
        let (results, trace) = engine.execute(&plan, &context).await;
        assert_eq!(results.len(), 2);
        let execute_events = trace.iter().filter(|e| matches!(e, TraceEvent::ExecuteTool { .. })).count();
        assert_eq!(execute_events, 2);
    }

    #[tokio::test]
    async fn conditional_skips_when_max_confidence_exceeded() {
        let engine = ExecutionEngine::new(3);
        let tools: Vec<(Arc<dyn Tool>, f64)> = vec![
            (Arc::new(EchoTool { name: "semantic_search", success: true }), 0.9),
            (Arc::new(EchoTool { name: "web_search", success: true }), 0.5),
        ];
        let mut conditions = HashMap::new();
        conditions.insert("web_search".to_string(), Condition::max_confidence(0.5));
        let plan = ExecutionPlan::new(Strategy::Conditional, tools).with_conditions(conditions);
        let context = ToolContext::new("q");
        let (results, trace) = engine.execute(&plan, &context).await;

        assert_eq!(results.len(), 1);
        let skip = trace.iter().find_map(|e| match e {
            TraceEvent::SkipTool { tool, reason } if tool == "web_search" => Some(reason.clone()),
            _ => None,
        });
        assert_eq!(skip.as_deref(), Some("confidence 0.800 >= 0.5"));
    }

    #[tokio::test]
    async fn parallel_runs_all_tools_and_bounds_semaphore_size() {
        let engine = ExecutionEngine::new(2);
        let tools: Vec<(Arc<dyn Tool>, f64)> = vec![
            (Arc::new(EchoTool { name: "a", success: true }), 1.0),
            (Arc::new(EchoTool { name: "b", success: true }), 1.0),
            (Arc::new(EchoTool { name: "c", success: false }), 1.0),
        ];
        let plan = ExecutionPlan::new(Strategy::Parallel, tools);
        let context = ToolContext::new("q");
        let (results, _trace) = engine.execute(&plan, &context).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results.iter().filter(|r| r.success).count(), 2);
    }

    #[test]
    fn merge_dedups_citations_and_collects_answers() {
        let mut r1 = ToolResult::success(json!({ "answer": "first" })).with_metadata("tool", "a");
        r1.citations = vec![Citation::new("doc", "x")];
        let mut r2 = ToolResult::success(json!({ "answer": "second" })).with_metadata("tool", "b");
        let mut c2 = Citation::new("doc", "y");
        c2.confidence_score = 0.9;
        r2.citations = vec![Citation::new("doc", "x"), c2];

        let merged = ExecutionEngine::merge_results(&[r1, r2]);
        assert!(merged.success);
        assert_eq!(merged.citations.len(), 1);
        let answers = merged.data["answers"].as_array().unwrap();
        assert_eq!(answers.len(), 2);
        assert_eq!(merged.metadata.get("tools_used").unwrap(), "a,b");
    }

    #[test]
    fn merge_with_no_results_fails() {
        let merged = ExecutionEngine::merge_results(&[]);
        assert!(!merged.success);
    }
}
