use crate::context::ToolContext;
use crate::tool_result::ToolResult;
use async_trait::async_trait;
use std::time::Duration;

/// A self-contained component satisfying the `{name, description,
/// can_handle, execute}` contract. Tools perform concrete work
/// (retrieval, calculation, summarization, ...) on behalf of the
/// orchestrator and are otherwise opaque to it.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Pure suitability score in `[0, 1]`. Must not perform I/O beyond
    /// read-only inspection of `context` — the registry calls this for
    /// every candidate tool on every query.
    fn can_handle(&self, query: &str, context: &ToolContext) -> f64;

    /// May perform I/O. Must never panic across this boundary in a way
    /// the caller doesn't catch — the execution engine wraps calls so a
    /// panic still produces a failed `ToolResult`, but well-behaved tools
    /// return `ToolResult::failure` directly instead of relying on that
    /// safety net.
    async fn execute(&self, query: &str, context: &ToolContext) -> ToolResult;

    /// Per-tool timeout the execution engine enforces around `execute`.
    fn default_timeout(&self) -> Duration {
        Duration::from_secs(15)
    }
}
