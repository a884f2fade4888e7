//! Agentic orchestration core: analyzes a query, selects and runs tools
//! under one of three execution strategies, enhances the citations they
//! return, and synthesizes a final cited answer with a full reasoning
//! trace.
//!
//! # Architecture
//!
//! - [`Orchestrator`]: top-level entry point — query analysis, tool
//!   selection, plan construction, response synthesis.
//! - [`ExecutionEngine`]: runs an [`ExecutionPlan`](magray_core::ExecutionPlan)
//!   under the Sequential, Parallel, or Conditional strategy and merges
//!   the resulting [`ToolResult`](magray_core::ToolResult)s.
//! - [`CitationEnhancer`]: excerpts, fuses confidence, re-ranks, and
//!   deduplicates the citations a tool attaches to its result.

pub mod citation_enhancer;
pub mod execution_engine;
pub mod orchestrator;

pub use citation_enhancer::CitationEnhancer;
pub use execution_engine::ExecutionEngine;
pub use orchestrator::Orchestrator;
