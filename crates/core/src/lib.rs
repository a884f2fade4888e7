//! Shared data model and collaborator contracts for the agentic
//! orchestration core.
//!
//! Every other crate in the workspace (`tools`, `analyzer`,
//! `orchestrator`) depends on this one and none of its types. Keeping the
//! data model and trait contracts in a single leaf crate is what lets the
//! orchestrator, the tool registry, and the query analyzer evolve
//! independently while agreeing on one vocabulary.

pub mod citation;
pub mod collaborators;
pub mod condition;
pub mod context;
pub mod plan;
pub mod query_analysis;
pub mod response;
pub mod tool;
pub mod tool_result;
pub mod trace;

pub use citation::Citation;
pub use collaborators::{
    AnswerChain, ChainAnswer, EmbeddingModel, LanguageModelHandler, RetrievedChunk, Retriever,
};
pub use condition::Condition;
pub use context::ToolContext;
pub use plan::{ExecutionPlan, Strategy};
pub use query_analysis::{Analysis, Complexity, Intent, KeywordCategory};
pub use response::AgenticResponse;
pub use tool::Tool;
pub use tool_result::ToolResult;
pub use trace::TraceEvent;

pub use anyhow::{Error, Result};
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use serde_json::Value;
