use crate::condition::Condition;
use crate::tool::Tool;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    Sequential,
    Parallel,
    Conditional,
}

/// The output of plan construction: which tools to run, in what
/// arrangement, and under what gating.
#[derive(Clone)]
pub struct ExecutionPlan {
    pub strategy: Strategy,
    pub tools: Vec<(Arc<dyn Tool>, f64)>,
    pub conditions: HashMap<String, Condition>,
}

impl ExecutionPlan {
    pub fn new(strategy: Strategy, tools: Vec<(Arc<dyn Tool>, f64)>) -> Self {
        Self {
            strategy,
            tools,
            conditions: HashMap::new(),
        }
    }

    pub fn with_conditions(mut self, conditions: HashMap<String, Condition>) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|(t, _)| t.name().to_string()).collect()
    }
}
