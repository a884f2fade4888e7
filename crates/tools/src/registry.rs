use magray_core::{Tool, ToolContext};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

/// Name-keyed collection of tools, read-only once query processing
/// starts — registration happens only at startup.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool, overwriting (with a warning) any prior tool of
    /// the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            warn!(tool = %name, "overwriting previously registered tool");
        } else {
            self.order.push(name.clone());
        }
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Stable registration order.
    pub fn get_all(&self) -> Vec<Arc<dyn Tool>> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name).cloned())
            .collect()
    }

    /// `(tool, confidence)` pairs with `confidence >= min_confidence`,
    /// sorted descending (stable on ties). A `can_handle` panic is
    /// caught and scored 0 rather than excluding the tool.
    pub fn get_suitable_tools(
        &self,
        query: &str,
        context: &ToolContext,
        min_confidence: f64,
    ) -> Vec<(Arc<dyn Tool>, f64)> {
        let mut scored: Vec<(Arc<dyn Tool>, f64)> = self
            .get_all()
            .into_iter()
            .map(|tool| {
                let confidence = Self::safe_can_handle(tool.as_ref(), query, context);
                (tool, confidence)
            })
            .filter(|(_, confidence)| *confidence >= min_confidence)
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal)
        });
        scored
    }

    /// Preserves input order; missing names are skipped with a warning.
    pub fn get_tools_by_name(
        &self,
        names: &[String],
        default_confidence: f64,
    ) -> Vec<(Arc<dyn Tool>, f64)> {
        names
            .iter()
            .filter_map(|name| match self.get(name) {
                Some(tool) => Some((tool, default_confidence)),
                None => {
                    warn!(tool = %name, "tool not found in registry, skipping");
                    None
                }
            })
            .collect()
    }

    pub fn get_descriptions(&self) -> HashMap<String, String> {
        self.get_all()
            .into_iter()
            .map(|t| (t.name().to_string(), t.description().to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    fn safe_can_handle(tool: &dyn Tool, query: &str, context: &ToolContext) -> f64 {
        panic::catch_unwind(AssertUnwindSafe(|| tool.can_handle(query, context))).unwrap_or_else(
            |_| {
                warn!(tool = tool.name(), "can_handle panicked, scoring 0");
                0.0
            },
        )
    }
}
