pub mod config_base;
pub mod errors;
pub mod structured_logging;

pub use config_base::OrchestratorConfig;
pub use errors::{OrchestrationError, OrchestrationResult};
pub use structured_logging::{
    init_structured_logging, init_structured_logging_with_config, ExecutionContext,
    LoggingConfig, OperationTimer, PerformanceMetrics, RequestContext, StructuredLogEntry,
};
