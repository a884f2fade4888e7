use thiserror::Error;

/// Crate-wide error taxonomy for the orchestration core.
///
/// Tool-level failures are never constructed from this enum at the `Tool`
/// boundary — they are captured into `ToolResult.error` instead. This type
/// covers failures in the orchestrator/engine/registry plumbing itself.
#[derive(Error, Debug)]
pub enum OrchestrationError {
    #[error("precondition missing: {0}")]
    PreconditionMissing(String),

    #[error("external service error calling {service}: {message}")]
    ExternalService { service: String, message: String },

    #[error("failed to parse {what}: {message}")]
    ParseSemantic { what: String, message: String },

    #[error("empty result: {0}")]
    EmptyResult(String),

    #[error("unexpected error: {0}")]
    Unexpected(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl OrchestrationError {
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::PreconditionMissing(msg.into())
    }

    pub fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn parse(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseSemantic {
            what: what.into(),
            message: message.into(),
        }
    }

    /// Error code used in structured log records and metrics labels.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::PreconditionMissing(_) => "PRECONDITION_MISSING",
            Self::ExternalService { .. } => "EXTERNAL_SERVICE",
            Self::ParseSemantic { .. } => "PARSE_SEMANTIC",
            Self::EmptyResult(_) => "EMPTY_RESULT",
            Self::Unexpected(_) => "UNEXPECTED",
            Self::Configuration(_) => "CONFIGURATION",
        }
    }
}

pub type OrchestrationResult<T> = Result<T, OrchestrationError>;
