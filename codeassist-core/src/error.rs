//! Error types for codeassist operations
//!
//! Every failure in the request path is scoped to the current request. The
//! caches translate collaborator failures into these variants at their own
//! boundary so callers only ever match on a closed set of kinds.

use thiserror::Error;

/// Main error type for the request path
///
/// `Clone` is required because a single failed construction is observed by
/// every caller that was waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssistError {
    /// Building the store or model handle failed
    #[error("Construction failure: {0}")]
    ConstructionFailure(String),

    /// The document store could not answer a similarity search
    #[error("Retrieval failure: {0}")]
    RetrievalFailure(String),

    /// The generation model failed to produce text
    #[error("Generation failure: {0}")]
    GenerationFailure(String),

    /// Accelerator diagnostics could not be read
    #[error("Resource query failure: {0}")]
    ResourceQueryFailure(String),

    /// The request was rejected before any step ran
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

impl AssistError {
    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            AssistError::ConstructionFailure(_) => "construction_failure",
            AssistError::RetrievalFailure(_) => "retrieval_failure",
            AssistError::GenerationFailure(_) => "generation_failure",
            AssistError::ResourceQueryFailure(_) => "resource_query_failure",
            AssistError::InvalidRequest(_) => "invalid_request",
            AssistError::ConfigError(_) => "config_error",
            AssistError::Other(_) => "other",
        }
    }
}

/// Result type alias for codeassist operations
pub type Result<T> = std::result::Result<T, AssistError>;

impl From<String> for AssistError {
    fn from(s: String) -> Self {
        AssistError::Other(s)
    }
}

impl From<&str> for AssistError {
    fn from(s: &str) -> Self {
        AssistError::Other(s.to_string())
    }
}
