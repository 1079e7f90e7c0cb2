//! Error types for Tutor.
//!
//! A single error enum covers configuration, I/O, provider, prompt and
//! pipeline failures. The three `*Unavailable` variants form the answer
//! pipeline's taxonomy: retrieval and model failures are fatal to a request,
//! external search failures are recovered by the synthesizer.

use thiserror::Error;

/// Unified error type for Tutor.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors outside a pipeline run (client construction, bad responses)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Knowledge base, embedding and index errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The vector index could not serve a similarity search.
    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// The web search provider failed, timed out or has no credentials.
    #[error("External search unavailable: {0}")]
    ExternalSearchUnavailable(String),

    /// The language model call failed.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error must abort an answer request.
    ///
    /// External search is the only best-effort stage of the pipeline.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AppError::ExternalSearchUnavailable(_))
    }

    /// Process exit code used by the CLI.
    ///
    /// Retrieval and model outages map to `EX_UNAVAILABLE` (69) and
    /// configuration problems to `EX_CONFIG` (78). Everything else,
    /// including a search failure that escaped degradation, is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::RetrievalUnavailable(_) | AppError::ModelUnavailable(_) => 69,
            AppError::Config(_) => 78,
            _ => 1,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
