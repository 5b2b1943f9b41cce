//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors that end a run or prevent one from starting.
///
/// Per-call tool failures are not here: they are fed back to the model as
/// observations (see [`ToolError`]).
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Remote tool session could not be opened or closed
    #[error("Tool session error: {0}")]
    ToolSession(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Whether the caller may retry the whole run
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgentError::ProviderUnavailable(_)
                | AgentError::RateLimited(_)
                | AgentError::Io(_)
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Provider(msg) => format!("The AI service encountered an error: {}", msg),
            AgentError::ProviderUnavailable(_) => "The AI service is currently unavailable. Please try again.".into(),
            AgentError::ToolSession(_) => "The tool server could not be reached. Please try again.".into(),
            AgentError::Config(msg) => format!("The agent is misconfigured: {}", msg),
            AgentError::RateLimited(_) => "You've made too many requests. Please wait a moment.".into(),
            AgentError::Auth(_) => "Authentication failed. Please check your credentials.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Other(err.to_string())
    }
}

/// A single tool call that did not produce a value.
///
/// The dispatcher reports these; the loop turns them into `Error: ...`
/// observations so the model can adapt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// No capability registered under this action name
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// The remote tool server declined to execute the call
    #[error("{0}")]
    Declined(String),

    /// The session to the tool server failed mid-call
    #[error("{0}")]
    Transport(String),

    /// Arguments did not satisfy the tool's schema
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// A local capability failed
    #[error("{0}")]
    Execution(String),
}

impl ToolError {
    /// Observation text fed back to the model
    pub fn observation(&self) -> String {
        format!("Error: {}", self)
    }
}
