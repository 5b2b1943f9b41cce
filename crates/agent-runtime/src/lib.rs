//! # agent-runtime
//!
//! Concrete collaborators for the agent loop.
//!
//! ## Providers
//!
//! - **Ollama** (default): Local LLM inference via Ollama
//! - **Hugging Face Inference**: hosted chat completions, chosen when `HF_TOKEN` is set
//!
//! ## Tool server
//!
//! - **MCP over stdio** (`mcp` feature): one child process per run
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::{select_provider, McpServerConfig, McpSessionFactory};
//!
//! let selected = select_provider()?;
//! let agent = AgentBuilder::new()
//!     .provider(selected.provider)
//!     .model(selected.model)
//!     .tool_sessions(Arc::new(McpSessionFactory::new(McpServerConfig::from_env())))
//!     .build()?;
//! ```

pub mod huggingface;
pub mod select;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "mcp")]
pub mod mcp;

pub use huggingface::{HuggingFaceConfig, HuggingFaceProvider};
pub use select::{ProviderChoice, SelectedProvider, select_provider, select_provider_with};

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};

#[cfg(feature = "mcp")]
pub use mcp::{McpServerConfig, McpSession, McpSessionFactory};

/// Reads one configuration variable
pub type Lookup<'a> = dyn Fn(&str) -> Option<String> + 'a;

/// [`Lookup`] over the process environment
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
