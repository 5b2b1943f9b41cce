//! # agent-core
//!
//! Provider-agnostic Thought → Action → Observation agent with a guarded
//! tool system.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                             Agent                                │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────────────────────┐  │
//! │  │  Reasoning  │  │   Parser    │  │   LlmProvider            │  │
//! │  │    Loop     │──│             │  │   (Strategy)             │  │
//! │  └──────┬──────┘  └─────────────┘  └──────────────────────────┘  │
//! │         │                                                        │
//! │  ┌──────┴──────┐  ┌─────────────┐  ┌──────────────────────────┐  │
//! │  │ Dispatcher  │──│  Registry   │  │   GuardFilter            │  │
//! │  │             │  │ local/remote│  │   → SecuritySink         │  │
//! │  └──────┬──────┘  └─────────────┘  └──────────────────────────┘  │
//! │         │ ToolSession (one per run)                              │
//! └─────────┼────────────────────────────────────────────────────────┘
//!           ▼
//!      tool server
//! ```
//!
//! The `LlmProvider` trait lets the loop run against Ollama, a hosted
//! chat-completions endpoint or a test double without changes.

pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod guard;
pub mod message;
pub mod parser;
pub mod provider;
pub mod reasoning;
pub mod security_log;
pub mod tool;

#[cfg(test)]
mod testing;

pub use envelope::{Envelope, normalize};
pub use error::{AgentError, Result, ToolError};
pub use guard::{GuardFilter, GuardVerdict, PatternDetector, REFUSAL_MESSAGE};
pub use message::{Conversation, Message, Role};
pub use parser::{Action, Decision, ParseFailure};
pub use provider::{GenerationOptions, LlmProvider};
pub use reasoning::{Agent, AgentBuilder, AgentConfig, RunOutcome, RunReport, StepRecord};
pub use security_log::{FileSink, SecurityEvent, SecurityLogEntry, SecuritySink};
pub use tool::{
    Capability, LocalTool, ParameterSchema, ToolCall, ToolRegistry, ToolSchema, ToolSession,
    ToolSessionFactory,
};
