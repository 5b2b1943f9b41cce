//! The `run_agent` entry point shared by both front ends.

use std::io::ErrorKind;
use std::sync::Arc;

use agent_core::{
    Agent, AgentBuilder, FileSink, GuardFilter, RunReport,
    error::AgentError,
};
use agent_runtime::{McpServerConfig, McpSessionFactory, select_provider};
use office_tools::{
    DocumentIndex, OFFICE_AGENT_GUIDELINES, OFFICE_AGENT_PROMPT, OfficeError, office_registry,
};

use crate::config::AppConfig;

/// Office agent wired to its model, tools and security log
pub struct OfficeAgent {
    agent: Agent,
    max_steps: usize,
}

impl OfficeAgent {
    pub fn new(agent: Agent, max_steps: usize) -> Self {
        Self { agent, max_steps }
    }

    /// Build everything from the process environment.
    pub fn from_env(config: &AppConfig) -> anyhow::Result<Self> {
        let selected = select_provider()?;
        let index = load_index(config)?;
        let sink = Arc::new(FileSink::new(&config.security_log_path));

        let agent = AgentBuilder::new()
            .provider(selected.provider)
            .model(selected.model)
            .tools(office_registry(Arc::new(index), config.top_k))
            .tool_sessions(Arc::new(McpSessionFactory::new(McpServerConfig::from_env())))
            .guard(GuardFilter::new(sink))
            .system_prompt(OFFICE_AGENT_PROMPT)
            .guidelines(OFFICE_AGENT_GUIDELINES)
            .max_steps(config.max_steps)
            .build()?;

        Ok(Self::new(agent, config.max_steps))
    }

    pub fn default_max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn inner(&self) -> &Agent {
        &self.agent
    }

    /// Final text for `prompt`. Failures come back as a readable sentence.
    pub async fn run_agent(&self, prompt: &str, max_steps: Option<usize>) -> String {
        match self.run_report(prompt, max_steps).await {
            Ok(report) => report.answer,
            Err(e) => e.user_message(),
        }
    }

    pub async fn run_report(
        &self,
        prompt: &str,
        max_steps: Option<usize>,
    ) -> Result<RunReport, AgentError> {
        self.agent
            .run_report(prompt, max_steps.unwrap_or(self.max_steps))
            .await
    }
}

/// A missing index file leaves search empty instead of stopping startup
fn load_index(config: &AppConfig) -> anyhow::Result<DocumentIndex> {
    match DocumentIndex::load(&config.index_path) {
        Ok(index) => Ok(index),
        Err(OfficeError::IndexUnreadable { path, source }) if source.kind() == ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "Office index not found; search_offices will find nothing");
            Ok(DocumentIndex::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Blocking front for callers without a runtime
pub struct BlockingRunner {
    runtime: tokio::runtime::Runtime,
    agent: OfficeAgent,
}

impl BlockingRunner {
    pub fn new(agent: OfficeAgent) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        Ok(Self { runtime, agent })
    }

    pub fn run_agent(&self, prompt: &str, max_steps: Option<usize>) -> String {
        self.runtime.block_on(self.agent.run_agent(prompt, max_steps))
    }

    pub fn agent(&self) -> &OfficeAgent {
        &self.agent
    }
}
