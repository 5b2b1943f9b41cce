//! Tool server sessions over MCP (stdio transport).
//!
//! Each run spawns the tool server as a child process, performs the MCP
//! handshake, and cancels the service when the run ends.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use agent_core::{
    envelope::Envelope,
    error::{AgentError, Result, ToolError},
    tool::{ToolSession, ToolSessionFactory},
};
use async_trait::async_trait;
use rmcp::model::{CallToolRequestParams, Content, RawContent};
use rmcp::service::{RoleClient, RunningService};
use rmcp::transport::{ConfigureCommandExt, TokioChildProcess};
use rmcp::ServiceExt;
use serde_json::{Map, Value};
use tokio::process::Command;
use tokio::sync::RwLock;

use crate::Lookup;

type McpService = RunningService<RoleClient, ()>;

/// How to start the tool server
#[derive(Clone, Debug)]
pub struct McpServerConfig {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub call_timeout: Duration,
}

impl Default for McpServerConfig {
    fn default() -> Self {
        Self {
            command: "python3".into(),
            args: vec!["mcp_stdio_wrapper.py".into()],
            env: HashMap::new(),
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl McpServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(&crate::process_env)
    }

    pub fn from_lookup(lookup: &Lookup<'_>) -> Self {
        let defaults = Self::default();
        Self {
            command: lookup("MCP_SERVER_COMMAND")
                .filter(|c| !c.trim().is_empty())
                .unwrap_or(defaults.command),
            args: lookup("MCP_SERVER_ARGS")
                .map(|a| a.split_whitespace().map(String::from).collect())
                .unwrap_or(defaults.args),
            env: defaults.env,
            call_timeout: lookup("MCP_CALL_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .map_or(defaults.call_timeout, Duration::from_secs),
        }
    }
}

/// Spawns a fresh tool server session for every run
pub struct McpSessionFactory {
    config: McpServerConfig,
}

impl McpSessionFactory {
    pub fn new(config: McpServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &McpServerConfig {
        &self.config
    }
}

#[async_trait]
impl ToolSessionFactory for McpSessionFactory {
    async fn open(&self) -> Result<Box<dyn ToolSession>> {
        let session = McpSession::connect_stdio(&self.config).await?;
        Ok(Box::new(session))
    }
}

/// One live MCP client connection
pub struct McpSession {
    command: String,
    service: Arc<RwLock<Option<McpService>>>,
    call_timeout: Duration,
}

impl McpSession {
    pub async fn connect_stdio(config: &McpServerConfig) -> Result<Self> {
        let transport = TokioChildProcess::new(Command::new(&config.command).configure(|cmd| {
            cmd.args(&config.args);
            cmd.envs(config.env.iter());
        }))
        .map_err(|e| AgentError::ToolSession(format!("failed to spawn '{}': {e}", config.command)))?;

        let service = ().serve(transport).await.map_err(|e| {
            AgentError::ToolSession(format!(
                "failed to connect MCP server '{}' over stdio: {e}",
                config.command
            ))
        })?;
        tracing::debug!(command = %config.command, "Tool server session opened");

        Ok(Self {
            command: config.command.clone(),
            service: Arc::new(RwLock::new(Some(service))),
            call_timeout: config.call_timeout,
        })
    }
}

#[async_trait]
impl ToolSession for McpSession {
    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> std::result::Result<Envelope, ToolError> {
        let request = CallToolRequestParams {
            meta: None,
            name: name.to_string().into(),
            arguments: Some(arguments),
            task: None,
        };

        let guard = self.service.read().await;
        let service = guard
            .as_ref()
            .ok_or_else(|| ToolError::Transport("tool server session is closed".into()))?;

        let result = tokio::time::timeout(self.call_timeout, service.call_tool(request))
            .await
            .map_err(|_| {
                ToolError::Transport(format!(
                    "tool '{name}' timed out after {}s",
                    self.call_timeout.as_secs()
                ))
            })?
            .map_err(|e| ToolError::Transport(format!("tool '{name}' call failed: {e}")))?;

        into_envelope(
            &result.content,
            result.structured_content,
            result.is_error.unwrap_or(false),
        )
    }

    async fn close(&self) -> Result<()> {
        let service = self.service.write().await.take();
        if let Some(service) = service {
            service.cancel().await.map_err(|e| {
                AgentError::ToolSession(format!("failed to shut down '{}': {e}", self.command))
            })?;
            tracing::debug!(command = %self.command, "Tool server session closed");
        }
        Ok(())
    }
}

/// Map a tool result onto the envelope variants.
///
/// A declared error becomes [`ToolError::Declined`] with the text content.
/// Structured content wins over the content list when present.
pub fn into_envelope(
    content: &[Content],
    structured: Option<Value>,
    is_error: bool,
) -> std::result::Result<Envelope, ToolError> {
    if is_error {
        let text = content
            .iter()
            .filter_map(|c| match &c.raw {
                RawContent::Text(t) => Some(t.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        let reason = if text.is_empty() {
            "tool reported an error".to_string()
        } else {
            text
        };
        return Err(ToolError::Declined(reason));
    }

    if let Some(structured) = structured.filter(|v| !is_empty(v)) {
        return Ok(Envelope::structured(Envelope::Plain(structured)));
    }

    Ok(Envelope::List(content.iter().map(content_envelope).collect()))
}

fn content_envelope(content: &Content) -> Envelope {
    match &content.raw {
        RawContent::Text(t) => Envelope::Text(t.text.clone()),
        other => Envelope::Plain(serde_json::to_value(other).unwrap_or(Value::Null)),
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
