//! Tool System
//!
//! Tools are either local (an in-process call) or remote (a call through the
//! run's session to the tool server). The registry is filled at startup and
//! is read-only while runs are executing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::envelope::Envelope;
use crate::error::{Result, ToolError};

/// Tool call request from the LLM
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, number, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,
}

impl ParameterSchema {
    pub fn required(name: &str, param_type: &str, description: &str) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: true,
        }
    }
}

/// Tool definition schema (shown to the LLM in the system prompt)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,

    /// What a successful call returns, for the catalogue
    #[serde(default)]
    pub returns: Option<String>,
}

impl ToolSchema {
    /// Check that every required parameter is present
    pub fn validate(&self, arguments: &Map<String, Value>) -> std::result::Result<(), ToolError> {
        for param in &self.parameters {
            if param.required && !arguments.contains_key(&param.name) {
                return Err(ToolError::InvalidArguments(format!(
                    "missing required parameter '{}' for {}",
                    param.name, self.name
                )));
            }
        }
        Ok(())
    }

    /// `name(arg1, arg2)` as used in the prompt
    pub fn signature(&self) -> String {
        let params: Vec<&str> = self.parameters.iter().map(|p| p.name.as_str()).collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

/// An in-process capability.
///
/// Local calls are synchronous and never suspend the run.
pub trait LocalTool: Send + Sync {
    /// Get the tool's schema for the catalogue
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with given arguments
    fn call(&self, arguments: &Map<String, Value>) -> std::result::Result<Value, ToolError>;
}

/// A live connection to the tool server, scoped to one run.
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// Invoke a remote tool and return its raw envelope
    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> std::result::Result<Envelope, ToolError>;

    /// Release the session; later calls fail with a transport error
    async fn close(&self) -> Result<()>;
}

/// Opens one [`ToolSession`] per run
#[async_trait]
pub trait ToolSessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn ToolSession>>;
}

/// How an action is executed
#[derive(Clone)]
pub enum Capability {
    /// Direct in-process call
    Local(Arc<dyn LocalTool>),
    /// Forwarded through the run's [`ToolSession`]
    Remote,
}

impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Local(_) => f.write_str("Local"),
            Capability::Remote => f.write_str("Remote"),
        }
    }
}

struct Entry {
    schema: ToolSchema,
    capability: Capability,
}

/// Registry for available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Entry>,
    /// Registration order, so the catalogue is stable
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a local tool
    pub fn register_local<T: LocalTool + 'static>(&mut self, tool: T) {
        self.register_local_arc(Arc::new(tool));
    }

    /// Register a shared local tool
    pub fn register_local_arc(&mut self, tool: Arc<dyn LocalTool>) {
        let schema = tool.schema();
        self.insert(schema, Capability::Local(tool));
    }

    /// Register a tool served by the remote tool server
    pub fn register_remote(&mut self, schema: ToolSchema) {
        self.insert(schema, Capability::Remote);
    }

    fn insert(&mut self, schema: ToolSchema, capability: Capability) {
        let name = schema.name.clone();
        if self.tools.insert(name.clone(), Entry { schema, capability }).is_some() {
            tracing::warn!(tool = %name, "Tool registered twice; keeping the latest");
        } else {
            self.order.push(name);
        }
    }

    /// Get a tool's capability by name
    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.tools.get(name).map(|e| &e.capability)
    }

    /// Get a tool's schema by name
    pub fn schema(&self, name: &str) -> Option<&ToolSchema> {
        self.tools.get(name).map(|e| &e.schema)
    }

    /// All tool schemas in registration order
    pub fn schemas(&self) -> Vec<&ToolSchema> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|e| &e.schema)
            .collect()
    }

    /// Get tool names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Whether any action needs the remote session
    pub fn has_remote(&self) -> bool {
        self.tools
            .values()
            .any(|e| matches!(e.capability, Capability::Remote))
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Generate system prompt section describing available tools
    pub fn generate_prompt_section(&self) -> String {
        let mut prompt = String::from("You have these tools:\n\n");

        for (i, schema) in self.schemas().into_iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, schema.signature()));
            prompt.push_str(&format!("   {}\n", schema.description));

            for param in &schema.parameters {
                let required = if param.required { ", required" } else { "" };
                prompt.push_str(&format!(
                    "   - {} ({}{}): {}\n",
                    param.name, param.param_type, required, param.description
                ));
            }
            if let Some(returns) = &schema.returns {
                prompt.push_str(&format!("   Returns: {}\n", returns));
            }
            prompt.push('\n');
        }

        prompt
    }
}
