//! Test doubles for the loop's collaborators.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::envelope::Envelope;
use crate::error::{AgentError, Result, ToolError};
use crate::message::Message;
use crate::provider::{Completion, GenerationOptions, LlmProvider};
use crate::tool::{LocalTool, ParameterSchema, ToolSchema, ToolSession, ToolSessionFactory};

/// Replays queued replies and records every history it was sent.
#[derive(Default)]
pub struct MockProvider {
    replies: Mutex<VecDeque<Result<String>>>,
    repeat: Option<String>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            ..Default::default()
        }
    }

    /// Answers every call with the same reply
    pub fn repeating(reply: impl Into<String>) -> Self {
        Self {
            repeat: Some(reply.into()),
            ..Default::default()
        }
    }

    pub fn failing(error: AgentError) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Err(error)])),
            ..Default::default()
        }
    }

    pub fn recorded_calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(&self, messages: &[Message], options: &GenerationOptions) -> Result<Completion> {
        self.calls.lock().unwrap().push(messages.to_vec());

        let next = self.replies.lock().unwrap().pop_front();
        let content = match (next, &self.repeat) {
            (Some(reply), _) => reply?,
            (None, Some(repeat)) => repeat.clone(),
            (None, None) => return Err(AgentError::ProviderUnavailable("mock exhausted".into())),
        };

        Ok(Completion {
            content,
            model: options.model.clone(),
            usage: None,
            finish_reason: None,
        })
    }
}

type Script = Arc<Mutex<VecDeque<std::result::Result<Envelope, ToolError>>>>;
type CallLog = Arc<Mutex<Vec<(String, Map<String, Value>)>>>;

/// Session that replays scripted envelopes
pub struct FakeSession {
    script: Script,
    calls: CallLog,
    closes: Arc<AtomicUsize>,
}

impl FakeSession {
    pub fn new(script: Vec<std::result::Result<Envelope, ToolError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            calls: Arc::default(),
            closes: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolSession for FakeSession {
    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> std::result::Result<Envelope, ToolError> {
        self.calls.lock().unwrap().push((name.to_string(), arguments));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ToolError::Transport("no scripted response".into())))
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out [`FakeSession`]s sharing one script, counting opens and closes
pub struct FakeSessionFactory {
    script: Script,
    calls: CallLog,
    opens: AtomicUsize,
    closes: Arc<AtomicUsize>,
    fail_open: bool,
}

impl FakeSessionFactory {
    pub fn new(script: Vec<std::result::Result<Envelope, ToolError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            calls: Arc::default(),
            opens: AtomicUsize::new(0),
            closes: Arc::default(),
            fail_open: false,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            fail_open: true,
            ..Self::new(vec![])
        }
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolSessionFactory for FakeSessionFactory {
    async fn open(&self) -> Result<Box<dyn ToolSession>> {
        if self.fail_open {
            return Err(AgentError::ToolSession("spawn failed".into()));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            script: self.script.clone(),
            calls: self.calls.clone(),
            closes: self.closes.clone(),
        }))
    }
}

/// Local search over two canned office chunks
pub struct CannedSearch;

impl LocalTool for CannedSearch {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "search_offices".into(),
            description: "Search the office database".into(),
            parameters: vec![ParameterSchema::required("query", "string", "What to look for")],
            returns: None,
        }
    }

    fn call(&self, arguments: &Map<String, Value>) -> std::result::Result<Value, ToolError> {
        let query = arguments
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if query.contains("HQ") {
            Ok(Value::String("HQ: 100 Main Street, New York. 1,200 employees.".into()))
        } else {
            Ok(Value::String("No matching office information found.".into()))
        }
    }
}

pub fn search_tool() -> CannedSearch {
    CannedSearch
}

pub fn weather_tools() -> Vec<ToolSchema> {
    vec![
        ToolSchema {
            name: "geocode_location".into(),
            description: "Coordinates for a place".into(),
            parameters: vec![ParameterSchema::required("name", "string", "Place name")],
            returns: None,
        },
        ToolSchema {
            name: "get_weather".into(),
            description: "Current weather".into(),
            parameters: vec![
                ParameterSchema::required("lat", "number", "Latitude"),
                ParameterSchema::required("lon", "number", "Longitude"),
            ],
            returns: None,
        },
        ToolSchema {
            name: "convert_c_to_f".into(),
            description: "Celsius to Fahrenheit".into(),
            parameters: vec![ParameterSchema::required("c", "number", "Degrees Celsius")],
            returns: None,
        },
    ]
}
