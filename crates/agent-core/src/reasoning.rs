//! Reasoning Loop
//!
//! Thought → Action → Observation control loop.
//!
//! Each step sends the whole history to the model, parses the reply, runs
//! the chosen tool and appends the reply plus an `Observation:` turn. The
//! run suspends only on the model call and the tool call, and steps never
//! overlap. Every exit path closes the run's tool session.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::dispatch::Dispatcher;
use crate::error::{AgentError, Result};
use crate::guard::GuardFilter;
use crate::message::Conversation;
use crate::parser::{self, Action, Decision};
use crate::provider::{GenerationOptions, LlmProvider};
use crate::tool::{ToolCall, ToolRegistry, ToolSession, ToolSessionFactory};

/// Returned when the step budget runs out
pub const MAX_STEPS_MESSAGE: &str = "Reached maximum steps without completing.";

/// Returned when the model finishes without saying anything usable
pub const COMPLETED_MESSAGE: &str = "Task complete.";

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful agent. You answer questions by calling tools \
and reading their observations.";

/// Response format and completion protocol, appended after the tool catalogue
const RESPONSE_FORMAT: &str = r#"Respond in exactly this format, one action per reply:

Thought: <your reasoning>
Action: <tool name>
Args: <JSON object with the tool arguments>

After each action you will receive:
Observation: <tool result>

When you have gathered all the information, respond with:
Thought: I have all the information needed
Answer: <the complete answer for the user>
Action: DONE
Args: {}"#;

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Opening of the system prompt (role and purpose)
    pub system_prompt: String,

    /// Examples and rules placed after the response format
    pub guidelines: Option<String>,

    /// Step budget used when the caller does not pass one
    pub max_steps: usize,

    /// Generation options
    pub generation: GenerationOptions,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            guidelines: None,
            max_steps: 10,
            generation: GenerationOptions::default(),
        }
    }
}

/// How a run ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The model sent the terminal action
    Done,
    /// The step budget ran out
    MaxStepsReached,
    /// The prompt was refused by the guard
    Refused,
    /// A reply could not be parsed
    ParseFailed,
}

/// One executed step
#[derive(Clone, Debug, Serialize)]
pub struct StepRecord {
    pub step: usize,
    pub action: String,
    /// Observation text exactly as the model saw it
    pub observation: String,
}

/// Everything a run produced
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub outcome: RunOutcome,
    /// Final text, already output-checked
    pub answer: String,
    pub steps: Vec<StepRecord>,
}

enum LoopState {
    AwaitingModel { step: usize },
    AwaitingParse { step: usize, reply: String },
    AwaitingTool { step: usize, reply: String, call: ToolCall },
    Done(String),
    MaxStepsReached,
    Aborted(String),
}

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    sessions: Option<Arc<dyn ToolSessionFactory>>,
    guard: GuardFilter,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        sessions: Option<Arc<dyn ToolSessionFactory>>,
        guard: GuardFilter,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            sessions,
            guard,
            config,
        }
    }

    /// Build the full system prompt including tool descriptions
    pub fn build_system_prompt(&self) -> String {
        let mut prompt = self.config.system_prompt.trim_end().to_string();
        prompt.push_str("\n\n");
        prompt.push_str(&self.tools.generate_prompt_section());
        prompt.push_str(RESPONSE_FORMAT);

        if let Some(guidelines) = &self.config.guidelines {
            prompt.push_str("\n\n");
            prompt.push_str(guidelines.trim());
        }

        prompt
    }

    /// Run the loop and return the final text.
    ///
    /// Only a model or session transport failure is an `Err`.
    pub async fn run(&self, prompt: &str, max_steps: usize) -> Result<String> {
        Ok(self.run_report(prompt, max_steps).await?.answer)
    }

    /// Run the loop and return the final text with the step trace.
    pub async fn run_report(&self, prompt: &str, max_steps: usize) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", %run_id, provider = self.provider.name());
        self.run_inner(run_id, prompt, max_steps).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, prompt: &str, max_steps: usize) -> Result<RunReport> {
        let verdict = self.guard.check_input(prompt);
        if !verdict.clean {
            tracing::info!("Prompt refused");
            return Ok(RunReport {
                run_id,
                outcome: RunOutcome::Refused,
                answer: self.guard.check_output(&verdict.text),
                steps: Vec::new(),
            });
        }

        let mut conversation = Conversation::seed(self.build_system_prompt(), verdict.text);
        let mut steps = Vec::new();

        let session = self.open_session().await?;
        let result = self
            .drive(&mut conversation, session.as_deref(), max_steps, &mut steps)
            .await;

        if let Some(session) = session {
            if let Err(e) = session.close().await {
                tracing::warn!(error = %e, "Failed to close tool session");
            }
        }

        let (outcome, text) = result.inspect_err(|e| tracing::error!(error = %e, "Run failed"))?;
        tracing::info!(?outcome, steps = steps.len(), "Run finished");

        Ok(RunReport {
            run_id,
            outcome,
            answer: self.guard.check_output(&text),
            steps,
        })
    }

    async fn open_session(&self) -> Result<Option<Box<dyn ToolSession>>> {
        if !self.tools.has_remote() {
            return Ok(None);
        }
        let factory = self.sessions.as_ref().ok_or_else(|| {
            AgentError::Config("remote tools are registered but no tool server is configured".into())
        })?;
        factory.open().await.map(Some)
    }

    async fn drive(
        &self,
        conversation: &mut Conversation,
        session: Option<&dyn ToolSession>,
        max_steps: usize,
        steps: &mut Vec<StepRecord>,
    ) -> Result<(RunOutcome, String)> {
        let dispatcher = Dispatcher::new(&self.tools, session);
        let mut state = LoopState::AwaitingModel { step: 1 };

        loop {
            state = match state {
                LoopState::AwaitingModel { step } if step > max_steps => LoopState::MaxStepsReached,
                LoopState::AwaitingModel { step } => {
                    let reply = self
                        .provider
                        .generate(conversation.messages(), &self.config.generation)
                        .await?;
                    tracing::debug!(step, reply = %reply, "Model replied");
                    LoopState::AwaitingParse { step, reply }
                }
                LoopState::AwaitingParse { step, reply } => match parser::parse(&reply) {
                    Ok(Decision {
                        thought,
                        action: Action::Finish { answer },
                    }) => LoopState::Done(final_answer(answer, thought, conversation)),
                    Ok(Decision {
                        action: Action::Call(call),
                        ..
                    }) => LoopState::AwaitingTool { step, reply, call },
                    Err(failure) => {
                        tracing::warn!(step, error = %failure, "Unparsable model reply");
                        LoopState::Aborted(failure.diagnostic())
                    }
                },
                LoopState::AwaitingTool { step, reply, call } => {
                    tracing::info!(step, action = %call.name, args = %serde_json::Value::Object(call.arguments.clone()), "Calling tool");
                    let observation = self.observe(&dispatcher, &call).await;
                    tracing::debug!(step, observation = %observation, "Observation");

                    conversation.push_step(reply, &observation);
                    steps.push(StepRecord {
                        step,
                        action: call.name,
                        observation,
                    });
                    LoopState::AwaitingModel { step: step + 1 }
                }
                LoopState::Done(text) => return Ok((RunOutcome::Done, text)),
                LoopState::MaxStepsReached => {
                    tracing::warn!(max_steps, "Step budget exhausted");
                    return Ok((RunOutcome::MaxStepsReached, MAX_STEPS_MESSAGE.into()));
                }
                LoopState::Aborted(diagnostic) => return Ok((RunOutcome::ParseFailed, diagnostic)),
            };
        }
    }

    /// Dispatch, render and guard one tool call
    async fn observe(&self, dispatcher: &Dispatcher<'_>, call: &ToolCall) -> String {
        let result = match dispatcher.dispatch(call).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Dispatch rejected");
                Value::String(e.observation())
            }
        };

        let text = render_observation(&result);
        self.guard.check_tool_result(&call.name, &text).text
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get the model backend
    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Strings go in verbatim; everything else as compact JSON.
pub fn render_observation(result: &Value) -> String {
    match result {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn final_answer(answer: Option<String>, thought: Option<String>, conversation: &Conversation) -> String {
    answer
        .or(thought)
        .or_else(|| {
            conversation
                .assistant_replies()
                .find_map(|m| parser::parse(&m.content).ok().and_then(|d| d.thought))
        })
        .unwrap_or_else(|| COMPLETED_MESSAGE.into())
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: ToolRegistry,
    sessions: Option<Arc<dyn ToolSessionFactory>>,
    guard: GuardFilter,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: ToolRegistry::new(),
            sessions: None,
            guard: GuardFilter::default(),
            config: AgentConfig::default(),
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn tool_sessions(mut self, factory: Arc<dyn ToolSessionFactory>) -> Self {
        self.sessions = Some(factory);
        self
    }

    pub fn guard(mut self, guard: GuardFilter) -> Self {
        self.guard = guard;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    pub fn guidelines(mut self, guidelines: impl Into<String>) -> Self {
        self.config.guidelines = Some(guidelines.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    pub fn max_steps(mut self, max: usize) -> Self {
        self.config.max_steps = max;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self.provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        if self.tools.has_remote() && self.sessions.is_none() {
            return Err(AgentError::Config(
                "remote tools are registered but no tool server is configured".into(),
            ));
        }

        Ok(Agent::new(
            provider,
            Arc::new(self.tools),
            self.sessions,
            self.guard,
            self.config,
        ))
    }
}
