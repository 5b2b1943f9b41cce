//! Response Parser
//!
//! Pulls a decision out of free-form model text:
//!
//! ```text
//! Thought: I should look the office up first
//! Action: search_offices
//! Args: {"query": "HQ"}
//! ```
//!
//! This is marker extraction, not a grammar. Prose around the markers is
//! tolerated and anything after the `Args` object is ignored.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::tool::ToolCall;

/// Action name the model uses to say it is finished (any case)
pub const TERMINAL_ACTION: &str = "DONE";

static ACTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Action:\s*(\w+)").expect("invalid action pattern"));

// Only a marker directly followed by an object counts; prose may mention "Args:".
static ARGS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Args:\s*\{").expect("invalid args pattern"));

static THOUGHT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)Thought:\s*(.*?)\s*(?:\b(?:Answer|Action|Args)\s*:|\z)")
        .expect("invalid thought pattern")
});

static ANSWER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)Answer:\s*(.*?)\s*(?:\b(?:Thought|Action|Args)\s*:|\z)")
        .expect("invalid answer pattern")
});

/// What the model wants to do next
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    /// Invoke a tool
    Call(ToolCall),
    /// Stop; `answer` is the optional `Answer:` section
    Finish { answer: Option<String> },
}

/// A parsed model reply
#[derive(Clone, Debug, PartialEq)]
pub struct Decision {
    /// Free text after `Thought:`, informational only
    pub thought: Option<String>,
    pub action: Action,
}

impl Decision {
    pub fn is_terminal(&self) -> bool {
        matches!(self.action, Action::Finish { .. })
    }
}

/// Why a reply could not be turned into a decision
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("Could not parse an Action from the model response")]
    NoAction,

    #[error("Could not parse Args for action '{action}'")]
    NoArgs { action: String },

    #[error("Invalid JSON in Args for action '{action}': {cause}")]
    InvalidArgs { action: String, cause: String },
}

impl ParseFailure {
    /// Terminal message returned to the caller when a run stops on this failure
    pub fn diagnostic(&self) -> String {
        format!("Error: {}", self)
    }
}

/// Extract a [`Decision`] from a model reply.
pub fn parse(reply: &str) -> Result<Decision, ParseFailure> {
    let action = ACTION_RE
        .captures(reply)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or(ParseFailure::NoAction)?;

    let thought = section(&THOUGHT_RE, reply);

    if action.eq_ignore_ascii_case(TERMINAL_ACTION) {
        return Ok(Decision {
            thought,
            action: Action::Finish {
                answer: section(&ANSWER_RE, reply),
            },
        });
    }

    let arguments = parse_args(reply, &action)?;

    Ok(Decision {
        thought,
        action: Action::Call(ToolCall::new(action, arguments)),
    })
}

fn parse_args(reply: &str, action: &str) -> Result<Map<String, Value>, ParseFailure> {
    let no_args = || ParseFailure::NoArgs {
        action: action.to_string(),
    };

    let mut first_error = None;
    for marker in ARGS_RE.find_iter(reply) {
        // Start at the opening brace the marker ended on.
        let rest = &reply[marker.end() - 1..];

        // Read exactly one object; whatever follows it is prose.
        let mut stream = serde_json::Deserializer::from_str(rest).into_iter::<Map<String, Value>>();
        match stream.next() {
            Some(Ok(arguments)) => return Ok(arguments),
            Some(Err(e)) => {
                first_error.get_or_insert_with(|| ParseFailure::InvalidArgs {
                    action: action.to_string(),
                    cause: e.to_string(),
                });
            }
            None => {}
        }
    }

    Err(first_error.unwrap_or_else(no_args))
}

fn section(re: &Regex, reply: &str) -> Option<String> {
    re.captures(reply)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}
