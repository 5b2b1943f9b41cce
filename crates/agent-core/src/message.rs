//! Conversation Messages
//!
//! Role-tagged messages and the per-run conversation history.

use serde::{Deserialize, Serialize};

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input and tool observations
    User,
    /// Assistant (LLM) response
    Assistant,
}

impl Role {
    /// Wire name used by chat APIs
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Text content
    pub content: String,
}

impl Message {
    /// Create a new message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create the user turn carrying a tool observation
    pub fn observation(text: &str) -> Self {
        Self::user(format!("Observation: {}", text))
    }
}

/// History owned by a single run.
///
/// Always starts with one system message and one user message; after that it
/// only grows by (assistant, observation) pairs pushed together.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Seed a conversation with the system prompt and the user's request
    pub fn seed(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt), Message::user(user_prompt)],
        }
    }

    /// Append one completed step: the model's raw reply and the observation it produced
    pub fn push_step(&mut self, assistant_reply: impl Into<String>, observation: &str) {
        self.messages.reserve(2);
        self.messages.push(Message::assistant(assistant_reply));
        self.messages.push(Message::observation(observation));
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Assistant replies, most recent first
    pub fn assistant_replies(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().rev().filter(|m| m.role == Role::Assistant)
    }

    /// Number of completed steps recorded
    pub fn steps(&self) -> usize {
        self.messages.len().saturating_sub(2) / 2
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false: a seeded conversation has at least two messages
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
    }

    #[test]
    fn test_seeded_conversation() {
        let mut conv = Conversation::seed("You are helpful.", "Hi");
        assert_eq!(conv.len(), 2);
        assert_eq!(conv.messages()[0].role, Role::System);
        assert_eq!(conv.messages()[1].role, Role::User);
        assert_eq!(conv.steps(), 0);

        conv.push_step("Action: search_offices", "HQ is in New York");

        assert_eq!(conv.len(), 4);
        assert_eq!(conv.steps(), 1);
        assert_eq!(conv.messages()[2].role, Role::Assistant);
        let last = conv.last().unwrap();
        assert_eq!(last.role, Role::User);
        assert_eq!(last.content, "Observation: HQ is in New York");
    }

    #[test]
    fn test_message_wire_shape() {
        let value = serde_json::to_value(Message::assistant("Action: DONE")).unwrap();
        assert_eq!(value, serde_json::json!({"role": "assistant", "content": "Action: DONE"}));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }
}
