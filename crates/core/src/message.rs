//! Message and Conversation value types.
//!
//! Messages flow from the speaker (voice or keyboard) through the responder
//! to the LLM provider and back. The simulator loop builds a fresh two-message
//! exchange per turn; the `chat` command keeps a running [`Conversation`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation (session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The pilot / player
    User,
    /// The assistant
    Assistant,
    /// System instructions and telemetry context
    System,
}

impl Role {
    /// Wire name used by OpenAI-compatible and Ollama chat APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }
}

/// An ordered sequence of messages with shared context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: ConversationId,

    /// Ordered messages
    pub messages: Vec<Message>,

    /// When this conversation was created
    pub created_at: DateTime<Utc>,

    /// When the last message was added
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Add a message to the conversation.
    pub fn push(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    /// Drop the oldest non-system messages until at most `max` remain.
    ///
    /// A leading system message is always kept and does not count toward `max`.
    pub fn trim_to(&mut self, max: usize) {
        let offset = match self.messages.first() {
            Some(m) if m.role == Role::System => 1,
            _ => 0,
        };
        let turns = self.messages.len() - offset;
        if turns > max {
            self.messages.drain(offset..offset + (turns - max));
        }
    }

    /// Get the total token count estimate (rough: 4 chars ≈ 1 token).
    pub fn estimated_tokens(&self) -> usize {
        self.messages.iter().map(|m| m.content.len() / 4).sum()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("What is my altitude?");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "What is my altitude?");
    }

    #[test]
    fn conversation_tracks_updates() {
        let mut conv = Conversation::new();
        let created = conv.created_at;

        conv.push(Message::user("First message"));
        assert_eq!(conv.messages.len(), 1);
        assert!(conv.updated_at >= created);
    }

    #[test]
    fn trim_keeps_system_prompt() {
        let mut conv = Conversation::new();
        conv.push(Message::system("You are a co-pilot"));
        for i in 0..6 {
            conv.push(Message::user(format!("question {i}")));
        }

        conv.trim_to(4);

        assert_eq!(conv.messages.len(), 5);
        assert_eq!(conv.messages[0].role, Role::System);
        assert_eq!(conv.messages[1].content, "question 2");
        assert_eq!(conv.messages[4].content, "question 5");
    }

    #[test]
    fn trim_without_system_prompt() {
        let mut conv = Conversation::new();
        conv.push(Message::user("a"));
        conv.push(Message::assistant("b"));
        conv.push(Message::user("c"));

        conv.trim_to(2);
        assert_eq!(conv.messages.len(), 2);
        assert_eq!(conv.messages[0].content, "b");

        conv.trim_to(10);
        assert_eq!(conv.messages.len(), 2);
    }

    #[test]
    fn role_wire_names() {
        assert_eq!(Role::System.as_str(), "system");
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn conversation_token_estimate() {
        let mut conv = Conversation::new();
        // 20 chars ≈ 5 tokens
        conv.push(Message::user("12345678901234567890"));
        assert_eq!(conv.estimated_tokens(), 5);
    }
}
