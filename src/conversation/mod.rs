//! Conversation types and state management

use chrono::Local;
use serde::{Deserialize, Serialize};

/// One rendered turn in a chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub is_from_user: bool,
    /// Local `HH:MM` at creation. Display only, never used for ordering.
    pub timestamp: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_from_user: true,
            timestamp: now_label(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_from_user: false,
            timestamp: now_label(),
        }
    }

    /// Role this message takes when replayed to the completion service
    pub fn role(&self) -> Role {
        if self.is_from_user {
            Role::User
        } else {
            Role::Assistant
        }
    }

    pub fn to_turn(&self) -> Turn {
        Turn {
            role: self.role(),
            content: self.text.clone(),
        }
    }
}

fn now_label() -> String {
    Local::now().format("%H:%M").to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A role-tagged message as sent to the completion service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Ordered message history plus the single in-flight flag.
///
/// Messages are only ever appended; `reset` is the one way to shrink it.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationState {
    messages: Vec<Message>,
    is_waiting: bool,
    #[serde(skip)]
    greeting: String,
}

impl ConversationState {
    /// Start a conversation seeded with one assistant greeting
    pub fn seeded(greeting: impl Into<String>) -> Self {
        let greeting = greeting.into();
        Self {
            messages: vec![Message::assistant(greeting.clone())],
            is_waiting: false,
            greeting,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_waiting(&self) -> bool {
        self.is_waiting
    }

    pub(crate) fn set_waiting(&mut self, waiting: bool) {
        self.is_waiting = waiting;
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// The last `n` messages as role-tagged turns, oldest first
    pub fn recent_turns(&self, n: usize) -> Vec<Turn> {
        let start = self.messages.len().saturating_sub(n);
        self.messages[start..].iter().map(Message::to_turn).collect()
    }

    pub fn reset(&mut self) {
        self.messages = vec![Message::assistant(self.greeting.clone())];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_with_greeting() {
        let state = ConversationState::seeded("Hello");
        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.messages()[0].text, "Hello");
        assert!(!state.messages()[0].is_from_user);
        assert!(!state.is_waiting());
    }

    #[test]
    fn test_recent_turns_window() {
        let mut state = ConversationState::seeded("Hello");
        for i in 0..10 {
            state.push(Message::user(format!("q{}", i)));
        }

        let turns = state.recent_turns(6);
        assert_eq!(turns.len(), 6);
        assert_eq!(turns[0].content, "q4");
        assert_eq!(turns[5].content, "q9");
        assert!(turns.iter().all(|t| t.role == Role::User));

        let short = ConversationState::seeded("Hello").recent_turns(6);
        assert_eq!(short.len(), 1);
        assert_eq!(short[0].role, Role::Assistant);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Turn::system("x")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"x"}"#);
    }
}
