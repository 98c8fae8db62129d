//! Append-only conversation history

use crate::provider::{ChatMessage, Role};

/// Ordered turns of one agent run. Turns can be appended and read, never
/// edited or removed.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<ChatMessage>,
}

impl Conversation {
    /// Start a conversation with the system prompt and the user's request
    pub fn seeded(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            turns: vec![ChatMessage::system(system), ChatMessage::user(user)],
        }
    }

    pub fn push(&mut self, turn: ChatMessage) {
        self.turns.push(turn);
    }

    pub fn extend(&mut self, turns: impl IntoIterator<Item = ChatMessage>) {
        self.turns.extend(turns);
    }

    pub fn turns(&self) -> &[ChatMessage] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Text of the most recent assistant turn, if any
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|turn| turn.role == Role::Assistant)
            .and_then(|turn| turn.content.as_deref())
    }
}
