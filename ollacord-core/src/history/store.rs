//! History data structures

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Identifies one conversation: a channel inside a server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelKey {
    server_id: String,
    channel_id: String,
}

impl ChannelKey {
    /// Create a new key
    pub fn new(server_id: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            server_id: server_id.into(),
            channel_id: channel_id.into(),
        }
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.server_id, self.channel_id)
    }
}

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One utterance in a transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    /// Create a new turn
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a system turn
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Bounded FIFO window of turns, oldest first
#[derive(Debug, Clone)]
pub struct Transcript {
    turns: VecDeque<Turn>,
    limit: usize,
}

impl Transcript {
    /// Create an empty transcript holding at most `limit` turns.
    ///
    /// A limit of zero is treated as one.
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            turns: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Append a turn, evicting the oldest one when already full
    pub fn push(&mut self, turn: Turn) {
        if self.turns.len() >= self.limit {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    /// Copy of the turns in arrival order
    pub fn to_vec(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_eviction() {
        let mut transcript = Transcript::new(3);
        for content in ["A", "B", "C", "D"] {
            transcript.push(Turn::user(content));
        }

        let contents: Vec<_> = transcript.iter().map(|t| t.content().to_string()).collect();
        assert_eq!(contents, vec!["B", "C", "D"]);
    }

    #[test]
    fn test_length_never_exceeds_limit() {
        let mut transcript = Transcript::new(8);
        for i in 0..20 {
            transcript.push(Turn::user(format!("Message {}", i)));
            assert!(transcript.len() <= 8);
            if i + 1 >= 8 {
                assert_eq!(transcript.len(), 8);
            }
        }
        assert_eq!(transcript.to_vec()[0].content(), "Message 12");
    }

    #[test]
    fn test_zero_limit_keeps_latest_turn() {
        let mut transcript = Transcript::new(0);
        transcript.push(Turn::user("first"));
        transcript.push(Turn::assistant("second"));

        assert_eq!(transcript.limit(), 1);
        assert_eq!(transcript.to_vec(), vec![Turn::assistant("second")]);
    }

    #[test]
    fn test_role_serialization() {
        let turn = Turn::assistant("Hi there!");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "Hi there!"}));
        assert_eq!(Role::System.to_string(), "system");
    }

    #[test]
    fn test_channel_key_equality() {
        assert_eq!(ChannelKey::new("s1", "c1"), ChannelKey::new("s1", "c1"));
        assert_ne!(ChannelKey::new("s1", "c1"), ChannelKey::new("s1", "c2"));
        assert_ne!(ChannelKey::new("s1", "c1"), ChannelKey::new("s2", "c1"));
        assert_eq!(ChannelKey::new("s1", "c1").to_string(), "s1/c1");
    }
}
