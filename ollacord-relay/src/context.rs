//! Context builder for assembling prompts

use ollacord_core::history::Turn;
use ollacord_providers::Message;

/// Default system directive sent ahead of every transcript
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant";

/// Builds the message list for LLM requests
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    system_prompt: String,
}

impl ContextBuilder {
    /// Create a new context builder
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Build the complete message list for an LLM call: the system
    /// directive followed by the transcript in arrival order
    pub fn build_messages(&self, history: &[Turn]) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(self.system_prompt.clone()));
        messages.extend(history.iter().map(Message::from));
        messages
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ollacord_core::history::Role;

    #[test]
    fn test_build_messages_empty_history() {
        let builder = ContextBuilder::default();
        let messages = builder.build_messages(&[]);
        assert_eq!(messages, vec![Message::system(DEFAULT_SYSTEM_PROMPT)]);
    }

    #[test]
    fn test_build_messages_keeps_order() {
        let builder = ContextBuilder::new("Be brief");
        let history = vec![
            Turn::user("Hello"),
            Turn::assistant("Hi!"),
            Turn::user("How are you?"),
        ];

        let messages = builder.build_messages(&history);

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "Be brief");
        let roles: Vec<Role> = messages[1..].iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
        assert_eq!(messages[3].content, "How are you?");
    }
}
