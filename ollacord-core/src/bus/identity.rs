//! The bot's own user id, learned once the platform connection is ready

use parking_lot::RwLock;
use std::sync::Arc;

/// Shared handle to the bot's own platform user id.
///
/// The platform handler fills it in when the gateway reports ready; the
/// relay reads it to drop events the bot authored itself.
#[derive(Debug, Clone, Default)]
pub struct SelfIdentity {
    id: Arc<RwLock<Option<String>>>,
}

impl SelfIdentity {
    /// Create an identity that is not known yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an identity with a known id
    pub fn with_id(id: impl Into<String>) -> Self {
        let identity = Self::new();
        identity.set(id);
        identity
    }

    /// Record the bot's user id
    pub fn set(&self, id: impl Into<String>) {
        *self.id.write() = Some(id.into());
    }

    /// Current bot user id, if known
    pub fn get(&self) -> Option<String> {
        self.id.read().clone()
    }

    /// Whether `author_id` is the bot itself
    pub fn is_self(&self, author_id: &str) -> bool {
        self.id.read().as_deref() == Some(author_id)
    }
}
