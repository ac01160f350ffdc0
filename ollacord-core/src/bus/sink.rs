//! Outbound delivery seam

use super::events::OutboundMessage;
use async_trait::async_trait;

/// Something that can deliver an outbound message to a chat platform.
///
/// Unlike a fire-and-forget queue, `send` reports the outcome of each
/// delivery so callers can stop after the first failure.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Deliver one message
    async fn send(&self, message: OutboundMessage) -> crate::Result<()>;

    /// Called once the relay is done with an event for `chat_id`, whether or
    /// not anything was sent. Platforms use it to clear typing indicators.
    async fn finish_reply(&self, _channel: &str, _chat_id: &str) {}
}
