//! Base trait for channel handlers

use async_trait::async_trait;
use ollacord_core::bus::{InboundMessage, OutboundMessage};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// Trait for channel handlers
#[async_trait]
pub trait ChannelHandler: Send + Sync {
    /// Get the channel name
    fn name(&self) -> &str;

    /// Check if the channel is running
    fn is_running(&self) -> bool;

    /// Start the channel handler
    async fn start(&mut self) -> Result<()>;

    /// Stop the channel handler
    async fn stop(&mut self) -> Result<()>;

    /// Send a message
    async fn send(&self, message: OutboundMessage) -> Result<()>;

    /// Set the inbound message sender
    fn set_inbound_sender(&mut self, tx: mpsc::Sender<InboundMessage>);

    /// The relay finished with an event in `chat_id`
    async fn finish_reply(&self, _chat_id: &str) {}
}

/// Channel errors
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel error: {0}")]
    Error(String),

    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Send error: {0}")]
    SendError(String),

    #[error("Send failed: {0}")]
    SendFailed(String),
}

pub type Result<T> = std::result::Result<T, ChannelError>;

impl From<ChannelError> for ollacord_core::Error {
    fn from(e: ChannelError) -> Self {
        ollacord_core::Error::Channel(e.to_string())
    }
}

/// Shared channel handler type
pub type ChannelHandlerPtr = Arc<RwLock<dyn ChannelHandler>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_error_display() {
        let err = ChannelError::NotConfigured("discord".to_string());
        assert_eq!(err.to_string(), "Channel not configured: discord");

        let err = ChannelError::SendFailed("HTTP 403".to_string());
        assert_eq!(err.to_string(), "Send failed: HTTP 403");
    }

    #[test]
    fn test_channel_error_variants() {
        let errors = [
            ChannelError::Error("parse".to_string()),
            ChannelError::NotConfigured("discord".to_string()),
            ChannelError::ApiError("timeout".to_string()),
            ChannelError::SendError("closed".to_string()),
            ChannelError::SendFailed("HTTP 500".to_string()),
        ];

        for err in errors {
            let prefix = match &err {
                ChannelError::Error(_) => "Channel error",
                ChannelError::NotConfigured(_) => "Channel not configured",
                ChannelError::ApiError(_) => "API error",
                ChannelError::SendError(_) => "Send error",
                ChannelError::SendFailed(_) => "Send failed",
            };
            assert!(err.to_string().starts_with(prefix), "{}", err);
        }
    }

    #[test]
    fn test_channel_error_into_core_error() {
        let err: ollacord_core::Error = ChannelError::ApiError("boom".to_string()).into();
        assert!(matches!(err, ollacord_core::Error::Channel(ref text) if text.contains("boom")));
    }
}
