//! Channel manager

use crate::base::{ChannelError, ChannelHandler, ChannelHandlerPtr, Result};
use crate::discord::DiscordHandler;
use async_trait::async_trait;
use ollacord_core::bus::{InboundMessage, MessageSink, OutboundMessage, SelfIdentity};
use ollacord_core::config::schema::Config;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// Channel manager that coordinates all channel handlers
pub struct ChannelManager {
    /// Configuration
    config: Config,
    /// The bot's own id, filled in by the platform handler
    identity: SelfIdentity,
    /// Channel handlers
    handlers: RwLock<HashMap<String, ChannelHandlerPtr>>,
    /// Inbound message sender
    inbound_tx: Option<mpsc::Sender<InboundMessage>>,
}

impl ChannelManager {
    /// Create a new channel manager
    pub fn new(config: Config, identity: SelfIdentity) -> Self {
        Self {
            config,
            identity,
            handlers: RwLock::new(HashMap::new()),
            inbound_tx: None,
        }
    }

    /// Set the inbound message sender
    pub fn set_inbound_sender(&mut self, tx: mpsc::Sender<InboundMessage>) {
        self.inbound_tx = Some(tx);
    }

    /// Initialize channels based on configuration
    pub async fn initialize(&self) -> Result<()> {
        if self.config.discord.token.trim().is_empty() {
            tracing::warn!("Discord token not configured");
            return Err(ChannelError::NotConfigured(
                "Discord token not configured".to_string(),
            ));
        }

        let handler = DiscordHandler::new(&self.config.discord, self.identity.clone())?;
        self.register(handler).await;
        tracing::info!("Discord channel initialized");
        Ok(())
    }

    /// Add a handler, wiring it to the inbound sender
    pub async fn register<H: ChannelHandler + 'static>(&self, mut handler: H) {
        if let Some(ref tx) = self.inbound_tx {
            handler.set_inbound_sender(tx.clone());
        }
        let name = handler.name().to_string();
        let mut handlers = self.handlers.write().await;
        handlers.insert(name, Arc::new(RwLock::new(handler)) as ChannelHandlerPtr);
    }

    /// Start all channel handlers
    pub async fn start_all(&self) -> Result<()> {
        let handlers = self.handlers.read().await;

        for (name, handler) in handlers.iter() {
            tracing::info!("Starting {} channel...", name);
            let mut handler = handler.write().await;
            handler.start().await?;
        }

        Ok(())
    }

    /// Stop all channel handlers
    pub async fn stop_all(&self) -> Result<()> {
        let mut handlers = self.handlers.write().await;

        for (name, handler) in handlers.iter_mut() {
            tracing::info!("Stopping {} channel...", name);
            let mut handler = handler.write().await;
            if let Err(e) = handler.stop().await {
                tracing::error!("Failed to stop {} channel: {}", name, e);
            }
        }

        handlers.clear();
        Ok(())
    }

    /// Get a channel handler by name
    pub async fn get_handler(&self, name: &str) -> Option<ChannelHandlerPtr> {
        let handlers = self.handlers.read().await;
        handlers.get(name).cloned()
    }

    /// Send a message through a specific channel
    pub async fn send(&self, channel: &str, message: OutboundMessage) -> Result<()> {
        let handler = self
            .get_handler(channel)
            .await
            .ok_or_else(|| ChannelError::NotConfigured(format!("Channel {} not found", channel)))?;

        let handler = handler.read().await;
        handler.send(message).await
    }

    /// Check if a channel is running
    pub async fn is_channel_running(&self, name: &str) -> bool {
        let Some(handler) = self.get_handler(name).await else {
            return false;
        };
        let handler = handler.read().await;
        handler.is_running()
    }

    /// Get list of active channels
    pub async fn list_channels(&self) -> Vec<String> {
        let handlers = self.handlers.read().await;
        handlers.keys().cloned().collect()
    }
}

#[async_trait]
impl MessageSink for ChannelManager {
    async fn send(&self, message: OutboundMessage) -> ollacord_core::Result<()> {
        let channel = message.channel.clone();
        ChannelManager::send(self, &channel, message).await?;
        Ok(())
    }

    async fn finish_reply(&self, channel: &str, chat_id: &str) {
        if let Some(handler) = self.get_handler(channel).await {
            handler.read().await.finish_reply(chat_id).await;
        }
    }
}
