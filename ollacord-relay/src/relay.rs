//! Relay: the per-event processing engine

use ollacord_core::bus::{InboundMessage, MessageSink, OutboundMessage, SelfIdentity};
use ollacord_core::config::schema::RelayConfig;
use ollacord_core::history::{ChannelKey, HistoryStore, Turn};
use ollacord_providers::{LLMProvider, Message, ProviderError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn, Instrument};

use crate::chunk::chunk_text;
use crate::context::ContextBuilder;

/// Default maximum characters per outbound message
pub const DEFAULT_CHUNK_SIZE: usize = 2000;

/// Why an event could not be relayed
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Inference backend failed: {0}")]
    Backend(#[from] ProviderError),

    #[error("Inference timed out after {0:?}")]
    Timeout(Duration),

    #[error("Send failed after {sent} of {total} chunks: {source}")]
    Send {
        sent: usize,
        total: usize,
        #[source]
        source: ollacord_core::Error,
    },
}

/// What happened to an inbound event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The event was authored by the bot itself
    Ignored,
    /// The reply went out in `chunks` messages
    Replied { chunks: usize },
}

/// Relays chat events to the inference backend and replies back
pub struct Relay {
    provider: Arc<dyn LLMProvider>,
    history: Arc<HistoryStore>,
    sink: Arc<dyn MessageSink>,
    identity: SelfIdentity,
    context: ContextBuilder,
    model: String,
    chunk_size: usize,
    inference_timeout: Option<Duration>,
    error_reply: Option<String>,
}

impl Relay {
    /// Create a new relay using the provider's default model
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        history: Arc<HistoryStore>,
        sink: Arc<dyn MessageSink>,
        identity: SelfIdentity,
    ) -> Self {
        let model = provider.get_default_model();
        Self {
            provider,
            history,
            sink,
            identity,
            context: ContextBuilder::default(),
            model,
            chunk_size: DEFAULT_CHUNK_SIZE,
            inference_timeout: None,
            error_reply: None,
        }
    }

    /// Apply the `relay` configuration section
    pub fn with_config(self, config: &RelayConfig) -> Self {
        let timeout = (config.inference_timeout_secs > 0)
            .then(|| Duration::from_secs(config.inference_timeout_secs));
        self.with_context(ContextBuilder::new(config.system_prompt.clone()))
            .with_chunk_size(config.chunk_size)
            .with_inference_timeout(timeout)
            .with_error_reply(config.error_reply.clone())
    }

    pub fn with_context(mut self, context: ContextBuilder) -> Self {
        self.context = context;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_inference_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.inference_timeout = timeout;
        self
    }

    /// Text sent to the channel when the backend fails; empty disables it
    pub fn with_error_reply(mut self, reply: impl Into<String>) -> Self {
        let reply = reply.into();
        self.error_reply = (!reply.trim().is_empty()).then_some(reply);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    /// Consume inbound events until the sender side closes.
    ///
    /// Every event is handled on its own task, so a slow reply in one
    /// channel does not hold up the others.
    pub async fn run(self: Arc<Self>, mut inbound_rx: mpsc::Receiver<InboundMessage>) {
        info!("Relay started (model: {})", self.model);

        while let Some(msg) = inbound_rx.recv().await {
            let relay = Arc::clone(&self);
            tokio::spawn(async move {
                match relay.handle(msg).await {
                    Ok(RelayOutcome::Ignored) => debug!("Ignored own message"),
                    Ok(RelayOutcome::Replied { chunks }) => debug!("Reply sent in {} chunks", chunks),
                    Err(e) => error!("Failed to relay message: {}", e),
                }
            });
        }

        info!("Inbound channel closed, stopping relay");
    }

    /// Process a single inbound event
    pub async fn handle(&self, msg: InboundMessage) -> Result<RelayOutcome, RelayError> {
        let key = msg.channel_key();
        let span = tracing::info_span!(
            "relay",
            server = %key.server_id(),
            channel = %key.channel_id()
        );

        async {
            if self.identity.is_self(&msg.sender_id) {
                return Ok(RelayOutcome::Ignored);
            }

            info!(
                "Processing message from {}: {}",
                msg.sender_id,
                preview(&msg.content, 80)
            );

            let result = match self.ask(&key, &msg.content).await {
                Ok(reply) => self.send_chunks(&msg, &reply).await,
                Err(e) => {
                    self.send_error_reply(&msg).await;
                    Err(e)
                }
            };

            self.sink.finish_reply(&msg.channel, &msg.chat_id).await;
            result.map(|chunks| RelayOutcome::Replied { chunks })
        }
        .instrument(span)
        .await
    }

    /// Record `text` as a user turn in `key`, ask the backend and record the
    /// reply, without sending anything to the platform.
    ///
    /// The channel stays locked until the reply is recorded, so concurrent
    /// events in one channel never interleave their turns. On failure the
    /// user turn is kept and no assistant turn is added.
    pub async fn ask(&self, key: &ChannelKey, text: &str) -> Result<String, RelayError> {
        let mut history = self.history.lock(key).await;
        history.push(Turn::user(text));

        let messages = self.context.build_messages(&history.snapshot());
        let reply = self.infer(messages).await.map_err(|e| {
            error!("Inference failed for {}: {}", key, e);
            e
        })?;

        history.push(Turn::assistant(reply.clone()));
        info!("Response to {}: {}", key, preview(&reply, 120));
        Ok(reply)
    }

    async fn infer(&self, messages: Vec<Message>) -> Result<String, RelayError> {
        let call = self.provider.chat(messages, Some(self.model.clone()));
        let response = match self.inference_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| RelayError::Timeout(limit))??,
            None => call.await?,
        };
        Ok(response.content)
    }

    /// Send `reply` in order, stopping at the first failed chunk
    async fn send_chunks(&self, msg: &InboundMessage, reply: &str) -> Result<usize, RelayError> {
        let chunks = chunk_text(reply, self.chunk_size);
        let total = chunks.len();

        for (sent, chunk) in chunks.into_iter().enumerate() {
            let outbound = OutboundMessage::new(&msg.channel, &msg.chat_id, chunk);
            if let Err(source) = self.sink.send(outbound).await {
                return Err(RelayError::Send {
                    sent,
                    total,
                    source,
                });
            }
        }

        Ok(total)
    }

    async fn send_error_reply(&self, msg: &InboundMessage) {
        let Some(reply) = &self.error_reply else {
            return;
        };
        if let Err(e) = self.send_chunks(msg, reply).await {
            warn!("Failed to send error reply: {}", e);
        }
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}
