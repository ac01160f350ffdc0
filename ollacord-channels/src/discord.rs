//! Discord channel integration using Gateway WebSocket
//!
//! Messages are received in real time over the Discord Gateway and replies
//! are posted through the REST API.

use crate::base::{ChannelError, ChannelHandler, Result};
use crate::common::{create_http_client, retry_after_secs};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use ollacord_core::bus::{InboundMessage, OutboundMessage, SelfIdentity};
use ollacord_core::config::schema::{DiscordConfig, DISCORD_MESSAGE_LIMIT};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tokio_tungstenite::tungstenite::Message as WsMessage;

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Server id used for direct messages, which have no guild
pub const DIRECT_MESSAGE_SERVER_ID: &str = "@me";

/// Attempts per message when Discord answers 429
const MAX_SEND_ATTEMPTS: usize = 3;

/// Discord Gateway message opcodes
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
enum GatewayOp {
    Dispatch = 0,
    Heartbeat = 1,
    Identify = 2,
    Reconnect = 7,
    InvalidSession = 9,
    Hello = 10,
    HeartbeatAck = 11,
}

impl GatewayOp {
    fn from_u8(op: u8) -> Option<Self> {
        match op {
            0 => Some(GatewayOp::Dispatch),
            1 => Some(GatewayOp::Heartbeat),
            2 => Some(GatewayOp::Identify),
            7 => Some(GatewayOp::Reconnect),
            9 => Some(GatewayOp::InvalidSession),
            10 => Some(GatewayOp::Hello),
            11 => Some(GatewayOp::HeartbeatAck),
            _ => None,
        }
    }
}

/// What the read loop should do after a gateway payload
#[derive(Debug, PartialEq)]
enum GatewayFlow {
    Continue,
    Reconnect,
}

/// Discord Gateway payload
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GatewayPayload {
    op: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    d: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    s: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    t: Option<String>,
}

/// Discord message author
#[derive(Debug, Clone, Deserialize)]
struct DiscordAuthor {
    id: String,
    username: String,
    #[serde(default)]
    bot: bool,
}

/// Discord message
#[derive(Debug, Clone, Deserialize)]
struct DiscordMessage {
    id: String,
    channel_id: String,
    #[serde(default)]
    content: String,
    author: DiscordAuthor,
    #[serde(default)]
    guild_id: Option<String>,
}

/// READY event: who we are
#[derive(Debug, Clone, Deserialize)]
struct ReadyEvent {
    user: DiscordAuthor,
}

/// Convert a MESSAGE_CREATE payload into an inbound message
fn parse_message_create(payload: serde_json::Value) -> Result<InboundMessage> {
    let msg: DiscordMessage = serde_json::from_value(payload)
        .map_err(|e| ChannelError::Error(format!("Failed to parse message: {}", e)))?;

    let server_id = msg
        .guild_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| DIRECT_MESSAGE_SERVER_ID.to_string());

    Ok(
        InboundMessage::new("discord", msg.author.id, server_id, msg.channel_id, msg.content)
            .with_metadata("message_id", msg.id)
            .with_metadata("username", msg.author.username)
            .with_metadata("bot", msg.author.bot),
    )
}

/// Typing indicator for one channel, shared by the replies still pending there
struct TypingState {
    pending: usize,
    task: JoinHandle<()>,
}

/// Discord channel handler
pub struct DiscordHandler {
    config: DiscordConfig,
    /// REST API base URL
    api_base: String,
    /// Running state (shared across tasks)
    running: Arc<AtomicBool>,
    /// Inbound message sender
    inbound_tx: Option<mpsc::Sender<InboundMessage>>,
    /// HTTP client
    http: reqwest::Client,
    /// The bot's own user id, set on READY
    identity: SelfIdentity,
    /// Sequence number for heartbeats
    seq: Arc<Mutex<Option<u64>>>,
    /// Typing indicators by channel id
    typing: Arc<Mutex<HashMap<String, TypingState>>>,
    /// Shutdown signal sender
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl DiscordHandler {
    /// Create a new Discord handler from config
    pub fn new(config: &DiscordConfig, identity: SelfIdentity) -> Result<Self> {
        let mut config = config.clone();
        config.token = config.token.trim().to_string();

        Ok(Self {
            config,
            api_base: DISCORD_API_BASE.to_string(),
            running: Arc::new(AtomicBool::new(false)),
            inbound_tx: None,
            http: create_http_client()?,
            identity,
            seq: Arc::new(Mutex::new(None)),
            typing: Arc::new(Mutex::new(HashMap::new())),
            shutdown_tx: None,
        })
    }

    /// Point REST calls at another base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Handle incoming Discord message
    async fn handle_message_create(&self, payload: serde_json::Value) -> Result<()> {
        let inbound = parse_message_create(payload)?;

        // The relay drops our own messages and never finishes a reply for them
        let typing = !self.identity.is_self(&inbound.sender_id) && self.config.typing_indicator;
        if typing {
            self.start_typing(inbound.chat_id.clone()).await;
        }

        if let Some(tx) = &self.inbound_tx {
            let chat_id = inbound.chat_id.clone();
            if let Err(e) = tx.send(inbound).await {
                if typing {
                    self.release_typing(&chat_id).await;
                }
                return Err(ChannelError::SendError(e.to_string()));
            }
        }

        Ok(())
    }

    /// Show the typing indicator in a channel until every pending reply there
    /// has been released
    async fn start_typing(&self, channel_id: String) {
        let mut typing = self.typing.lock().await;
        if let Some(state) = typing.get_mut(&channel_id) {
            state.pending += 1;
            return;
        }

        let token = self.config.token.clone();
        let http = self.http.clone();
        let url = format!("{}/channels/{}/typing", self.api_base, channel_id);

        let task = tokio::spawn(async move {
            // Discord shows typing for ~10s per trigger
            let mut ticker = interval(Duration::from_secs(8));
            loop {
                ticker.tick().await;
                let _ = http
                    .post(&url)
                    .header("Authorization", format!("Bot {}", token))
                    .send()
                    .await;
            }
        });

        typing.insert(channel_id, TypingState { pending: 1, task });
    }

    /// One pending reply in the channel is done; the indicator stops with the last
    async fn release_typing(&self, channel_id: &str) {
        let mut typing = self.typing.lock().await;
        let Some(state) = typing.get_mut(channel_id) else {
            return;
        };

        state.pending = state.pending.saturating_sub(1);
        if state.pending == 0 {
            if let Some(state) = typing.remove(channel_id) {
                state.task.abort();
            }
        }
    }

    /// Clone for async task
    fn clone_for_task(&self) -> Self {
        Self {
            config: self.config.clone(),
            api_base: self.api_base.clone(),
            running: Arc::clone(&self.running),
            inbound_tx: self.inbound_tx.clone(),
            http: self.http.clone(),
            identity: self.identity.clone(),
            seq: Arc::clone(&self.seq),
            typing: Arc::clone(&self.typing),
            shutdown_tx: None,
        }
    }

    /// Run the gateway connection, reconnecting until shut down
    async fn run_gateway(&self, mut shutdown_rx: mpsc::Receiver<()>) -> Result<()> {
        let mut reconnect_delay = 5;

        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }

            tracing::info!("Connecting to Discord gateway...");

            match tokio_tungstenite::connect_async(&self.config.gateway_url).await {
                Ok((ws_stream, _)) => {
                    tracing::info!("Connected to Discord gateway");
                    reconnect_delay = 5;

                    let (mut write, mut read) = ws_stream.split();

                    // Writes come from the read loop and the heartbeat task
                    let (tx, mut rx) = mpsc::channel::<String>(32);

                    let writer_handle = tokio::spawn(async move {
                        while let Some(msg) = rx.recv().await {
                            if let Err(e) = write.send(WsMessage::Text(msg)).await {
                                tracing::warn!("WebSocket write failed: {}", e);
                                break;
                            }
                        }
                    });

                    loop {
                        tokio::select! {
                            _ = shutdown_rx.recv() => {
                                tracing::info!("Shutdown signal received");
                                self.running.store(false, Ordering::SeqCst);
                                break;
                            }
                            msg = read.next() => {
                                match msg {
                                    Some(Ok(WsMessage::Text(text))) => {
                                        match self.handle_gateway_message(&text, &tx).await {
                                            Ok(GatewayFlow::Continue) => {}
                                            Ok(GatewayFlow::Reconnect) => break,
                                            Err(e) => {
                                                tracing::error!("Error handling gateway message: {}", e);
                                            }
                                        }
                                    }
                                    Some(Ok(WsMessage::Close(frame))) => {
                                        tracing::warn!("Discord WebSocket closed: {:?}", frame);
                                        break;
                                    }
                                    Some(Err(e)) => {
                                        tracing::error!("Discord WebSocket error: {}", e);
                                        break;
                                    }
                                    None => {
                                        tracing::warn!("Discord WebSocket stream ended");
                                        break;
                                    }
                                    _ => {}
                                }
                            }
                        }
                    }

                    // Dropping the writer also ends the heartbeat task on its next tick
                    writer_handle.abort();
                }
                Err(e) => {
                    tracing::warn!("Discord connection failed: {}", e);
                }
            }

            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            tracing::info!("Reconnecting to Discord in {} seconds...", reconnect_delay);
            tokio::time::sleep(Duration::from_secs(reconnect_delay)).await;
            reconnect_delay = (reconnect_delay * 2).min(60);
        }

        Ok(())
    }

    async fn handle_gateway_message(
        &self,
        text: &str,
        tx: &mpsc::Sender<String>,
    ) -> Result<GatewayFlow> {
        let payload: GatewayPayload = serde_json::from_str(text)
            .map_err(|e| ChannelError::Error(format!("Failed to parse payload: {}", e)))?;

        if let Some(s) = payload.s {
            *self.seq.lock().await = Some(s);
        }

        match GatewayOp::from_u8(payload.op) {
            Some(GatewayOp::Hello) => {
                let interval_ms = payload
                    .d
                    .as_ref()
                    .and_then(|d| d.get("heartbeat_interval"))
                    .and_then(|v| v.as_u64())
                    .unwrap_or(45000);

                let tx_hb = tx.clone();
                let seq_hb = self.seq.clone();
                tokio::spawn(async move {
                    let mut interval = interval(Duration::from_millis(interval_ms));
                    interval.tick().await;

                    loop {
                        interval.tick().await;
                        let seq = *seq_hb.lock().await;
                        let heartbeat = serde_json::json!({ "op": 1, "d": seq });
                        if tx_hb.send(heartbeat.to_string()).await.is_err() {
                            break;
                        }
                    }
                });

                let identify = serde_json::json!({
                    "op": GatewayOp::Identify as u8,
                    "d": {
                        "token": self.config.token,
                        "intents": self.config.intents,
                        "properties": {
                            "os": std::env::consts::OS,
                            "browser": "ollacord",
                            "device": "ollacord"
                        }
                    }
                });
                tx.send(identify.to_string())
                    .await
                    .map_err(|e| ChannelError::Error(e.to_string()))?;
            }
            Some(GatewayOp::Heartbeat) => {
                // Server asked for an immediate heartbeat
                let seq = *self.seq.lock().await;
                let heartbeat = serde_json::json!({ "op": 1, "d": seq });
                tx.send(heartbeat.to_string())
                    .await
                    .map_err(|e| ChannelError::Error(e.to_string()))?;
            }
            Some(GatewayOp::Dispatch) => match payload.t.as_deref() {
                Some("MESSAGE_CREATE") => {
                    if let Some(d) = payload.d {
                        self.handle_message_create(d).await?;
                    }
                }
                Some("READY") => {
                    if let Some(d) = payload.d {
                        self.handle_ready(d).await?;
                    }
                }
                _ => {}
            },
            Some(GatewayOp::Reconnect) => {
                tracing::info!("Discord requested reconnect");
                return Ok(GatewayFlow::Reconnect);
            }
            Some(GatewayOp::InvalidSession) => {
                tracing::warn!("Discord invalid session, identifying again");
                return Ok(GatewayFlow::Reconnect);
            }
            Some(GatewayOp::HeartbeatAck) => {}
            _ => {
                tracing::debug!("Ignoring gateway op {}", payload.op);
            }
        }
        Ok(GatewayFlow::Continue)
    }

    async fn handle_ready(&self, payload: serde_json::Value) -> Result<()> {
        let ready: ReadyEvent = serde_json::from_value(payload)
            .map_err(|e| ChannelError::Error(format!("Failed to parse READY: {}", e)))?;

        self.identity.set(ready.user.id.clone());
        tracing::info!(
            "{} is online! (id={})",
            ready.user.username,
            ready.user.id
        );
        Ok(())
    }
}

#[async_trait]
impl ChannelHandler for DiscordHandler {
    fn name(&self) -> &str {
        "discord"
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn start(&mut self) -> Result<()> {
        if self.config.token.is_empty() {
            return Err(ChannelError::NotConfigured(
                "Discord token not configured".to_string(),
            ));
        }

        if self.is_running() {
            return Ok(());
        }

        tracing::info!("Starting Discord bot...");
        self.running.store(true, Ordering::SeqCst);

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        self.shutdown_tx = Some(shutdown_tx);

        let handler = self.clone_for_task();
        tokio::spawn(async move {
            if let Err(e) = handler.run_gateway(shutdown_rx).await {
                tracing::error!("Discord gateway task failed: {}", e);
            }
        });

        tracing::info!("Discord bot started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }

        tracing::info!("Stopping Discord bot...");
        self.running.store(false, Ordering::SeqCst);

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }

        let mut typing = self.typing.lock().await;
        for (_, state) in typing.drain() {
            state.task.abort();
        }

        tracing::info!("Discord bot stopped");
        Ok(())
    }

    async fn send(&self, message: OutboundMessage) -> Result<()> {
        if message.content.chars().count() > DISCORD_MESSAGE_LIMIT {
            return Err(ChannelError::SendFailed(format!(
                "message exceeds {} characters",
                DISCORD_MESSAGE_LIMIT
            )));
        }

        let url = format!("{}/channels/{}/messages", self.api_base, message.chat_id);
        let payload = serde_json::json!({ "content": message.content });

        for attempt in 1..=MAX_SEND_ATTEMPTS {
            let response = self
                .http
                .post(&url)
                .header("Authorization", format!("Bot {}", self.config.token))
                .json(&payload)
                .send()
                .await
                .map_err(|e| ChannelError::ApiError(format!("Request failed: {}", e)))?;

            let status = response.status();
            if status.is_success() {
                return Ok(());
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS && attempt < MAX_SEND_ATTEMPTS {
                let retry_after = retry_after_secs(response.headers()).unwrap_or(1.0);
                tracing::warn!("Discord rate limited, retrying in {}s", retry_after);
                tokio::time::sleep(Duration::from_secs_f64(retry_after)).await;
                continue;
            }

            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ChannelError::SendFailed(format!(
                "Discord API error: {} - {}",
                status, error_text
            )));
        }

        Err(ChannelError::SendFailed(
            "Discord rate limit retries exhausted".to_string(),
        ))
    }

    fn set_inbound_sender(&mut self, tx: mpsc::Sender<InboundMessage>) {
        self.inbound_tx = Some(tx);
    }

    async fn finish_reply(&self, chat_id: &str) {
        self.release_typing(chat_id).await;
    }
}
