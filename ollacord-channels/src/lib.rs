//! Chat platform integrations for ollacord
//!
//! This crate connects ollacord to Discord: inbound messages arrive over the
//! gateway WebSocket and replies go out through the REST API.

pub mod base;
pub mod common;
pub mod discord;
pub mod manager;

pub use base::{ChannelError, ChannelHandler, ChannelHandlerPtr, Result};
pub use discord::DiscordHandler;
pub use manager::ChannelManager;
