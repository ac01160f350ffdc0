//! Per-channel conversation history
//!
//! Each (server, channel) pair owns a short FIFO transcript of turns that is
//! replayed to the model on every request. History lives in memory for the
//! lifetime of the process.

pub mod manager;
pub mod store;

pub use manager::{ChannelHistory, HistoryStore};
pub use store::{ChannelKey, Role, Transcript, Turn};

/// Default number of turns kept per channel
pub const DEFAULT_HISTORY_LIMIT: usize = 8;
